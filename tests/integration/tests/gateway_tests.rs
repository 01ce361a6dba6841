//! Gateway WebSocket round-trip tests
//!
//! Spin up the real axum server on an ephemeral port and talk to it with
//! a tungstenite client.
//!
//! Run with: cargo test -p integration-tests --test gateway_tests

use integration_tests::{ws_recv_named, ws_send, TestGateway};

use connect_common::RealtimeConfig;
use connect_core::{ClientEvent, MessageKind, ServerEvent, UserId};
use futures_util::SinkExt;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

#[tokio::test]
async fn test_handshake_rejects_bad_token() {
    let gateway = TestGateway::start().await.unwrap();

    let err = connect_async(gateway.ws_url("garbage")).await.unwrap_err();
    match err {
        tokio_tungstenite::tungstenite::Error::Http(response) => {
            assert_eq!(response.status().as_u16(), 401);
        }
        other => panic!("expected HTTP rejection, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_zero_heartbeat_interval_does_not_kill_the_socket() {
    let gateway = TestGateway::start_with_realtime(RealtimeConfig {
        heartbeat_interval_ms: 0,
        ..RealtimeConfig::default()
    })
    .await
    .unwrap();
    let alice = UserId::new();
    let room_id = gateway.seed_room(alice, &[]).await;

    // The socket tasks must survive the degenerate interval config and
    // still serve a normal round trip
    let mut ws = gateway.connect_ws(alice).await.unwrap();
    ws_recv_named(&mut ws, "ready").await.unwrap();

    ws_send(
        &mut ws,
        &ClientEvent::SendMessage {
            room_id,
            content: "still here".to_string(),
            kind: MessageKind::Text,
            reply_to: None,
            attachments: Vec::new(),
        },
    )
    .await
    .unwrap();

    match ws_recv_named(&mut ws, "new_message").await.unwrap() {
        ServerEvent::NewMessage { message } => assert_eq!(message.content, "still here"),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn test_connect_receives_ready_with_hydrated_rooms() {
    let gateway = TestGateway::start().await.unwrap();
    let alice = UserId::new();
    let room_id = gateway.seed_room(alice, &[]).await;

    let mut ws = gateway.connect_ws(alice).await.unwrap();

    match ws_recv_named(&mut ws, "ready").await.unwrap() {
        ServerEvent::Ready { user_id, rooms, .. } => {
            assert_eq!(user_id, alice);
            assert_eq!(rooms.len(), 1);
            assert_eq!(rooms[0].id, room_id);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn test_message_round_trip_between_sockets() {
    let gateway = TestGateway::start().await.unwrap();
    let alice = UserId::new();
    let bob = UserId::new();
    let room_id = gateway.seed_room(alice, &[bob]).await;

    let mut alice_ws = gateway.connect_ws(alice).await.unwrap();
    let mut bob_ws = gateway.connect_ws(bob).await.unwrap();
    ws_recv_named(&mut alice_ws, "ready").await.unwrap();
    ws_recv_named(&mut bob_ws, "ready").await.unwrap();

    ws_send(
        &mut alice_ws,
        &ClientEvent::SendMessage {
            room_id,
            content: "over the wire".to_string(),
            kind: MessageKind::Text,
            reply_to: None,
            attachments: Vec::new(),
        },
    )
    .await
    .unwrap();

    match ws_recv_named(&mut bob_ws, "new_message").await.unwrap() {
        ServerEvent::NewMessage { message } => {
            assert_eq!(message.content, "over the wire");
            assert_eq!(message.sender_id, alice);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_frame_gets_error_not_disconnect() {
    let gateway = TestGateway::start().await.unwrap();
    let alice = UserId::new();
    gateway.seed_room(alice, &[]).await;

    let mut ws = gateway.connect_ws(alice).await.unwrap();
    ws_recv_named(&mut ws, "ready").await.unwrap();

    ws.send(Message::Text("{\"event\":\"nonsense\"}".into()))
        .await
        .unwrap();

    match ws_recv_named(&mut ws, "error").await.unwrap() {
        ServerEvent::Error { code, .. } => assert_eq!(code, "DECODE_ERROR"),
        other => panic!("unexpected event: {other:?}"),
    }
    // The connection survives the bad frame
    assert!(gateway.service.registry().is_online(alice));
}

#[tokio::test]
async fn test_domain_error_goes_only_to_the_caller() {
    let gateway = TestGateway::start().await.unwrap();
    let alice = UserId::new();
    let outsider = UserId::new();
    let room_id = gateway.seed_room(alice, &[]).await;
    gateway.seed_room(outsider, &[]).await;

    let mut alice_ws = gateway.connect_ws(alice).await.unwrap();
    let mut outsider_ws = gateway.connect_ws(outsider).await.unwrap();
    ws_recv_named(&mut alice_ws, "ready").await.unwrap();
    ws_recv_named(&mut outsider_ws, "ready").await.unwrap();

    ws_send(
        &mut outsider_ws,
        &ClientEvent::SendMessage {
            room_id,
            content: "not mine".to_string(),
            kind: MessageKind::Text,
            reply_to: None,
            attachments: Vec::new(),
        },
    )
    .await
    .unwrap();

    match ws_recv_named(&mut outsider_ws, "error").await.unwrap() {
        ServerEvent::Error { code, .. } => assert_eq!(code, "NOT_PARTICIPANT"),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn test_handshake_rejects_over_capacity() {
    let gateway = TestGateway::start_with_realtime(RealtimeConfig {
        max_endpoints_per_user: 1,
        ..RealtimeConfig::default()
    })
    .await
    .unwrap();
    let alice = UserId::new();

    let mut first = gateway.connect_ws(alice).await.unwrap();
    ws_recv_named(&mut first, "ready").await.unwrap();

    let err = connect_async(gateway.ws_url(&gateway.token_for(alice)))
        .await
        .unwrap_err();
    match err {
        tokio_tungstenite::tungstenite::Error::Http(response) => {
            assert_eq!(response.status().as_u16(), 429);
        }
        other => panic!("expected HTTP rejection, got: {other:?}"),
    }

    // The rejected attempt left no state behind
    assert_eq!(gateway.service.registry().endpoints_for(alice).len(), 1);
}

#[tokio::test]
async fn test_client_disconnect_publishes_offline() {
    let gateway = TestGateway::start().await.unwrap();
    let alice = UserId::new();
    let bob = UserId::new();
    gateway.seed_room(alice, &[bob]).await;

    let mut bob_ws = gateway.connect_ws(bob).await.unwrap();
    ws_recv_named(&mut bob_ws, "ready").await.unwrap();
    // bob's own online broadcast
    ws_recv_named(&mut bob_ws, "user_status_changed").await.unwrap();

    let mut alice_ws = gateway.connect_ws(alice).await.unwrap();
    ws_recv_named(&mut alice_ws, "ready").await.unwrap();
    ws_recv_named(&mut bob_ws, "user_status_changed").await.unwrap();

    alice_ws.close(None).await.unwrap();

    match ws_recv_named(&mut bob_ws, "user_status_changed").await.unwrap() {
        ServerEvent::UserStatusChanged { user_id, status, .. } => {
            assert_eq!(user_id, alice);
            assert_eq!(status.to_string(), "offline");
        }
        other => panic!("unexpected event: {other:?}"),
    }
}
