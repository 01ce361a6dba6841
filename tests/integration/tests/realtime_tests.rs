//! Realtime service scenario tests
//!
//! Drive the service end to end through in-memory stores: presence
//! lifecycle, fan-out, offline queueing, typing, and failure handling.
//!
//! Run with: cargo test -p integration-tests --test realtime_tests

use integration_tests::{
    assert_no_event, drain, make_moderator, recv_named, small_capacity_config,
    small_queue_config, world_with, FailingMessageRepository, TestWorld,
};

use connect_core::{
    ClientEvent, DomainError, MessageKind, PresenceStatus, RoomRepository, ServerEvent, UserId,
};
use std::sync::Arc;

async fn send_text(
    world: &TestWorld,
    sender: UserId,
    room_id: connect_core::RoomId,
    content: &str,
) {
    world
        .service
        .send_message(
            sender,
            room_id,
            content.to_string(),
            MessageKind::Text,
            None,
            Vec::new(),
        )
        .await
        .expect("send failed");
}

// ============================================================================
// Presence
// ============================================================================

#[tokio::test]
async fn test_presence_tracks_endpoint_set() {
    let world = TestWorld::new();
    let alice = UserId::new();
    let bob = UserId::new();
    world.seed_room(alice, &[bob]).await;

    let (_bob_ep, mut bob_rx) = world.connect(bob).await;
    // Clear bob's own ready/online events before observing alice
    recv_named(&mut bob_rx, "user_status_changed").await;
    drain(&mut bob_rx);

    // First endpoint: one online broadcast
    let (a1, _a1_rx) = world.connect(alice).await;
    match recv_named(&mut bob_rx, "user_status_changed").await {
        ServerEvent::UserStatusChanged { user_id, status, .. } => {
            assert_eq!(user_id, alice);
            assert_eq!(status, PresenceStatus::Online);
        }
        other => panic!("unexpected event: {other:?}"),
    }

    // Second endpoint: no new transition
    let (a2, _a2_rx) = world.connect(alice).await;
    assert_no_event(&mut bob_rx, "user_status_changed");

    // Losing one of two endpoints: still online, no transition
    world.service.disconnect(a1.id()).await;
    assert_no_event(&mut bob_rx, "user_status_changed");
    assert!(world.service.registry().is_online(alice));

    // Last endpoint gone: one offline broadcast
    world.service.disconnect(a2.id()).await;
    match recv_named(&mut bob_rx, "user_status_changed").await {
        ServerEvent::UserStatusChanged { user_id, status, .. } => {
            assert_eq!(user_id, alice);
            assert_eq!(status, PresenceStatus::Offline);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn test_endpoint_capacity_enforced_and_released() {
    let world = TestWorld::with_config(small_capacity_config(2));
    let alice = UserId::new();

    let (first, _rx1) = world.connect(alice).await;
    let (_second, _rx2) = world.connect(alice).await;

    let (tx, _rx3) = tokio::sync::mpsc::channel(8);
    let err = world.service.connect(alice, tx).await.unwrap_err();
    assert!(matches!(err, DomainError::CapacityExceeded { limit: 2 }));
    assert_eq!(world.service.registry().endpoints_for(alice).len(), 2);

    // Disconnecting frees a slot
    world.service.disconnect(first.id()).await;
    let (_third, _rx4) = world.connect(alice).await;
    assert_eq!(world.service.registry().endpoints_for(alice).len(), 2);
}

// ============================================================================
// Fan-out and offline queueing
// ============================================================================

#[tokio::test]
async fn test_fanout_targets_durable_participants() {
    let world = TestWorld::new();
    let alice = UserId::new();
    let bob = UserId::new(); // participant, stays offline
    let carol = UserId::new(); // participant, online
    let dave = UserId::new(); // online but not a participant
    let room_id = world.seed_room(alice, &[bob, carol]).await;
    world.seed_room(dave, &[]).await;

    let (_a, _a_rx) = world.connect(alice).await;
    let (_c, mut carol_rx) = world.connect(carol).await;
    let (_d, mut dave_rx) = world.connect(dave).await;

    send_text(&world, alice, room_id, "hello room").await;

    match recv_named(&mut carol_rx, "new_message").await {
        ServerEvent::NewMessage { message } => {
            assert_eq!(message.content, "hello room");
            assert_eq!(message.sender_id, alice);
            assert_eq!(message.room_id, room_id);
        }
        other => panic!("unexpected event: {other:?}"),
    }

    // Offline participant queued, non-participant untouched
    assert_eq!(world.service.offline().len(bob), 1);
    assert_eq!(world.service.offline().len(dave), 0);
    assert_no_event(&mut dave_rx, "new_message");

    // Durable log and room summary updated
    assert_eq!(world.message_repo.log_len(room_id), 1);
    let room = world.room_repo.get(room_id).await.unwrap();
    assert_eq!(room.last_message_preview.as_deref(), Some("hello room"));
}

#[tokio::test]
async fn test_offline_queue_flushed_in_order_at_reconnect() {
    let world = TestWorld::new();
    let alice = UserId::new();
    let bob = UserId::new();
    let room_id = world.seed_room(alice, &[bob]).await;

    let (_a, _a_rx) = world.connect(alice).await;
    for content in ["first", "second", "third"] {
        send_text(&world, alice, room_id, content).await;
    }
    assert_eq!(world.service.offline().len(bob), 3);

    // Reconnect: ready first, then the queued messages in enqueue order
    let (b, mut bob_rx) = world.connect(bob).await;
    recv_named(&mut bob_rx, "ready").await;
    for expected in ["first", "second", "third"] {
        match recv_named(&mut bob_rx, "queued_message").await {
            ServerEvent::QueuedMessage { message, .. } => {
                assert_eq!(message.content, expected);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    // Queue emptied by the flush; a second reconnect replays nothing
    assert_eq!(world.service.offline().len(bob), 0);
    world.service.disconnect(b.id()).await;
    let (_b2, mut bob_rx2) = world.connect(bob).await;
    recv_named(&mut bob_rx2, "ready").await;
    assert_no_event(&mut bob_rx2, "queued_message");
}

#[tokio::test]
async fn test_offline_queue_evicts_oldest_at_capacity() {
    let world = TestWorld::with_config(small_queue_config(2));
    let alice = UserId::new();
    let bob = UserId::new();
    let room_id = world.seed_room(alice, &[bob]).await;

    let (_a, _a_rx) = world.connect(alice).await;
    for content in ["first", "second", "third"] {
        send_text(&world, alice, room_id, content).await;
    }
    assert_eq!(world.service.offline().len(bob), 2);

    let (_b, mut bob_rx) = world.connect(bob).await;
    recv_named(&mut bob_rx, "ready").await;
    for expected in ["second", "third"] {
        match recv_named(&mut bob_rx, "queued_message").await {
            ServerEvent::QueuedMessage { message, .. } => {
                assert_eq!(message.content, expected);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_failed_persist_aborts_dispatch() {
    let repo = Arc::new(FailingMessageRepository::new());
    let world = world_with(Default::default(), repo.clone());
    let alice = UserId::new();
    let bob = UserId::new(); // offline participant
    let carol = UserId::new(); // online participant
    let room_id = world.seed_room(alice, &[bob, carol]).await;

    let (_a, _a_rx) = world.connect(alice).await;
    let (_c, mut carol_rx) = world.connect(carol).await;
    drain(&mut carol_rx);

    repo.fail_next_appends(true);
    let err = world
        .service
        .send_message(
            alice,
            room_id,
            "doomed".to_string(),
            MessageKind::Text,
            None,
            Vec::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Persistence(_)));

    // No delivery, no queueing, no durable write, no summary touch
    assert_no_event(&mut carol_rx, "new_message");
    assert_eq!(world.service.offline().len(bob), 0);
    assert_eq!(repo.log_len(room_id), 0);
    let room = world.room_repo.get(room_id).await.unwrap();
    assert!(room.last_message_preview.is_none());

    // The path recovers once persistence does
    repo.fail_next_appends(false);
    world
        .service
        .send_message(
            alice,
            room_id,
            "recovered".to_string(),
            MessageKind::Text,
            None,
            Vec::new(),
        )
        .await
        .unwrap();
    recv_named(&mut carol_rx, "new_message").await;
    assert_eq!(repo.log_len(room_id), 1);
}

// ============================================================================
// Typing
// ============================================================================

#[tokio::test]
async fn test_typing_stop_broadcasts_exactly_once() {
    let world = TestWorld::new();
    let alice = UserId::new();
    let bob = UserId::new();
    let carol = UserId::new();
    let room_id = world.seed_room(alice, &[bob, carol]).await;

    let (_a, _a_rx) = world.connect(alice).await;
    let (_b, _b_rx) = world.connect(bob).await;
    let (_c, mut carol_rx) = world.connect(carol).await;
    drain(&mut carol_rx);

    world.service.typing_start(alice, room_id).await.unwrap();
    world.service.typing_start(bob, room_id).await.unwrap();
    recv_named(&mut carol_rx, "user_typing").await;
    recv_named(&mut carol_rx, "user_typing").await;

    // Redundant start from an already-typing user is not rebroadcast
    world.service.typing_start(alice, room_id).await.unwrap();
    assert_no_event(&mut carol_rx, "user_typing");

    // First stop leaves bob typing: no broadcast yet
    world.service.typing_stop(alice, room_id).await.unwrap();
    assert_no_event(&mut carol_rx, "user_stopped_typing");

    // Second stop empties the set: exactly one broadcast
    world.service.typing_stop(bob, room_id).await.unwrap();
    recv_named(&mut carol_rx, "user_stopped_typing").await;
    assert_no_event(&mut carol_rx, "user_stopped_typing");
}

#[tokio::test]
async fn test_sending_clears_typing_state() {
    let world = TestWorld::new();
    let alice = UserId::new();
    let bob = UserId::new();
    let room_id = world.seed_room(alice, &[bob]).await;

    let (_a, _a_rx) = world.connect(alice).await;
    let (_b, mut bob_rx) = world.connect(bob).await;
    drain(&mut bob_rx);

    world.service.typing_start(alice, room_id).await.unwrap();
    recv_named(&mut bob_rx, "user_typing").await;

    send_text(&world, alice, room_id, "done typing").await;
    recv_named(&mut bob_rx, "user_stopped_typing").await;
    assert!(!world.service.typing().anyone_typing(room_id));
}

// ============================================================================
// Live membership vs durable participation
// ============================================================================

#[tokio::test]
async fn test_live_leave_does_not_stop_delivery() {
    let world = TestWorld::new();
    let alice = UserId::new();
    let bob = UserId::new();
    let room_id = world.seed_room(alice, &[bob]).await;

    let (_a, mut alice_rx) = world.connect(alice).await;
    let (_b, mut bob_rx) = world.connect(bob).await;
    drain(&mut alice_rx);

    // Bob leaves the live member set but stays a durable participant
    world.service.leave_room(bob, room_id).await.unwrap();
    match recv_named(&mut alice_rx, "user_left_chat").await {
        ServerEvent::UserLeftChat { user_id, .. } => assert_eq!(user_id, bob),
        other => panic!("unexpected event: {other:?}"),
    }
    assert!(!world.service.rooms().is_member(room_id, bob));

    // Fan-out targets the durable list, so bob still gets the message live
    drain(&mut bob_rx);
    send_text(&world, alice, room_id, "still for you").await;
    match recv_named(&mut bob_rx, "new_message").await {
        ServerEvent::NewMessage { message } => assert_eq!(message.content, "still for you"),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn test_errors_are_isolated_to_the_caller() {
    let world = TestWorld::new();
    let alice = UserId::new();
    let outsider = UserId::new();
    let room_id = world.seed_room(alice, &[]).await;

    let (_a, mut alice_rx) = world.connect(alice).await;
    let (out_ep, mut out_rx) = world.connect(outsider).await;
    drain(&mut alice_rx);
    drain(&mut out_rx);

    let event = ClientEvent::SendMessage {
        room_id,
        content: "let me in".to_string(),
        kind: MessageKind::Text,
        reply_to: None,
        attachments: Vec::new(),
    };
    let err = world
        .service
        .handle_event(&out_ep, event)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotParticipant(_)));

    // Nothing leaked to the room, nothing persisted
    assert_no_event(&mut alice_rx, "new_message");
    assert_eq!(world.message_repo.log_len(room_id), 0);
}

// ============================================================================
// Reads, reactions, search, invites
// ============================================================================

#[tokio::test]
async fn test_mark_read_notifies_other_members() {
    let world = TestWorld::new();
    let alice = UserId::new();
    let bob = UserId::new();
    let room_id = world.seed_room(alice, &[bob]).await;

    let (_a, mut alice_rx) = world.connect(alice).await;
    let (_b, mut bob_rx) = world.connect(bob).await;
    drain(&mut alice_rx);

    send_text(&world, alice, room_id, "read me").await;
    let message_id = match recv_named(&mut bob_rx, "new_message").await {
        ServerEvent::NewMessage { message } => message.id,
        other => panic!("unexpected event: {other:?}"),
    };

    world
        .service
        .mark_read(bob, room_id, vec![message_id])
        .await
        .unwrap();
    match recv_named(&mut alice_rx, "messages_read").await {
        ServerEvent::MessagesRead {
            user_id,
            message_ids,
            ..
        } => {
            assert_eq!(user_id, bob);
            assert_eq!(message_ids, vec![message_id]);
        }
        other => panic!("unexpected event: {other:?}"),
    }

    // Marking the same message again updates nothing and stays silent
    drain(&mut alice_rx);
    world
        .service
        .mark_read(bob, room_id, vec![message_id])
        .await
        .unwrap();
    assert_no_event(&mut alice_rx, "messages_read");
}

#[tokio::test]
async fn test_reaction_toggles() {
    let world = TestWorld::new();
    let alice = UserId::new();
    let bob = UserId::new();
    let room_id = world.seed_room(alice, &[bob]).await;

    let (_a, _a_rx) = world.connect(alice).await;
    let (_b, mut bob_rx) = world.connect(bob).await;

    send_text(&world, alice, room_id, "react to me").await;
    let message_id = match recv_named(&mut bob_rx, "new_message").await {
        ServerEvent::NewMessage { message } => message.id,
        other => panic!("unexpected event: {other:?}"),
    };

    world
        .service
        .react(bob, room_id, message_id, "👍")
        .await
        .unwrap();
    match recv_named(&mut bob_rx, "message_reaction").await {
        ServerEvent::MessageReaction { added, .. } => assert!(added),
        other => panic!("unexpected event: {other:?}"),
    }

    world
        .service
        .react(bob, room_id, message_id, "👍")
        .await
        .unwrap();
    match recv_named(&mut bob_rx, "message_reaction").await {
        ServerEvent::MessageReaction { added, .. } => assert!(!added),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn test_search_replies_only_to_the_caller() {
    let world = TestWorld::new();
    let alice = UserId::new();
    let bob = UserId::new();
    let room_id = world.seed_room(alice, &[bob]).await;

    let (a_ep, mut alice_rx) = world.connect(alice).await;
    let (_b, mut bob_rx) = world.connect(bob).await;

    send_text(&world, alice, room_id, "pepperoni pizza").await;
    send_text(&world, alice, room_id, "sushi platter").await;
    drain(&mut alice_rx);
    drain(&mut bob_rx);

    world
        .service
        .search(&a_ep, room_id, "pizza", 10)
        .await
        .unwrap();
    match recv_named(&mut alice_rx, "search_results").await {
        ServerEvent::SearchResults { messages, query, .. } => {
            assert_eq!(query, "pizza");
            assert_eq!(messages.len(), 1);
            assert_eq!(messages[0].content, "pepperoni pizza");
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert_no_event(&mut bob_rx, "search_results");
}

#[tokio::test]
async fn test_invite_brings_online_user_into_room() {
    let world = TestWorld::new();
    let alice = UserId::new();
    let bob = UserId::new();
    let room_id = world.seed_room(alice, &[]).await;

    let (_a, _a_rx) = world.connect(alice).await;
    let (_b, mut bob_rx) = world.connect(bob).await;
    drain(&mut bob_rx);

    world.service.invite_user(alice, room_id, bob).await.unwrap();

    match recv_named(&mut bob_rx, "invited_to_chat").await {
        ServerEvent::InvitedToChat { room } => assert_eq!(room.id, room_id),
        other => panic!("unexpected event: {other:?}"),
    }
    assert!(world.service.rooms().is_member(room_id, bob));
    assert!(world
        .room_repo
        .role_of(room_id, bob)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_moderator_can_remove_member() {
    let world = TestWorld::new();
    let alice = UserId::new();
    let bob = UserId::new();
    let carol = UserId::new();
    let room_id = world.seed_room(alice, &[bob, carol]).await;
    make_moderator(&world.room_repo, room_id, bob).await;

    let (_b, _b_rx) = world.connect(bob).await;
    let (_c, mut carol_rx) = world.connect(carol).await;
    drain(&mut carol_rx);

    world.service.remove_user(bob, room_id, carol).await.unwrap();

    match recv_named(&mut carol_rx, "user_removed").await {
        ServerEvent::UserRemoved {
            user_id,
            removed_by,
            ..
        } => {
            assert_eq!(user_id, carol);
            assert_eq!(removed_by, bob);
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert!(!world.service.rooms().is_member(room_id, carol));
    assert!(world
        .room_repo
        .role_of(room_id, carol)
        .await
        .unwrap()
        .is_none());
}

// ============================================================================
// Reconciliation
// ============================================================================

#[tokio::test]
async fn test_reconciler_publishes_offline_for_dead_endpoint() {
    let world = TestWorld::new();
    let alice = UserId::new();
    let bob = UserId::new();
    world.seed_room(alice, &[bob]).await;

    let (_b, mut bob_rx) = world.connect(bob).await;
    // Clear bob's own online broadcast
    recv_named(&mut bob_rx, "user_status_changed").await;

    let (tx, rx) = tokio::sync::mpsc::channel(8);
    world.service.connect(alice, tx).await.unwrap();
    recv_named(&mut bob_rx, "user_status_changed").await;

    // Transport dies without a close frame
    drop(rx);
    let removed = world.service.reconcile_once().await;
    assert_eq!(removed, 1);

    match recv_named(&mut bob_rx, "user_status_changed").await {
        ServerEvent::UserStatusChanged { user_id, status, .. } => {
            assert_eq!(user_id, alice);
            assert_eq!(status, PresenceStatus::Offline);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}
