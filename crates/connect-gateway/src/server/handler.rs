//! WebSocket handler
//!
//! Authentication and the endpoint capacity check happen here, before the
//! upgrade is accepted; a rejected connect never touches registry state.
//! After the upgrade the socket is bridged to the realtime service with
//! three tasks: receive, send (which also pings), and heartbeat monitor.

use crate::server::GatewayState;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use connect_core::{ClientEvent, DomainError, ServerEvent, UserId};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;

/// Connect-time query parameters
#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    /// Bearer token proving the caller's identity
    token: String,
}

/// WebSocket gateway handler
///
/// The credential is verified and the per-user endpoint limit checked
/// before accepting the upgrade. The limit is re-checked atomically at
/// registration; this early check exists to refuse the socket outright
/// instead of accepting and immediately closing it.
pub async fn ws_handler(
    State(state): State<GatewayState>,
    Query(params): Query<ConnectParams>,
    ws: WebSocketUpgrade,
) -> Response {
    let user_id = match state.service().authenticate(&params.token).await {
        Ok(user_id) => user_id,
        Err(e) => return reject(&e),
    };

    if !state.service().registry().has_capacity(user_id) {
        return reject(&DomainError::CapacityExceeded {
            limit: state.service().config().max_endpoints_per_user,
        });
    }

    ws.on_upgrade(move |socket| handle_socket(state, socket, user_id))
}

/// Map a connect-time failure to an HTTP rejection
fn reject(err: &DomainError) -> Response {
    let status = match err {
        DomainError::AuthenticationFailed(_) => StatusCode::UNAUTHORIZED,
        DomainError::AccountInactive => StatusCode::FORBIDDEN,
        DomainError::CapacityExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    tracing::debug!(code = err.code(), status = %status, "Connection rejected");
    (status, err.code().to_string()).into_response()
}

/// Handle an upgraded WebSocket connection
async fn handle_socket(state: GatewayState, socket: WebSocket, user_id: UserId) {
    let realtime = state.config().realtime.clone();
    let (tx, mut rx) = mpsc::channel::<ServerEvent>(realtime.endpoint_buffer);

    let (mut ws_sink, mut ws_stream) = socket.split();

    // Register with the service; this hydrates room membership, queues the
    // ready event, and replays the offline queue into `rx`
    let endpoint = match state.service().connect(user_id, tx).await {
        Ok(endpoint) => endpoint,
        Err(e) => {
            // Lost the capacity race between the upgrade check and now
            tracing::debug!(user_id = %user_id, code = e.code(), "Post-upgrade connect refused");
            if let Ok(json) = serde_json::to_string(&ServerEvent::error(&e)) {
                let _ = ws_sink.send(Message::Text(json.into())).await;
            }
            let _ = ws_sink.close().await;
            return;
        }
    };

    tracing::info!(
        endpoint_id = %endpoint.id(),
        user_id = %user_id,
        "WebSocket connection established"
    );

    // Receive task: inbound frames to service calls
    let state_recv = state.clone();
    let endpoint_recv = endpoint.clone();
    let recv_task = tokio::spawn(async move {
        while let Some(msg) = ws_stream.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    endpoint_recv.record_activity();
                    handle_text_message(&state_recv, &endpoint_recv, &text).await;
                }
                Ok(Message::Binary(_)) => {
                    tracing::debug!(
                        endpoint_id = %endpoint_recv.id(),
                        "Binary frames not supported"
                    );
                    return;
                }
                Ok(Message::Ping(_)) => {
                    // Pong is sent automatically by axum
                    endpoint_recv.record_activity();
                }
                Ok(Message::Pong(_)) => {
                    tracing::trace!(endpoint_id = %endpoint_recv.id(), "Pong received");
                    endpoint_recv.record_activity();
                }
                Ok(Message::Close(_)) => {
                    tracing::info!(endpoint_id = %endpoint_recv.id(), "Client closed connection");
                    return;
                }
                Err(e) => {
                    tracing::warn!(
                        endpoint_id = %endpoint_recv.id(),
                        error = %e,
                        "WebSocket error"
                    );
                    return;
                }
            }
        }
    });

    // Send task: drain the endpoint channel into the socket, interleaving
    // heartbeat pings
    let endpoint_send = endpoint.clone();
    let send_task = tokio::spawn(async move {
        // tokio intervals reject a zero period, so a misconfigured 0 is
        // clamped rather than panicking the socket task
        let mut ping_interval =
            interval(Duration::from_millis(realtime.heartbeat_interval_ms.max(1)));
        loop {
            tokio::select! {
                event = rx.recv() => {
                    let Some(event) = event else { break };
                    match serde_json::to_string(&event) {
                        Ok(json) => {
                            if ws_sink.send(Message::Text(json.into())).await.is_err() {
                                tracing::warn!(
                                    endpoint_id = %endpoint_send.id(),
                                    "Failed to send message to WebSocket"
                                );
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::error!(
                                endpoint_id = %endpoint_send.id(),
                                error = %e,
                                "Failed to serialize outbound event"
                            );
                        }
                    }
                }
                _ = ping_interval.tick() => {
                    if ws_sink.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
            }
        }

        let _ = ws_sink.close().await;
    });

    // Heartbeat monitor: no pong within the timeout window closes the
    // connection without waiting for the reconciler sweep
    let endpoint_hb = endpoint.clone();
    let heartbeat_task = tokio::spawn(async move {
        let timeout = Duration::from_millis(realtime.heartbeat_timeout_ms);
        let mut check_interval =
            interval(Duration::from_millis((realtime.heartbeat_interval_ms / 2).max(1)));

        loop {
            check_interval.tick().await;
            let idle = endpoint_hb.idle_for();
            if idle > timeout {
                tracing::warn!(
                    endpoint_id = %endpoint_hb.id(),
                    idle_ms = idle.as_millis(),
                    "Connection timed out (no heartbeat)"
                );
                break;
            }
        }
    });

    // First task to finish tears the connection down
    tokio::select! {
        _ = recv_task => {
            tracing::debug!(endpoint_id = %endpoint.id(), "Receive task ended");
        }
        _ = send_task => {
            tracing::debug!(endpoint_id = %endpoint.id(), "Send task ended");
        }
        _ = heartbeat_task => {
            tracing::debug!(endpoint_id = %endpoint.id(), "Heartbeat task ended");
        }
    }

    state.service().disconnect(endpoint.id()).await;
}

/// Handle one text frame from the client
///
/// Failures never propagate beyond the sending endpoint: parse and domain
/// errors are reported back as an `error` event on the caller's channel.
async fn handle_text_message(
    state: &GatewayState,
    endpoint: &Arc<connect_realtime::Endpoint>,
    text: &str,
) {
    let event = match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!(
                endpoint_id = %endpoint.id(),
                error = %e,
                "Failed to parse client event"
            );
            let reply = ServerEvent::Error {
                code: "DECODE_ERROR".to_string(),
                message: "malformed event".to_string(),
            };
            let _ = endpoint.send(reply).await;
            return;
        }
    };

    if let Err(e) = state.service().handle_event(endpoint, event).await {
        tracing::debug!(
            endpoint_id = %endpoint.id(),
            code = e.code(),
            "Client event rejected"
        );
        let _ = endpoint.send(ServerEvent::error(&e)).await;
    }
}
