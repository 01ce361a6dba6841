//! Message fan-out dispatcher
//!
//! The core state machine: Received -> Persisted -> Delivered (live) and/or
//! Queued (offline). Persistence failure aborts the whole dispatch with no
//! partial delivery; delivery failure to one live endpoint is logged and
//! does not block the rest.

use crate::offline::OfflineQueue;
use crate::registry::ConnectionRegistry;
use connect_core::{
    AttachmentRef, ChatMessage, DomainError, MessageId, MessageKind, MessageRepository,
    RoomId, RoomRepository, ServerEvent, UserId, MAX_CONTENT_LENGTH,
};
use std::sync::Arc;

/// How much of a message lands in the room's last-message preview
const PREVIEW_LENGTH: usize = 80;

/// Fans inbound messages out to live endpoints and offline queues
pub struct MessageDispatcher {
    registry: Arc<ConnectionRegistry>,
    offline: Arc<OfflineQueue>,
    room_repo: Arc<dyn RoomRepository>,
    message_repo: Arc<dyn MessageRepository>,
}

/// What to dispatch, before validation
pub struct OutboundMessage {
    pub room_id: RoomId,
    pub sender_id: UserId,
    pub content: String,
    pub kind: MessageKind,
    pub reply_to: Option<MessageId>,
    pub attachments: Vec<AttachmentRef>,
}

impl MessageDispatcher {
    #[must_use]
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        offline: Arc<OfflineQueue>,
        room_repo: Arc<dyn RoomRepository>,
        message_repo: Arc<dyn MessageRepository>,
    ) -> Self {
        Self {
            registry,
            offline,
            room_repo,
            message_repo,
        }
    }

    /// Dispatch a message to a room
    ///
    /// 1. Authorization: sender must be a durable participant.
    /// 2. Persist to the durable log; failure aborts with no delivery.
    /// 3. Fan out to the durable participant list: live endpoints get the
    ///    event now, absent members get an offline-queue entry.
    /// 4. Update the room's last-activity summary (best-effort).
    pub async fn dispatch(&self, outbound: OutboundMessage) -> Result<ChatMessage, DomainError> {
        let OutboundMessage {
            room_id,
            sender_id,
            content,
            kind,
            reply_to,
            attachments,
        } = outbound;

        // Authorization against durable membership, not live join state
        self.room_repo
            .role_of(room_id, sender_id)
            .await?
            .ok_or(DomainError::NotParticipant(room_id))?;

        let content = content.trim().to_string();
        if content.is_empty() {
            return Err(DomainError::validation("message content is empty"));
        }
        if content.chars().count() > MAX_CONTENT_LENGTH {
            return Err(DomainError::ContentTooLong {
                max: MAX_CONTENT_LENGTH,
            });
        }

        let message = ChatMessage::new(room_id, sender_id, content)
            .with_kind(kind)
            .with_reply_to(reply_to)
            .with_attachments(attachments);

        // Persist-or-abort: nothing is delivered for a message that is not
        // in the durable log
        self.message_repo.append(message.clone()).await?;

        // Fan-out target set is the durable participant list, online or not
        let participants = self.room_repo.participants(room_id).await?;
        let event = ServerEvent::NewMessage {
            message: message.clone(),
        };

        let mut delivered = 0usize;
        let mut queued = 0usize;
        for participant in participants {
            if self.registry.is_online(participant) {
                delivered += self.registry.send_to_user(participant, &event).await;
            } else {
                self.offline.enqueue(participant, message.clone());
                queued += 1;
            }
        }

        if let Err(e) = self
            .room_repo
            .touch_last_activity(room_id, Some(preview_of(&message.content)))
            .await
        {
            tracing::warn!(room_id = %room_id, error = %e, "Failed to update room summary");
        }

        tracing::debug!(
            room_id = %room_id,
            message_id = %message.id,
            sender_id = %sender_id,
            delivered = delivered,
            queued = queued,
            "Message dispatched"
        );

        Ok(message)
    }

    /// Replay everything queued for a user to one endpoint, in original
    /// enqueue order, then clear the queue. No-op if nothing is queued.
    pub async fn flush_offline(&self, endpoint: &crate::Endpoint) -> usize {
        let user_id = endpoint.user_id();
        let queued = self.offline.drain(user_id);
        let total = queued.len();

        for entry in queued {
            let event = ServerEvent::QueuedMessage {
                message: entry.message,
                queued_at: entry.queued_at,
            };
            if endpoint.send(event).await.is_err() {
                tracing::warn!(
                    endpoint_id = %endpoint.id(),
                    user_id = %user_id,
                    "Offline replay interrupted, endpoint gone"
                );
                break;
            }
        }

        if total > 0 {
            tracing::info!(user_id = %user_id, count = total, "Offline queue flushed");
        }
        total
    }
}

fn preview_of(content: &str) -> String {
    content.chars().take(PREVIEW_LENGTH).collect()
}
