//! Outbound server events

use crate::entities::{ChatMessage, PresenceStatus, Room};
use crate::ids::{EndpointId, MessageId, RoomId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Events the server pushes to connected endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Handshake event sent once after a successful connect, carrying the
    /// endpoint id and the hydrated room list
    Ready {
        endpoint_id: EndpointId,
        user_id: UserId,
        rooms: Vec<Room>,
    },
    NewMessage {
        message: ChatMessage,
    },
    UserJoinedChat {
        room_id: RoomId,
        user_id: UserId,
    },
    UserLeftChat {
        room_id: RoomId,
        user_id: UserId,
    },
    UserTyping {
        room_id: RoomId,
        user_id: UserId,
    },
    /// Broadcast when a room's typing set becomes empty
    UserStoppedTyping {
        room_id: RoomId,
    },
    MessagesRead {
        room_id: RoomId,
        user_id: UserId,
        message_ids: Vec<MessageId>,
    },
    MessageReaction {
        room_id: RoomId,
        message_id: MessageId,
        user_id: UserId,
        reaction: String,
        /// True if the reaction was added, false if removed (toggle)
        added: bool,
    },
    MessagePinUpdated {
        room_id: RoomId,
        message_id: MessageId,
        user_id: UserId,
        pinned: bool,
    },
    /// Reply to `search_messages`, sent only to the requesting endpoint
    SearchResults {
        room_id: RoomId,
        query: String,
        messages: Vec<ChatMessage>,
    },
    /// Global presence broadcast
    UserStatusChanged {
        user_id: UserId,
        status: PresenceStatus,
        timestamp: DateTime<Utc>,
    },
    /// A message that was held while the recipient was offline, replayed
    /// at reconnect in original enqueue order
    QueuedMessage {
        message: ChatMessage,
        queued_at: DateTime<Utc>,
    },
    ChatCreated {
        room: Room,
    },
    InvitedToChat {
        room: Room,
    },
    UserInvited {
        room_id: RoomId,
        user_id: UserId,
        invited_by: UserId,
    },
    UserRemoved {
        room_id: RoomId,
        user_id: UserId,
        removed_by: UserId,
    },
    ChatSettingsUpdated {
        room_id: RoomId,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        is_private: Option<bool>,
        updated_by: UserId,
    },
    /// Sent only to the caller whose action failed
    Error {
        code: String,
        message: String,
    },
}

impl ServerEvent {
    /// Event name as it appears on the wire
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Ready { .. } => "ready",
            Self::NewMessage { .. } => "new_message",
            Self::UserJoinedChat { .. } => "user_joined_chat",
            Self::UserLeftChat { .. } => "user_left_chat",
            Self::UserTyping { .. } => "user_typing",
            Self::UserStoppedTyping { .. } => "user_stopped_typing",
            Self::MessagesRead { .. } => "messages_read",
            Self::MessageReaction { .. } => "message_reaction",
            Self::MessagePinUpdated { .. } => "message_pin_updated",
            Self::SearchResults { .. } => "search_results",
            Self::UserStatusChanged { .. } => "user_status_changed",
            Self::QueuedMessage { .. } => "queued_message",
            Self::ChatCreated { .. } => "chat_created",
            Self::InvitedToChat { .. } => "invited_to_chat",
            Self::UserInvited { .. } => "user_invited",
            Self::UserRemoved { .. } => "user_removed",
            Self::ChatSettingsUpdated { .. } => "chat_settings_updated",
            Self::Error { .. } => "error",
        }
    }

    /// Build an `error` event from a domain error
    #[must_use]
    pub fn error(err: &crate::error::DomainError) -> Self {
        Self::Error {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}
