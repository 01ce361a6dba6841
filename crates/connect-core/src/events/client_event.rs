//! Inbound client events

use crate::entities::{AttachmentRef, MessageKind, RoomKind};
use crate::ids::{MessageId, RoomId, UserId};
use serde::{Deserialize, Serialize};

fn default_search_limit() -> usize {
    25
}

/// Events a client may send over an established connection
///
/// Authentication happens before the WebSocket upgrade, so there is no
/// in-band connect event; transport pings are handled at the socket layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    JoinRoom {
        room_id: RoomId,
    },
    LeaveRoom {
        room_id: RoomId,
    },
    SendMessage {
        room_id: RoomId,
        content: String,
        #[serde(default)]
        kind: MessageKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reply_to: Option<MessageId>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        attachments: Vec<AttachmentRef>,
    },
    TypingStart {
        room_id: RoomId,
    },
    TypingStop {
        room_id: RoomId,
    },
    MarkRead {
        room_id: RoomId,
        message_ids: Vec<MessageId>,
    },
    ReactToMessage {
        room_id: RoomId,
        message_id: MessageId,
        reaction: String,
    },
    PinMessage {
        room_id: RoomId,
        message_id: MessageId,
        pin: bool,
    },
    SearchMessages {
        room_id: RoomId,
        query: String,
        #[serde(default = "default_search_limit")]
        limit: usize,
    },
    CreateRoom {
        kind: RoomKind,
        participant_ids: Vec<UserId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default)]
        is_private: bool,
    },
    InviteUser {
        room_id: RoomId,
        user_id: UserId,
    },
    RemoveUser {
        room_id: RoomId,
        user_id: UserId,
    },
    UpdateRoomSettings {
        room_id: RoomId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        is_private: Option<bool>,
    },
}

impl ClientEvent {
    /// Event name as it appears on the wire
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::JoinRoom { .. } => "join_room",
            Self::LeaveRoom { .. } => "leave_room",
            Self::SendMessage { .. } => "send_message",
            Self::TypingStart { .. } => "typing_start",
            Self::TypingStop { .. } => "typing_stop",
            Self::MarkRead { .. } => "mark_read",
            Self::ReactToMessage { .. } => "react_to_message",
            Self::PinMessage { .. } => "pin_message",
            Self::SearchMessages { .. } => "search_messages",
            Self::CreateRoom { .. } => "create_room",
            Self::InviteUser { .. } => "invite_user",
            Self::RemoveUser { .. } => "remove_user",
            Self::UpdateRoomSettings { .. } => "update_room_settings",
        }
    }

    /// The room this event targets, if any
    #[must_use]
    pub const fn room_id(&self) -> Option<RoomId> {
        match self {
            Self::JoinRoom { room_id }
            | Self::LeaveRoom { room_id }
            | Self::SendMessage { room_id, .. }
            | Self::TypingStart { room_id }
            | Self::TypingStop { room_id }
            | Self::MarkRead { room_id, .. }
            | Self::ReactToMessage { room_id, .. }
            | Self::PinMessage { room_id, .. }
            | Self::SearchMessages { room_id, .. }
            | Self::InviteUser { room_id, .. }
            | Self::RemoveUser { room_id, .. }
            | Self::UpdateRoomSettings { room_id, .. } => Some(*room_id),
            Self::CreateRoom { .. } => None,
        }
    }
}
