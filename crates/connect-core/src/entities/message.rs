//! Chat message entity

use crate::ids::{MessageId, RoomId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Maximum message content length in characters
pub const MAX_CONTENT_LENGTH: usize = 4000;

/// Message content kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
    File,
    /// Server-generated notices (user joined, room renamed, ...)
    System,
}

impl Default for MessageKind {
    fn default() -> Self {
        Self::Text
    }
}

/// Reference to an uploaded attachment
///
/// Storage itself is an external concern; the message only carries the
/// pointer and display metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    pub url: String,
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
}

/// A single chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub room_id: RoomId,
    pub sender_id: UserId,
    pub content: String,
    #[serde(default)]
    pub kind: MessageKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<MessageId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<AttachmentRef>,
    /// Reaction emoji mapped to the users who reacted with it
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub reactions: HashMap<String, HashSet<UserId>>,
    #[serde(default)]
    pub pinned: bool,
    /// Users who have marked this message as read
    #[serde(default, skip_serializing_if = "HashSet::is_empty")]
    pub read_by: HashSet<UserId>,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Create a new text message in a room
    #[must_use]
    pub fn new(room_id: RoomId, sender_id: UserId, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            room_id,
            sender_id,
            content: content.into(),
            kind: MessageKind::Text,
            reply_to: None,
            attachments: Vec::new(),
            reactions: HashMap::new(),
            pinned: false,
            read_by: HashSet::new(),
            created_at: Utc::now(),
        }
    }

    /// Set the message kind
    #[must_use]
    pub fn with_kind(mut self, kind: MessageKind) -> Self {
        self.kind = kind;
        self
    }

    /// Mark this message as a reply to another
    #[must_use]
    pub fn with_reply_to(mut self, reply_to: Option<MessageId>) -> Self {
        self.reply_to = reply_to;
        self
    }

    /// Attach files to the message
    #[must_use]
    pub fn with_attachments(mut self, attachments: Vec<AttachmentRef>) -> Self {
        self.attachments = attachments;
        self
    }

    /// Toggle a reaction for a user. Returns true if the reaction was added,
    /// false if it was removed.
    pub fn toggle_reaction(&mut self, emoji: &str, user_id: UserId) -> bool {
        let users = self.reactions.entry(emoji.to_string()).or_default();
        let added = users.insert(user_id);
        if !added {
            users.remove(&user_id);
        }
        self.reactions.retain(|_, users| !users.is_empty());
        added
    }

    /// Check if a user has read this message
    #[must_use]
    pub fn is_read_by(&self, user_id: UserId) -> bool {
        self.read_by.contains(&user_id)
    }
}

/// A message payload held for a user who had no live endpoint when it was
/// fanned out. Bounded per user; oldest entries are evicted first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedMessage {
    pub message: ChatMessage,
    pub queued_at: DateTime<Utc>,
}

impl QueuedMessage {
    #[must_use]
    pub fn new(message: ChatMessage) -> Self {
        Self {
            message,
            queued_at: Utc::now(),
        }
    }
}
