//! Conversation room entity
//!
//! A room's participant list here is the durable (authoritative) membership.
//! Live, process-local join state is tracked separately by the realtime
//! service's room membership index.

use crate::ids::{RoomId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Room kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomKind {
    /// One-to-one conversation
    Direct,
    /// Multi-participant group
    Group,
}

/// Role of a participant within a room
///
/// Ordering matters: `Owner` > `Moderator` > `Member`, used for privileged
/// action checks (pin, remove, settings).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    Member,
    Moderator,
    Owner,
}

impl ParticipantRole {
    /// Check whether this role can moderate (pin messages, remove users)
    #[must_use]
    pub fn can_moderate(self) -> bool {
        self >= Self::Moderator
    }
}

/// A conversation room with its durable participant list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub kind: RoomKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub is_private: bool,
    /// Durable participant list with per-user roles
    pub participants: HashMap<UserId, ParticipantRole>,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    /// Short preview of the most recent message, for room listings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message_preview: Option<String>,
}

impl Room {
    /// Create a new room owned by `owner`, with `members` as plain members
    #[must_use]
    pub fn new(kind: RoomKind, owner: UserId, members: impl IntoIterator<Item = UserId>) -> Self {
        let mut participants: HashMap<UserId, ParticipantRole> = members
            .into_iter()
            .map(|id| (id, ParticipantRole::Member))
            .collect();
        participants.insert(owner, ParticipantRole::Owner);

        let now = Utc::now();
        Self {
            id: RoomId::new(),
            kind,
            name: None,
            is_private: false,
            participants,
            created_at: now,
            last_activity_at: now,
            last_message_preview: None,
        }
    }

    /// Set the room name
    #[must_use]
    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    /// Mark the room private
    #[must_use]
    pub fn with_privacy(mut self, is_private: bool) -> Self {
        self.is_private = is_private;
        self
    }

    /// Check whether a user is a durable participant
    #[must_use]
    pub fn is_participant(&self, user_id: UserId) -> bool {
        self.participants.contains_key(&user_id)
    }

    /// Get a participant's role, if any
    #[must_use]
    pub fn role_of(&self, user_id: UserId) -> Option<ParticipantRole> {
        self.participants.get(&user_id).copied()
    }

    /// All participant ids
    #[must_use]
    pub fn participant_ids(&self) -> Vec<UserId> {
        self.participants.keys().copied().collect()
    }

    /// Record activity: bump the timestamp and update the preview
    pub fn touch(&mut self, preview: Option<String>) {
        self.last_activity_at = Utc::now();
        if preview.is_some() {
            self.last_message_preview = preview;
        }
    }
}
