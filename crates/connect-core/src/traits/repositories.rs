//! Durable store traits
//!
//! The durable participant list held behind `RoomRepository` is the
//! authority for fan-out: dispatch targets all durable participants, not
//! just live joiners. Every method is a suspension point; registry state
//! may change while a call is in flight.

use crate::entities::{ChatMessage, ParticipantRole, Room};
use crate::error::DomainError;
use crate::ids::{MessageId, RoomId, UserId};
use async_trait::async_trait;

/// Result type for repository operations
pub type RepoResult<T> = Result<T, DomainError>;

/// Access to durable room state
#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// Fetch a room by id
    async fn get(&self, room_id: RoomId) -> RepoResult<Room>;

    /// Durable participant list of a room
    async fn participants(&self, room_id: RoomId) -> RepoResult<Vec<UserId>>;

    /// Role of a user within a room, `None` if not a participant
    async fn role_of(&self, room_id: RoomId, user_id: UserId) -> RepoResult<Option<ParticipantRole>>;

    /// All rooms a user is a durable participant of (used for hydration
    /// at connect time)
    async fn rooms_for_user(&self, user_id: UserId) -> RepoResult<Vec<Room>>;

    /// Persist a new room
    async fn create(&self, room: Room) -> RepoResult<()>;

    /// Add a participant with the given role
    async fn add_participant(
        &self,
        room_id: RoomId,
        user_id: UserId,
        role: ParticipantRole,
    ) -> RepoResult<()>;

    /// Remove a participant
    async fn remove_participant(&self, room_id: RoomId, user_id: UserId) -> RepoResult<()>;

    /// Bump the room's last-activity timestamp and message preview
    async fn touch_last_activity(&self, room_id: RoomId, preview: Option<String>) -> RepoResult<()>;

    /// Update room settings (name, privacy)
    async fn update_settings(
        &self,
        room_id: RoomId,
        name: Option<String>,
        is_private: Option<bool>,
    ) -> RepoResult<()>;
}

/// Access to the durable message log
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Append a message to a room's durable log
    async fn append(&self, message: ChatMessage) -> RepoResult<()>;

    /// Fetch a single message
    async fn get(&self, room_id: RoomId, message_id: MessageId) -> RepoResult<ChatMessage>;

    /// Mark messages as read by a user; returns the ids actually updated
    async fn mark_read(
        &self,
        room_id: RoomId,
        message_ids: &[MessageId],
        user_id: UserId,
    ) -> RepoResult<Vec<MessageId>>;

    /// Toggle a reaction; returns true if added, false if removed
    async fn toggle_reaction(
        &self,
        room_id: RoomId,
        message_id: MessageId,
        user_id: UserId,
        emoji: &str,
    ) -> RepoResult<bool>;

    /// Pin or unpin a message
    async fn set_pinned(&self, room_id: RoomId, message_id: MessageId, pinned: bool) -> RepoResult<()>;

    /// Case-insensitive substring search over a room's log, newest first
    async fn search(&self, room_id: RoomId, query: &str, limit: usize) -> RepoResult<Vec<ChatMessage>>;
}
