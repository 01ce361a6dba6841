//! In-memory message log

use async_trait::async_trait;
use connect_core::{
    ChatMessage, DomainError, MessageId, MessageRepository, RepoResult, RoomId, UserId,
};
use dashmap::DashMap;

/// `MessageRepository` backed by per-room append logs
#[derive(Debug, Default)]
pub struct MemoryMessageRepository {
    logs: DashMap<RoomId, Vec<ChatMessage>>,
}

impl MemoryMessageRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages in a room's log
    #[must_use]
    pub fn log_len(&self, room_id: RoomId) -> usize {
        self.logs.get(&room_id).map_or(0, |log| log.len())
    }
}

#[async_trait]
impl MessageRepository for MemoryMessageRepository {
    async fn append(&self, message: ChatMessage) -> RepoResult<()> {
        self.logs.entry(message.room_id).or_default().push(message);
        Ok(())
    }

    async fn get(&self, room_id: RoomId, message_id: MessageId) -> RepoResult<ChatMessage> {
        self.logs
            .get(&room_id)
            .and_then(|log| log.iter().find(|m| m.id == message_id).cloned())
            .ok_or(DomainError::MessageNotFound(message_id))
    }

    async fn mark_read(
        &self,
        room_id: RoomId,
        message_ids: &[MessageId],
        user_id: UserId,
    ) -> RepoResult<Vec<MessageId>> {
        let mut log = self
            .logs
            .get_mut(&room_id)
            .ok_or(DomainError::RoomNotFound(room_id))?;

        let mut updated = Vec::new();
        for message in log.iter_mut() {
            if message_ids.contains(&message.id) && message.read_by.insert(user_id) {
                updated.push(message.id);
            }
        }
        Ok(updated)
    }

    async fn toggle_reaction(
        &self,
        room_id: RoomId,
        message_id: MessageId,
        user_id: UserId,
        emoji: &str,
    ) -> RepoResult<bool> {
        let mut log = self
            .logs
            .get_mut(&room_id)
            .ok_or(DomainError::RoomNotFound(room_id))?;

        let message = log
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or(DomainError::MessageNotFound(message_id))?;

        Ok(message.toggle_reaction(emoji, user_id))
    }

    async fn set_pinned(
        &self,
        room_id: RoomId,
        message_id: MessageId,
        pinned: bool,
    ) -> RepoResult<()> {
        let mut log = self
            .logs
            .get_mut(&room_id)
            .ok_or(DomainError::RoomNotFound(room_id))?;

        let message = log
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or(DomainError::MessageNotFound(message_id))?;

        message.pinned = pinned;
        Ok(())
    }

    async fn search(
        &self,
        room_id: RoomId,
        query: &str,
        limit: usize,
    ) -> RepoResult<Vec<ChatMessage>> {
        let needle = query.to_lowercase();
        Ok(self
            .logs
            .get(&room_id)
            .map(|log| {
                log.iter()
                    .rev()
                    .filter(|m| m.content.to_lowercase().contains(&needle))
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
