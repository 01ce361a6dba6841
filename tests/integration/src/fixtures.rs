//! Test fixtures
//!
//! Repository doubles and config presets shared across scenario tests.

use async_trait::async_trait;
use connect_common::RealtimeConfig;
use connect_core::{
    ChatMessage, DomainError, MessageId, MessageRepository, RepoResult, RoomId, UserId,
};
use connect_store::MemoryMessageRepository;
use std::sync::atomic::{AtomicBool, Ordering};

/// Message repository whose `append` can be made to fail on demand;
/// everything else delegates to an in-memory store
pub struct FailingMessageRepository {
    inner: MemoryMessageRepository,
    fail_append: AtomicBool,
}

impl FailingMessageRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: MemoryMessageRepository::new(),
            fail_append: AtomicBool::new(false),
        }
    }

    pub fn fail_next_appends(&self, fail: bool) {
        self.fail_append.store(fail, Ordering::SeqCst);
    }

    /// Number of messages persisted for a room
    #[must_use]
    pub fn log_len(&self, room_id: RoomId) -> usize {
        self.inner.log_len(room_id)
    }
}

impl Default for FailingMessageRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageRepository for FailingMessageRepository {
    async fn append(&self, message: ChatMessage) -> RepoResult<()> {
        if self.fail_append.load(Ordering::SeqCst) {
            return Err(DomainError::Persistence("append failed".to_string()));
        }
        self.inner.append(message).await
    }

    async fn get(&self, room_id: RoomId, message_id: MessageId) -> RepoResult<ChatMessage> {
        self.inner.get(room_id, message_id).await
    }

    async fn mark_read(
        &self,
        room_id: RoomId,
        message_ids: &[MessageId],
        user_id: UserId,
    ) -> RepoResult<Vec<MessageId>> {
        self.inner.mark_read(room_id, message_ids, user_id).await
    }

    async fn toggle_reaction(
        &self,
        room_id: RoomId,
        message_id: MessageId,
        user_id: UserId,
        emoji: &str,
    ) -> RepoResult<bool> {
        self.inner
            .toggle_reaction(room_id, message_id, user_id, emoji)
            .await
    }

    async fn set_pinned(
        &self,
        room_id: RoomId,
        message_id: MessageId,
        pinned: bool,
    ) -> RepoResult<()> {
        self.inner.set_pinned(room_id, message_id, pinned).await
    }

    async fn search(
        &self,
        room_id: RoomId,
        query: &str,
        limit: usize,
    ) -> RepoResult<Vec<ChatMessage>> {
        self.inner.search(room_id, query, limit).await
    }
}

/// Realtime config with a small offline queue, for eviction tests
#[must_use]
pub fn small_queue_config(limit: usize) -> RealtimeConfig {
    RealtimeConfig {
        offline_queue_limit: limit,
        ..RealtimeConfig::default()
    }
}

/// Realtime config with a tight endpoint capacity
#[must_use]
pub fn small_capacity_config(max: usize) -> RealtimeConfig {
    RealtimeConfig {
        max_endpoints_per_user: max,
        ..RealtimeConfig::default()
    }
}
