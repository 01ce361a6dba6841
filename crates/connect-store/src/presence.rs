//! In-memory presence cache
//!
//! Entries carry their own expiry and are checked on read; there is no
//! background eviction. This mirrors the semantics of a short-TTL key in a
//! networked cache.

use async_trait::async_trait;
use connect_core::{DomainError, PresenceCache, PresenceStatus, UserId};
use dashmap::DashMap;
use std::time::{Duration, Instant};

/// `PresenceCache` backed by a process-local map with per-entry expiry
#[derive(Debug)]
pub struct MemoryPresenceCache {
    entries: DashMap<UserId, (PresenceStatus, Instant)>,
    ttl: Duration,
}

impl MemoryPresenceCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Drop expired entries; returns how many were evicted
    pub fn evict_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, (_, written)| written.elapsed() < self.ttl);
        before - self.entries.len()
    }
}

#[async_trait]
impl PresenceCache for MemoryPresenceCache {
    async fn set_status(&self, user_id: UserId, status: PresenceStatus) -> Result<(), DomainError> {
        self.entries.insert(user_id, (status, Instant::now()));
        Ok(())
    }

    async fn get_status(&self, user_id: UserId) -> Result<Option<PresenceStatus>, DomainError> {
        Ok(self.entries.get(&user_id).and_then(|entry| {
            let (status, written) = *entry;
            (written.elapsed() < self.ttl).then_some(status)
        }))
    }
}
