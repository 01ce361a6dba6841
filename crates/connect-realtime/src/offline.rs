//! Offline message queue
//!
//! Per-user bounded buffer of messages generated while the user had zero
//! live endpoints. FIFO eviction once the bound is exceeded: at-most-last-N
//! delivery, not guaranteed delivery. Consulted only at connect time.

use connect_core::{ChatMessage, QueuedMessage, UserId};
use dashmap::DashMap;
use std::collections::VecDeque;

/// Bounded per-user queues for offline delivery
#[derive(Debug)]
pub struct OfflineQueue {
    queues: DashMap<UserId, VecDeque<QueuedMessage>>,
    limit: usize,
}

impl OfflineQueue {
    /// Create a queue set with a per-user bound
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            queues: DashMap::new(),
            limit,
        }
    }

    /// Append a message for an offline user; evicts the oldest entry when
    /// the bound is exceeded. Returns true if an eviction happened.
    pub fn enqueue(&self, user_id: UserId, message: ChatMessage) -> bool {
        let mut queue = self.queues.entry(user_id).or_default();
        queue.push_back(QueuedMessage::new(message));

        let evicted = queue.len() > self.limit;
        if evicted {
            queue.pop_front();
            tracing::debug!(
                user_id = %user_id,
                limit = self.limit,
                "Offline queue full, dropped oldest message"
            );
        }
        evicted
    }

    /// Take everything queued for a user, in original enqueue order
    pub fn drain(&self, user_id: UserId) -> Vec<QueuedMessage> {
        self.queues
            .remove(&user_id)
            .map(|(_, queue)| queue.into_iter().collect())
            .unwrap_or_default()
    }

    /// Queued message count for a user
    #[must_use]
    pub fn len(&self, user_id: UserId) -> usize {
        self.queues.get(&user_id).map_or(0, |q| q.len())
    }

    /// Whether a user has nothing queued
    #[must_use]
    pub fn is_empty(&self, user_id: UserId) -> bool {
        self.len(user_id) == 0
    }
}
