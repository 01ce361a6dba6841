//! Presence publisher
//!
//! Invoked by the service on every online/offline transition derived from
//! registry mutations. Broadcasts the transition to every connected
//! endpoint and persists the latest status to the short-TTL presence cache
//! as a fallback read path.

use crate::registry::ConnectionRegistry;
use connect_core::{PresenceCache, PresenceStatus, ServerEvent, UserId};
use std::sync::Arc;

/// Publishes presence transitions
pub struct PresencePublisher {
    registry: Arc<ConnectionRegistry>,
    cache: Arc<dyn PresenceCache>,
}

impl PresencePublisher {
    #[must_use]
    pub fn new(registry: Arc<ConnectionRegistry>, cache: Arc<dyn PresenceCache>) -> Self {
        Self { registry, cache }
    }

    /// Publish a presence transition for a user
    ///
    /// The cache write is best-effort: the cache is a fallback read path,
    /// so a failed write is logged and does not block the broadcast.
    pub async fn publish(&self, user_id: UserId, status: PresenceStatus) {
        if let Err(e) = self.cache.set_status(user_id, status).await {
            tracing::warn!(
                user_id = %user_id,
                error = %e,
                "Failed to write presence cache"
            );
        }

        let event = ServerEvent::UserStatusChanged {
            user_id,
            status,
            timestamp: chrono::Utc::now(),
        };
        let sent = self.registry.broadcast(&event).await;

        tracing::debug!(
            user_id = %user_id,
            status = %status,
            endpoints = sent,
            "Presence transition broadcast"
        );
    }

    /// Fallback read path: cached status, offline if missing or expired
    pub async fn cached_status(&self, user_id: UserId) -> PresenceStatus {
        match self.cache.get_status(user_id).await {
            Ok(Some(status)) => status,
            Ok(None) => PresenceStatus::Offline,
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Presence cache read failed");
                PresenceStatus::Offline
            }
        }
    }
}
