//! Connection registry
//!
//! Tracks which live endpoints belong to which user. A user is online iff
//! their endpoint set is non-empty; the registry reports online/offline
//! transitions to the caller, which forwards them to the presence publisher.

use crate::endpoint::Endpoint;
use connect_core::{DomainError, EndpointId, ServerEvent, UserId};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Registry of all live endpoints, keyed by endpoint and by user
pub struct ConnectionRegistry {
    endpoints: DashMap<EndpointId, Arc<Endpoint>>,
    user_endpoints: DashMap<UserId, HashSet<EndpointId>>,
    max_per_user: usize,
}

impl ConnectionRegistry {
    /// Create a registry enforcing `max_per_user` concurrent endpoints
    #[must_use]
    pub fn new(max_per_user: usize) -> Self {
        Self {
            endpoints: DashMap::new(),
            user_endpoints: DashMap::new(),
            max_per_user,
        }
    }

    /// Register a new endpoint for a user
    ///
    /// The capacity check and the insert are one critical section on the
    /// user's entry, so concurrent connects cannot overshoot the limit.
    /// Returns the endpoint and whether the user transitioned to online.
    ///
    /// # Errors
    /// `CapacityExceeded` if the user already has the maximum number of
    /// live endpoints; the registry is left unchanged.
    pub fn register(
        &self,
        user_id: UserId,
        sender: mpsc::Sender<ServerEvent>,
    ) -> Result<(Arc<Endpoint>, bool), DomainError> {
        let (endpoint, went_online) = {
            let mut entry = self.user_endpoints.entry(user_id).or_default();
            if entry.len() >= self.max_per_user {
                return Err(DomainError::CapacityExceeded {
                    limit: self.max_per_user,
                });
            }
            let endpoint = Endpoint::new(user_id, sender);
            entry.insert(endpoint.id());
            // The online transition must be decided under the same entry
            // lock as the insert; two racing first-connects would otherwise
            // both observe len 2 and neither would report the transition.
            (endpoint, entry.len() == 1)
        };

        self.endpoints.insert(endpoint.id(), endpoint.clone());

        tracing::debug!(
            endpoint_id = %endpoint.id(),
            user_id = %user_id,
            went_online = went_online,
            "Endpoint registered"
        );

        Ok((endpoint, went_online))
    }

    /// Remove an endpoint
    ///
    /// Returns the removed endpoint and whether the user transitioned to
    /// offline (last endpoint gone). `None` if the endpoint was not
    /// registered, which makes repeated unregisters harmless.
    pub fn unregister(&self, endpoint_id: EndpointId) -> Option<(Arc<Endpoint>, bool)> {
        let (_, endpoint) = self.endpoints.remove(&endpoint_id)?;
        let user_id = endpoint.user_id();

        let mut went_offline = false;
        if let Entry::Occupied(mut occupied) = self.user_endpoints.entry(user_id) {
            occupied.get_mut().remove(&endpoint_id);
            if occupied.get().is_empty() {
                occupied.remove();
                went_offline = true;
            }
        }

        tracing::debug!(
            endpoint_id = %endpoint_id,
            user_id = %user_id,
            went_offline = went_offline,
            "Endpoint unregistered"
        );

        Some((endpoint, went_offline))
    }

    /// Whether the user has at least one live endpoint
    #[must_use]
    pub fn is_online(&self, user_id: UserId) -> bool {
        self.user_endpoints
            .get(&user_id)
            .is_some_and(|set| !set.is_empty())
    }

    /// Whether the user can accept one more endpoint
    #[must_use]
    pub fn has_capacity(&self, user_id: UserId) -> bool {
        self.user_endpoints
            .get(&user_id)
            .map_or(true, |set| set.len() < self.max_per_user)
    }

    /// All live endpoints of a user (possibly empty)
    #[must_use]
    pub fn endpoints_for(&self, user_id: UserId) -> Vec<Arc<Endpoint>> {
        self.user_endpoints
            .get(&user_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.endpoints.get(id).map(|e| e.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Look up a single endpoint
    #[must_use]
    pub fn get(&self, endpoint_id: EndpointId) -> Option<Arc<Endpoint>> {
        self.endpoints.get(&endpoint_id).map(|e| e.clone())
    }

    /// Snapshot of every live endpoint (reconciler sweep input)
    #[must_use]
    pub fn all_endpoints(&self) -> Vec<Arc<Endpoint>> {
        self.endpoints.iter().map(|e| e.clone()).collect()
    }

    /// Send an event to every live endpoint of a user; returns how many
    /// endpoints accepted it. Per-endpoint failures are logged and skipped.
    pub async fn send_to_user(&self, user_id: UserId, event: &ServerEvent) -> usize {
        let mut sent = 0;
        for endpoint in self.endpoints_for(user_id) {
            if endpoint.send(event.clone()).await.is_ok() {
                sent += 1;
            } else {
                tracing::warn!(
                    endpoint_id = %endpoint.id(),
                    user_id = %user_id,
                    event = event.name(),
                    "Delivery to endpoint failed"
                );
            }
        }
        sent
    }

    /// Broadcast an event to every connected endpoint
    pub async fn broadcast(&self, event: &ServerEvent) -> usize {
        let mut sent = 0;
        for entry in self.endpoints.iter() {
            if entry.send(event.clone()).await.is_ok() {
                sent += 1;
            }
        }
        sent
    }

    /// Total live endpoints
    #[must_use]
    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }

    /// Unique online users
    #[must_use]
    pub fn user_count(&self) -> usize {
        self.user_endpoints.len()
    }
}

impl std::fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("endpoints", &self.endpoints.len())
            .field("users", &self.user_endpoints.len())
            .field("max_per_user", &self.max_per_user)
            .finish()
    }
}
