//! Individual live endpoint
//!
//! One endpoint is one live transport connection owned by one user. The
//! endpoint holds the outbound channel; the transport layer drains the
//! receiving half into the socket.

use connect_core::{EndpointId, ServerEvent, UserId};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// A single live transport connection
pub struct Endpoint {
    id: EndpointId,
    user_id: UserId,
    /// Channel to the transport send task
    sender: mpsc::Sender<ServerEvent>,
    /// Last transport-level sign of life (pong, inbound event)
    last_seen: RwLock<Instant>,
    created_at: Instant,
}

impl Endpoint {
    /// Create a new endpoint for an authenticated user
    pub fn new(user_id: UserId, sender: mpsc::Sender<ServerEvent>) -> Arc<Self> {
        Arc::new(Self {
            id: EndpointId::new(),
            user_id,
            sender,
            last_seen: RwLock::new(Instant::now()),
            created_at: Instant::now(),
        })
    }

    /// The endpoint identifier
    #[must_use]
    pub fn id(&self) -> EndpointId {
        self.id
    }

    /// The owning user
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Record transport-level activity (pong received, event received)
    pub fn record_activity(&self) {
        *self.last_seen.write() = Instant::now();
    }

    /// Time since the last sign of life
    #[must_use]
    pub fn idle_for(&self) -> Duration {
        self.last_seen.read().elapsed()
    }

    /// Endpoint age
    #[must_use]
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Send an event to this endpoint
    pub async fn send(
        &self,
        event: ServerEvent,
    ) -> Result<(), mpsc::error::SendError<ServerEvent>> {
        self.sender.send(event).await
    }

    /// Try to send without waiting for buffer space
    pub fn try_send(
        &self,
        event: ServerEvent,
    ) -> Result<(), mpsc::error::TrySendError<ServerEvent>> {
        self.sender.try_send(event)
    }

    /// Check if the transport side has dropped its receiver
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .field("closed", &self.is_closed())
            .finish()
    }
}
