//! Session reconciler
//!
//! Background sweep that catches state the event path missed: endpoints
//! whose transport died without a close frame, and typing entries whose
//! stop event was lost. Per-connection heartbeats catch most dead sockets
//! quickly; the reconciler is the backstop for the rest.

use crate::service::RealtimeService;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time::interval;

/// Periodic reconciliation task over the realtime service state
pub struct SessionReconciler {
    service: Arc<RealtimeService>,
    running: AtomicBool,
}

impl SessionReconciler {
    #[must_use]
    pub fn new(service: Arc<RealtimeService>) -> Arc<Self> {
        Arc::new(Self {
            service,
            running: AtomicBool::new(false),
        })
    }

    /// Start the reconciler
    ///
    /// Spawns a background task running two sweeps on independent cadences:
    /// the dead-endpoint sweep on `reconcile_interval` and the typing-expiry
    /// sweep on `typing_ttl`.
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::warn!("Session reconciler is already running");
            return;
        }

        let reconciler = self.clone();
        tokio::spawn(async move {
            reconciler.run().await;
        });

        tracing::info!(
            reconcile_interval = ?self.service.config().reconcile_interval(),
            typing_ttl = ?self.service.config().typing_ttl(),
            "Session reconciler started"
        );
    }

    /// Stop the reconciler after its current tick
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        tracing::info!("Session reconciler stopped");
    }

    async fn run(&self) {
        let mut sweep = interval(self.service.config().reconcile_interval());
        let mut typing = interval(self.service.config().typing_ttl());
        // The first tick of a tokio interval fires immediately; skip it so
        // the first sweep happens one full period after startup.
        sweep.tick().await;
        typing.tick().await;

        while self.running.load(Ordering::SeqCst) {
            tokio::select! {
                _ = sweep.tick() => {
                    let removed = self.service.reconcile_once().await;
                    tracing::debug!(removed = removed, "Dead endpoint sweep finished");
                }
                _ = typing.tick() => {
                    let expired = self.service.expire_typing().await;
                    if expired > 0 {
                        tracing::debug!(expired = expired, "Expired stale typing entries");
                    }
                }
            }
        }
    }
}
