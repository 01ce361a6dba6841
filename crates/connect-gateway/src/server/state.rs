//! Gateway state
//!
//! Shared dependencies for the gateway server.

use connect_common::AppConfig;
use connect_realtime::RealtimeService;
use std::sync::Arc;

/// Gateway application state
#[derive(Clone)]
pub struct GatewayState {
    /// The realtime service behind the socket layer
    service: Arc<RealtimeService>,
    /// Application configuration
    config: Arc<AppConfig>,
}

impl GatewayState {
    /// Create a new gateway state
    pub fn new(service: Arc<RealtimeService>, config: AppConfig) -> Self {
        Self {
            service,
            config: Arc::new(config),
        }
    }

    /// Get the realtime service
    pub fn service(&self) -> &Arc<RealtimeService> {
        &self.service
    }

    /// Get the application configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("service", &self.service)
            .finish()
    }
}
