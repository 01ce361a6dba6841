//! Gateway server setup
//!
//! Routes, state wiring, and the serve loop.

mod handler;
mod state;

pub use handler::ws_handler;
pub use state::GatewayState;

use axum::{routing::get, Router};
use connect_common::{AppConfig, AppError, JwtAuthProvider, JwtService};
use connect_realtime::{RealtimeService, SessionReconciler};
use connect_store::{MemoryMessageRepository, MemoryPresenceCache, MemoryRoomRepository};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Create the gateway router
pub fn create_router() -> Router<GatewayState> {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_check))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Build the complete application
pub fn create_app(state: GatewayState) -> Router {
    create_router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Initialize all dependencies and create `GatewayState`
///
/// The in-memory stores stand in for the external durable store; swapping
/// them out means passing different trait objects here.
pub fn create_gateway_state(config: AppConfig) -> GatewayState {
    let jwt_service = JwtService::new(&config.auth.jwt_secret, config.auth.token_expiry_secs);
    let auth = Arc::new(JwtAuthProvider::new(jwt_service));

    let service = RealtimeService::new(
        config.realtime.clone(),
        auth,
        Arc::new(MemoryRoomRepository::new()),
        Arc::new(MemoryMessageRepository::new()),
        Arc::new(MemoryPresenceCache::new(config.realtime.presence_ttl())),
    );

    GatewayState::new(service, config)
}

/// Run the gateway server
pub async fn run_server(app: Router, addr: SocketAddr) -> Result<(), AppError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Server(format!("Failed to bind to {addr}: {e}")))?;

    tracing::info!("Gateway listening on ws://{}/ws", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::Server(format!("Server error: {e}")))?;

    Ok(())
}

/// Run the complete gateway server with configuration
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.gateway.port));

    let state = create_gateway_state(config);

    // Background sweeps: dead endpoints and stale typing entries
    let reconciler = SessionReconciler::new(state.service().clone());
    reconciler.start();

    let app = create_app(state);
    run_server(app, addr).await
}
