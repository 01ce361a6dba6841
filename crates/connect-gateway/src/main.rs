//! EventConnect gateway entry point
//!
//! Run with:
//! ```bash
//! cargo run -p connect-gateway
//! ```
//!
//! Configuration is layered from `config/*.toml` files and `APP__`-prefixed
//! environment variables; `APP__AUTH__JWT_SECRET` is required.

use connect_common::{try_init_tracing, AppConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(e) = try_init_tracing() {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    if let Err(e) = run().await {
        error!(error = %e, "Gateway failed to start");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting EventConnect gateway...");

    let config = AppConfig::load().map_err(|e| {
        error!(error = %e, "Failed to load configuration");
        e
    })?;

    info!(
        env = ?config.app.env,
        port = config.gateway.port,
        "Configuration loaded"
    );

    connect_gateway::run(config).await?;

    Ok(())
}
