//! # connect-common
//!
//! Shared utilities: configuration, error handling, authentication, and telemetry.

pub mod auth;
pub mod config;
pub mod error;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use auth::{Claims, JwtAuthProvider, JwtService};
pub use config::{
    AppConfig, AppSettings, AuthConfig, ConfigError, Environment, RealtimeConfig, ServerConfig,
};
pub use error::{AppError, AppResult};
pub use telemetry::{init_tracing, try_init_tracing, TracingConfig, TracingError};
