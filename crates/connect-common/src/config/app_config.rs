//! Application configuration structs
//!
//! Layers `config/default.toml`, an optional `config/{env}.toml`, and
//! `APP__`-prefixed environment variables (double underscore separating
//! sections, e.g. `APP__GATEWAY__PORT=9000`).

use serde::Deserialize;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSettings,
    #[serde(default)]
    pub gateway: ServerConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub realtime: RealtimeConfig,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default)]
    pub env: Environment,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            env: Environment::default(),
        }
    }
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

/// Gateway server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    #[serde(default = "default_token_expiry")]
    pub token_expiry_secs: i64,
}

/// Tunables for the realtime subsystem
#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeConfig {
    /// Maximum concurrent endpoints per user identity
    #[serde(default = "default_max_endpoints")]
    pub max_endpoints_per_user: usize,
    /// Offline queue bound per user (oldest evicted first)
    #[serde(default = "default_offline_queue_limit")]
    pub offline_queue_limit: usize,
    /// Session reconciler sweep interval in seconds
    #[serde(default = "default_reconcile_interval")]
    pub reconcile_interval_secs: u64,
    /// Typing entries older than this are expired
    #[serde(default = "default_typing_ttl")]
    pub typing_ttl_secs: u64,
    /// An endpoint whose last pong is older than this is considered dead
    /// by the reconciler
    #[serde(default = "default_liveness_window")]
    pub liveness_window_secs: u64,
    /// Per-endpoint outbound channel capacity
    #[serde(default = "default_endpoint_buffer")]
    pub endpoint_buffer: usize,
    /// Gateway heartbeat ping interval in milliseconds
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_ms: u64,
    /// No pong within this window closes the connection
    #[serde(default = "default_heartbeat_timeout")]
    pub heartbeat_timeout_ms: u64,
    /// Presence cache entry TTL in seconds
    #[serde(default = "default_presence_ttl")]
    pub presence_ttl_secs: u64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            max_endpoints_per_user: default_max_endpoints(),
            offline_queue_limit: default_offline_queue_limit(),
            reconcile_interval_secs: default_reconcile_interval(),
            typing_ttl_secs: default_typing_ttl(),
            liveness_window_secs: default_liveness_window(),
            endpoint_buffer: default_endpoint_buffer(),
            heartbeat_interval_ms: default_heartbeat_interval(),
            heartbeat_timeout_ms: default_heartbeat_timeout(),
            presence_ttl_secs: default_presence_ttl(),
        }
    }
}

impl RealtimeConfig {
    #[must_use]
    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_secs)
    }

    #[must_use]
    pub fn typing_ttl(&self) -> Duration {
        Duration::from_secs(self.typing_ttl_secs)
    }

    #[must_use]
    pub fn liveness_window(&self) -> Duration {
        Duration::from_secs(self.liveness_window_secs)
    }

    #[must_use]
    pub fn presence_ttl(&self) -> Duration {
        Duration::from_secs(self.presence_ttl_secs)
    }
}

// Default value functions
fn default_app_name() -> String {
    "connect-realtime".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8081
}

fn default_token_expiry() -> i64 {
    900 // 15 minutes
}

fn default_max_endpoints() -> usize {
    5
}

fn default_offline_queue_limit() -> usize {
    100
}

fn default_reconcile_interval() -> u64 {
    300 // 5 minutes
}

fn default_typing_ttl() -> u64 {
    10
}

fn default_liveness_window() -> u64 {
    120
}

fn default_endpoint_buffer() -> usize {
    100
}

fn default_heartbeat_interval() -> u64 {
    30_000
}

fn default_heartbeat_timeout() -> u64 {
    90_000
}

fn default_presence_ttl() -> u64 {
    300
}

impl AppConfig {
    /// Load configuration from files and environment
    ///
    /// Reads `config/default.toml` if present, then `config/{APP_ENV}.toml`,
    /// then `APP__`-prefixed environment variables, later sources winning.
    ///
    /// # Errors
    /// Returns an error if required values (such as the JWT secret) are
    /// missing from every source, or a value fails to parse.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let env_name = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let settings = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env_name}")).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()
            .map_err(|e| ConfigError::Load(e.to_string()))?;

        settings
            .try_deserialize()
            .map_err(|e| ConfigError::Load(e.to_string()))
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
