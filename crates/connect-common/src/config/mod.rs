//! Configuration module

mod app_config;

pub use app_config::{
    AppConfig, AppSettings, AuthConfig, ConfigError, Environment, RealtimeConfig, ServerConfig,
};
