//! Application error types
//!
//! Process-level errors: configuration, token handling, server wiring.
//! Per-operation failures inside the realtime service use
//! `connect_core::DomainError` instead.

use connect_core::DomainError;

/// Application-wide error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Internal error")]
    Internal(#[source] anyhow::Error),
}

impl AppError {
    /// Create an internal error from any error
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self::Internal(err.into())
    }
}

impl From<AppError> for DomainError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::InvalidToken | AppError::TokenExpired => {
                DomainError::AuthenticationFailed(err.to_string())
            }
            AppError::Domain(e) => e,
            other => DomainError::Internal(other.to_string()),
        }
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
