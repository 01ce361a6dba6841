//! Domain errors - error taxonomy for the realtime service

use thiserror::Error;

use crate::ids::{MessageId, RoomId, UserId};

/// Domain layer errors
///
/// Every failure an inbound operation can produce maps to one of these.
/// Transport-level delivery failures to individual endpoints are logged and
/// swallowed at the dispatch layer; they never appear here.
#[derive(Debug, Error)]
pub enum DomainError {
    // =========================================================================
    // Authentication / Capacity (connect time)
    // =========================================================================
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("User account is not active")]
    AccountInactive,

    #[error("Endpoint limit reached: user already has {limit} live connections")]
    CapacityExceeded { limit: usize },

    // =========================================================================
    // Authorization
    // =========================================================================
    #[error("User is not a participant of room {0}")]
    NotParticipant(RoomId),

    #[error("Action requires {required} role or above")]
    MissingRole { required: &'static str },

    // =========================================================================
    // Not Found
    // =========================================================================
    #[error("Room not found: {0}")]
    RoomNotFound(RoomId),

    #[error("Message not found: {0}")]
    MessageNotFound(MessageId),

    #[error("User not found: {0}")]
    UserNotFound(UserId),

    // =========================================================================
    // Validation
    // =========================================================================
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Message content too long: max {max} characters")]
    ContentTooLong { max: usize },

    // =========================================================================
    // Infrastructure (wrapped)
    // =========================================================================
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    /// Get an error code string for the outbound `error` event
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed(_) => "AUTHENTICATION_FAILED",
            Self::AccountInactive => "ACCOUNT_INACTIVE",
            Self::CapacityExceeded { .. } => "CAPACITY_EXCEEDED",
            Self::NotParticipant(_) => "NOT_PARTICIPANT",
            Self::MissingRole { .. } => "MISSING_ROLE",
            Self::RoomNotFound(_) => "UNKNOWN_ROOM",
            Self::MessageNotFound(_) => "UNKNOWN_MESSAGE",
            Self::UserNotFound(_) => "UNKNOWN_USER",
            Self::Validation(_) | Self::ContentTooLong { .. } => "VALIDATION_ERROR",
            Self::Persistence(_) => "PERSISTENCE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Check if this is an authorization failure
    #[must_use]
    pub fn is_authorization(&self) -> bool {
        matches!(self, Self::NotParticipant(_) | Self::MissingRole { .. })
    }

    /// Check if this is a not-found failure
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::RoomNotFound(_) | Self::MessageNotFound(_) | Self::UserNotFound(_)
        )
    }

    /// Create a validation error
    #[must_use]
    pub fn validation(msg: impl std::fmt::Display) -> Self {
        Self::Validation(msg.to_string())
    }

    /// Create a persistence error from any error
    #[must_use]
    pub fn persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}
