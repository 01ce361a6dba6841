//! Authentication and presence-cache collaborator traits

use crate::entities::PresenceStatus;
use crate::error::DomainError;
use crate::ids::UserId;
use async_trait::async_trait;

/// Result of verifying a credential
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    /// Disabled accounts verify but may not connect
    pub active: bool,
}

/// Verifies connect-time credentials
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Verify a credential string, returning the user it belongs to
    async fn verify(&self, credential: &str) -> Result<AuthenticatedUser, DomainError>;
}

/// Short-TTL presence store, used as a fallback read path when the live
/// registry is not available (e.g. another process asking about presence)
#[async_trait]
pub trait PresenceCache: Send + Sync {
    /// Record the latest status for a user; the entry expires on its own
    async fn set_status(&self, user_id: UserId, status: PresenceStatus) -> Result<(), DomainError>;

    /// Read the cached status, `None` if missing or expired
    async fn get_status(&self, user_id: UserId) -> Result<Option<PresenceStatus>, DomainError>;
}
