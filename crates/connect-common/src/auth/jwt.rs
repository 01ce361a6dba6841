//! JWT utilities for connect-time authentication
//!
//! Token encoding, decoding, and validation using the `jsonwebtoken` crate,
//! plus the `AuthProvider` implementation the gateway hands to the realtime
//! service.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use connect_core::{AuthProvider, AuthenticatedUser, DomainError, UserId};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

fn default_active() -> bool {
    true
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Whether the account is active; disabled accounts verify but may
    /// not connect
    #[serde(default = "default_active")]
    pub active: bool,
}

impl Claims {
    /// Get the user ID from the subject claim
    ///
    /// # Errors
    /// Returns an error if the subject is not a valid identifier
    pub fn user_id(&self) -> Result<UserId, AppError> {
        self.sub.parse().map_err(|_| AppError::InvalidToken)
    }

    /// Check if the token is expired
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }
}

/// JWT service for encoding and decoding tokens
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_expiry_secs: i64,
}

impl JwtService {
    /// Create a new JWT service with the given secret and expiry
    #[must_use]
    pub fn new(secret: &str, token_expiry_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            token_expiry_secs,
        }
    }

    /// Issue a token for a user
    ///
    /// # Errors
    /// Returns an error if token encoding fails
    pub fn issue_token(&self, user_id: UserId) -> Result<String, AppError> {
        self.issue_token_with_active(user_id, true)
    }

    /// Issue a token carrying an explicit active flag
    ///
    /// # Errors
    /// Returns an error if token encoding fails
    pub fn issue_token_with_active(
        &self,
        user_id: UserId,
        active: bool,
    ) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.token_expiry_secs)).timestamp(),
            active,
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(AppError::internal)
    }

    /// Validate a token and return its claims
    ///
    /// # Errors
    /// Returns `TokenExpired` or `InvalidToken`
    pub fn validate_token(&self, token: &str) -> Result<Claims, AppError> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::TokenExpired,
                _ => AppError::InvalidToken,
            })?;

        Ok(data.claims)
    }
}

/// `AuthProvider` backed by JWT validation
#[derive(Clone)]
pub struct JwtAuthProvider {
    jwt: JwtService,
}

impl JwtAuthProvider {
    #[must_use]
    pub fn new(jwt: JwtService) -> Self {
        Self { jwt }
    }
}

#[async_trait]
impl AuthProvider for JwtAuthProvider {
    async fn verify(&self, credential: &str) -> Result<AuthenticatedUser, DomainError> {
        // Accept "Bearer <token>" as well as a bare token
        let token = credential.strip_prefix("Bearer ").unwrap_or(credential);

        let claims = self.jwt.validate_token(token).map_err(DomainError::from)?;
        let user_id = claims.user_id().map_err(DomainError::from)?;

        Ok(AuthenticatedUser {
            user_id,
            active: claims.active,
        })
    }
}
