//! Authentication error types.

use thiserror::Error;

use super::config::AuthConfigError;
use crate::db::StoreError;

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// Malformed input (email, password policy, profile fields)
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// Email already exists
    #[error("Email already registered")]
    EmailAlreadyRegistered,

    /// Unknown email or wrong password. Both cases share this variant.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Access token does not belong to a live session
    #[error("Invalid token")]
    InvalidToken,

    /// Refresh token does not belong to a live session
    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    /// Reset token unknown, expired or already used
    #[error("Invalid or expired reset token")]
    InvalidOrExpiredToken,

    /// Token `exp` is in the past
    #[error("Token expired")]
    TokenExpired,

    /// Token could not be decoded
    #[error("Malformed token")]
    TokenMalformed,

    /// Token signature or algorithm does not match
    #[error("Invalid token signature")]
    TokenSignatureInvalid,

    /// Token `nbf` is in the future
    #[error("Token not yet valid")]
    TokenNotYetValid,

    /// Password and confirmation differ
    #[error("Passwords do not match")]
    PasswordMismatch,

    /// Password hashing failed
    #[error("Password hashing failed")]
    HashingError,

    /// Store did not answer in time or is unreachable
    #[error("Account store unavailable: {0}")]
    StoreUnavailable(String),

    /// Account changed between read and save
    #[error("Account was modified concurrently, please retry")]
    Conflict,

    /// Account vanished between read and save
    #[error("Account not found")]
    AccountNotFound,

    /// Token or reset lifetimes unusable
    #[error("Invalid auth configuration: {0}")]
    Config(#[from] AuthConfigError),
}

impl AuthError {
    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Store errors are sanitized to prevent information disclosure
    /// about the internal system structure.
    pub fn client_message(&self) -> String {
        match self {
            AuthError::StoreUnavailable(_) => "Service temporarily unavailable".to_string(),
            AuthError::HashingError | AuthError::Config(_) => {
                "Failed to process request".to_string()
            }
            _ => self.to_string(),
        }
    }

    /// Whether the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AuthError::StoreUnavailable(_) | AuthError::Conflict)
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate => AuthError::EmailAlreadyRegistered,
            StoreError::Conflict => AuthError::Conflict,
            StoreError::NotFound => AuthError::AccountNotFound,
            StoreError::Timeout(_) | StoreError::Database(_) => {
                AuthError::StoreUnavailable(err.to_string())
            }
        }
    }
}

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;
