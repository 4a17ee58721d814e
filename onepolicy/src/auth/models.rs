//! Authentication data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account ID type
pub type AccountId = i64;

/// Stored account record.
///
/// Carries the password hash and token digests, so it is not `Serialize`. Convert to [`AccountProfile`] before handing it to a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub access_token_digest: Option<String>,
    pub refresh_token_digest: Option<String>,
    pub reset_token_digest: Option<String>,
    pub reset_token_expires_at: Option<DateTime<Utc>>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Whether a token pair is currently stored.
    pub fn is_logged_in(&self) -> bool {
        self.access_token_digest.is_some()
    }

    /// Replace the stored session with a new pair of digests.
    pub fn set_session(&mut self, access_digest: String, refresh_digest: String) {
        self.access_token_digest = Some(access_digest);
        self.refresh_token_digest = Some(refresh_digest);
    }

    pub fn clear_session(&mut self) {
        self.access_token_digest = None;
        self.refresh_token_digest = None;
    }

    pub fn clear_reset_token(&mut self) {
        self.reset_token_digest = None;
        self.reset_token_expires_at = None;
    }
}

/// Fields supplied when creating an account
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
}

/// Public view of an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountProfile {
    pub id: AccountId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Account> for AccountProfile {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            email: account.email.clone(),
            first_name: account.first_name.clone(),
            last_name: account.last_name.clone(),
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

/// Account registration request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// Login request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Password reset confirmation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
    pub confirm_password: String,
}

/// Profile update; absent or blank fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

/// Access and refresh token pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Which half of a pair a token is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims shared by access and refresh tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: AccountId,        // Account ID
    pub email: String,
    pub typ: TokenKind,
    pub jti: String,           // Unique per token
    pub iat: i64,              // Issued at timestamp
    pub nbf: i64,              // Not before timestamp
    pub exp: i64,              // Expiration timestamp
}

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub tokens: TokenPair,
    pub profile: AccountProfile,
}

/// Result of a forgot-password request.
///
/// `message` is the same whether or not the email exists. `reset_token` is
/// only set when an account was found and is meant for out-of-band delivery.
#[derive(Debug, Clone)]
pub struct ForgotPasswordOutcome {
    pub message: &'static str,
    pub reset_token: Option<String>,
}
