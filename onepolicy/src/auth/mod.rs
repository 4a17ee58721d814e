//! Authentication module providing registration, login, and session management.
//!
//! This module implements:
//! - Argon2id password hashing with optional server-side pepper
//! - HS256 JWT access tokens (15-minute default expiry)
//! - Rotating refresh tokens (7-day default expiry)
//! - One live token pair per account, stored as SHA-256 digests
//! - Single-use, expiring password reset tokens
//!
//! ## Example
//!
//! ```no_run
//! use onepolicy::auth::{AuthConfig, AuthManager, LoginRequest, RegisterRequest};
//! use onepolicy::db::MemoryAccountStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AuthConfig::new("jwt_secret");
//!     config.validate()?;
//!     let auth = AuthManager::new(Arc::new(MemoryAccountStore::new()), &config)?;
//!
//!     let profile = auth
//!         .register(RegisterRequest {
//!             email: "a@x.com".to_string(),
//!             password: "Abcdef12!".to_string(),
//!             first_name: "Ada".to_string(),
//!             last_name: "Lovelace".to_string(),
//!         })
//!         .await?;
//!     println!("Registered account {}", profile.id);
//!
//!     let outcome = auth
//!         .login(LoginRequest {
//!             email: "a@x.com".to_string(),
//!             password: "Abcdef12!".to_string(),
//!         })
//!         .await?;
//!     auth.logout(&outcome.tokens.access_token).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod errors;
pub mod hasher;
pub mod manager;
pub mod models;
pub mod reset;
pub mod tokens;

pub use config::{AuthConfig, AuthConfigError};
pub use errors::{AuthError, AuthResult};
pub use hasher::CredentialHasher;
pub use manager::{AuthManager, FORGOT_PASSWORD_MESSAGE, normalize_email};
pub use models::{
    Account, AccountId, AccountProfile, ForgotPasswordOutcome, LoginOutcome, LoginRequest,
    NewAccount, RegisterRequest, ResetPasswordRequest, TokenClaims, TokenKind, TokenPair,
    UpdateProfileRequest,
};
pub use reset::ResetTokenManager;
pub use tokens::{TokenIssuer, token_digest};
