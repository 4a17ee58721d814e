//! Authentication configuration.
//!
//! Built once at startup and passed by value into [`AuthManager`](super::AuthManager).
//! Nothing in the auth module reads the environment.

use chrono::Duration;

/// Default minimum password length
pub const DEFAULT_PASSWORD_MIN_LENGTH: usize = 8;

/// Upper bound on password length, keeps Argon2 input bounded
pub const PASSWORD_MAX_LENGTH: usize = 128;

/// Longest accepted access token lifetime (one day)
pub const MAX_ACCESS_TOKEN_TTL_MINUTES: i64 = 24 * 60;

/// Longest accepted refresh token lifetime (one year)
pub const MAX_REFRESH_TOKEN_TTL_DAYS: i64 = 365;

/// Longest accepted reset token lifetime (one day)
pub const MAX_RESET_TOKEN_TTL_MINUTES: i64 = 24 * 60;

/// Token and password policy settings
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HMAC secret used to sign tokens (required, non-empty)
    pub jwt_secret: String,

    /// Access token lifetime in minutes
    pub access_token_ttl_minutes: i64,

    /// Refresh token lifetime in days
    pub refresh_token_ttl_days: i64,

    /// Minimum accepted password length
    pub password_min_length: usize,

    /// Reset token lifetime in minutes
    pub reset_token_ttl_minutes: i64,

    /// Server-side pepper appended to passwords before hashing (may be empty)
    pub password_pepper: String,
}

impl AuthConfig {
    /// Create a configuration with default lifetimes (15 minutes / 7 days)
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            access_token_ttl_minutes: 15,
            refresh_token_ttl_days: 7,
            password_min_length: DEFAULT_PASSWORD_MIN_LENGTH,
            reset_token_ttl_minutes: 60,
            password_pepper: String::new(),
        }
    }

    /// Check every field
    ///
    /// # Errors
    ///
    /// Returns the first field that is out of range.
    pub fn validate(&self) -> Result<(), AuthConfigError> {
        if self.jwt_secret.is_empty() {
            return Err(AuthConfigError::EmptySecret);
        }
        check_lifetime(
            "access_token_ttl_minutes",
            self.access_token_ttl_minutes,
            MAX_ACCESS_TOKEN_TTL_MINUTES,
        )?;
        check_lifetime(
            "refresh_token_ttl_days",
            self.refresh_token_ttl_days,
            MAX_REFRESH_TOKEN_TTL_DAYS,
        )?;
        check_lifetime(
            "reset_token_ttl_minutes",
            self.reset_token_ttl_minutes,
            MAX_RESET_TOKEN_TTL_MINUTES,
        )?;
        if self.password_min_length == 0 || self.password_min_length > PASSWORD_MAX_LENGTH {
            return Err(AuthConfigError::PasswordLength(self.password_min_length));
        }
        Ok(())
    }

    pub fn access_token_ttl(&self) -> Result<Duration, AuthConfigError> {
        Duration::try_minutes(self.access_token_ttl_minutes).ok_or(AuthConfigError::OutOfRange {
            field: "access_token_ttl_minutes",
            max: MAX_ACCESS_TOKEN_TTL_MINUTES,
        })
    }

    pub fn refresh_token_ttl(&self) -> Result<Duration, AuthConfigError> {
        Duration::try_days(self.refresh_token_ttl_days).ok_or(AuthConfigError::OutOfRange {
            field: "refresh_token_ttl_days",
            max: MAX_REFRESH_TOKEN_TTL_DAYS,
        })
    }

    pub fn reset_token_ttl(&self) -> Result<Duration, AuthConfigError> {
        Duration::try_minutes(self.reset_token_ttl_minutes).ok_or(AuthConfigError::OutOfRange {
            field: "reset_token_ttl_minutes",
            max: MAX_RESET_TOKEN_TTL_MINUTES,
        })
    }
}

fn check_lifetime(field: &'static str, value: i64, max: i64) -> Result<(), AuthConfigError> {
    if value <= 0 {
        return Err(AuthConfigError::NonPositive(field));
    }
    if value > max {
        return Err(AuthConfigError::OutOfRange { field, max });
    }
    Ok(())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum AuthConfigError {
    #[error("JWT secret must not be empty")]
    EmptySecret,

    #[error("{0} must be a positive integer")]
    NonPositive(&'static str),

    #[error("{field} must be at most {max}")]
    OutOfRange { field: &'static str, max: i64 },

    /// A lifetime pushed an expiry past the representable date range
    #[error("token expiry is out of range")]
    ExpiryOverflow,

    #[error("password minimum length must be between 1 and {PASSWORD_MAX_LENGTH}, got {0}")]
    PasswordLength(usize),
}
