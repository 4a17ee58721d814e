//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use onepolicy::{
    auth::{AuthConfig, AuthConfigError, config::DEFAULT_PASSWORD_MIN_LENGTH},
    db::DatabaseConfig,
};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Default listen address when neither `--bind` nor `SERVER_BIND` is set
pub const DEFAULT_BIND: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8080);

/// Default database used when `DATABASE_URL` is unset
pub const DEFAULT_DATABASE_URL: &str = "postgres://postgres@localhost/onepolicy";

/// Secrets shorter than this are accepted but logged as weak
const RECOMMENDED_SECRET_LEN: usize = 32;

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Token, password and reset settings handed to the auth core
    pub auth: AuthConfig,
    /// Return the reset token in the forgot-password response (development only)
    pub expose_reset_token: bool,
    /// Prometheus scrape listener; metrics stay disabled when `None`
    pub metrics_bind: Option<SocketAddr>,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `database_url_override` - Optional database URL override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if required variables are missing or invalid
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_env_opt("SERVER_BIND")?.unwrap_or(DEFAULT_BIND),
        };

        let database_url = database_url_override
            .or_else(|| std::env::var("DATABASE_URL").ok())
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let database = DatabaseConfig {
            database_url,
            max_connections: parse_env_or("DB_MAX_CONNECTIONS", 20)?,
            min_connections: parse_env_or("DB_MIN_CONNECTIONS", 5)?,
            connection_timeout_secs: parse_env_or("DB_CONNECTION_TIMEOUT_SECS", 5)?,
            idle_timeout_secs: parse_env_or("DB_IDLE_TIMEOUT_SECS", 300)?,
            max_lifetime_secs: parse_env_or("DB_MAX_LIFETIME_SECS", 1800)?,
            query_timeout_secs: parse_env_or("DB_QUERY_TIMEOUT_SECS", 5)?,
        };

        let jwt_secret = std::env::var("JWT_SECRET").map_err(|_| ConfigError::MissingRequired {
            var: "JWT_SECRET".to_string(),
            hint: "Generate with: openssl rand -hex 32".to_string(),
        })?;

        if jwt_secret.len() < RECOMMENDED_SECRET_LEN {
            tracing::warn!(
                "JWT_SECRET is shorter than {} characters; use a longer secret in production",
                RECOMMENDED_SECRET_LEN
            );
        }

        let auth = AuthConfig {
            jwt_secret,
            access_token_ttl_minutes: parse_env_or("JWT_ACCESS_TOKEN_EXPIRY_MINUTES", 15)?,
            refresh_token_ttl_days: parse_env_or("JWT_REFRESH_TOKEN_EXPIRY_DAYS", 7)?,
            password_min_length: parse_env_or("PASSWORD_MIN_LENGTH", DEFAULT_PASSWORD_MIN_LENGTH)?,
            reset_token_ttl_minutes: parse_env_or("RESET_TOKEN_EXPIRY_MINUTES", 60)?,
            password_pepper: std::env::var("PASSWORD_PEPPER").unwrap_or_default(),
        };

        let config = ServerConfig {
            bind,
            database,
            auth,
            expose_reset_token: parse_env_or("EXPOSE_RESET_TOKEN", false)?,
            metrics_bind: parse_env_opt("METRICS_BIND")?,
        };
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.auth.validate()?;

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid {
                var: "DB_MAX_CONNECTIONS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Invalid {
                var: "DB_MIN_CONNECTIONS".to_string(),
                reason: format!(
                    "Cannot exceed max connections ({})",
                    self.database.max_connections
                ),
            });
        }

        if self.database.query_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "DB_QUERY_TIMEOUT_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },

    #[error("Invalid auth configuration: {0}")]
    Auth(#[from] AuthConfigError),
}

/// Parse an environment variable, falling back to `default` when unset
///
/// A set but unparsable value is an error rather than a silent fallback.
fn parse_env_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    Ok(parse_env_opt(key)?.unwrap_or(default))
}

fn parse_env_opt<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => {
            raw.trim()
                .parse()
                .map(Some)
                .map_err(|_| ConfigError::Invalid {
                    var: key.to_string(),
                    reason: format!("Could not parse '{raw}'"),
                })
        }
        _ => Ok(None),
    }
}
