//! Authentication manager implementation.

use super::{
    config::{AuthConfig, PASSWORD_MAX_LENGTH},
    errors::{AuthError, AuthResult},
    hasher::CredentialHasher,
    models::{
        Account, AccountProfile, ForgotPasswordOutcome, LoginOutcome, LoginRequest, NewAccount,
        RegisterRequest, ResetPasswordRequest, TokenKind, TokenPair, UpdateProfileRequest,
    },
    reset::ResetTokenManager,
    tokens::{TokenIssuer, token_digest},
};
use crate::db::AccountStore;
use log::{debug, info, warn};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Message returned by `forgot_password` in every case
pub const FORGOT_PASSWORD_MESSAGE: &str =
    "If your email is registered, you will receive a password reset link";

/// Upper bound on first/last name length
const NAME_MAX_LENGTH: usize = 100;

/// Upper bound on email length (RFC 5321 path limit)
const EMAIL_MAX_LENGTH: usize = 254;

/// Authentication manager
///
/// Orchestrates the account store, password hasher, token issuer and reset
/// token manager. Cheap to clone; share one instance per process.
#[derive(Clone)]
pub struct AuthManager {
    store: Arc<dyn AccountStore>,
    hasher: CredentialHasher,
    issuer: TokenIssuer,
    resets: ResetTokenManager,
    password_min_length: usize,
    /// Verified against for unknown emails so both login failures cost the same
    dummy_hash: String,
}

impl AuthManager {
    /// Create a new authentication manager
    ///
    /// # Arguments
    ///
    /// * `store` - Account store
    /// * `config` - Validated auth configuration
    ///
    /// # Errors
    ///
    /// * `AuthError::Config` - a lifetime is non-positive or out of range
    /// * `AuthError::HashingError` - the timing-equalization hash could not be built
    pub fn new(store: Arc<dyn AccountStore>, config: &AuthConfig) -> AuthResult<Self> {
        config.validate()?;

        let hasher = CredentialHasher::new(config.password_pepper.clone());
        let dummy_hash = hasher.hash(&uuid::Uuid::new_v4().to_string())?;

        Ok(Self {
            issuer: TokenIssuer::new(
                &config.jwt_secret,
                config.access_token_ttl()?,
                config.refresh_token_ttl()?,
            ),
            resets: ResetTokenManager::new(store.clone(), config.reset_token_ttl()?),
            store,
            hasher,
            password_min_length: config.password_min_length,
            dummy_hash,
        })
    }

    /// Token issuer used by this manager
    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    /// Register a new account
    ///
    /// # Errors
    ///
    /// * `AuthError::ValidationFailed` - malformed email, weak password or bad name
    /// * `AuthError::EmailAlreadyRegistered` - email already exists
    pub async fn register(&self, request: RegisterRequest) -> AuthResult<AccountProfile> {
        let email = normalize_email(&request.email);
        validate_email(&email)?;
        self.validate_password(&request.password)?;
        let first_name = validate_name("first_name", &request.first_name)?;
        let last_name = validate_name("last_name", &request.last_name)?;

        if self.store.find_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailAlreadyRegistered);
        }

        let password_hash = self.hasher.hash(&request.password)?;

        // A concurrent registration can still win the unique index; the
        // store reports that as Duplicate, which maps to EmailAlreadyRegistered.
        let account = self
            .store
            .create(NewAccount {
                email,
                password_hash,
                first_name,
                last_name,
            })
            .await?;

        info!("Registered account {}", account.id);
        Ok(AccountProfile::from(&account))
    }

    /// Login with email and password
    ///
    /// Replaces any token pair already stored on the account.
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidCredentials` - unknown email or wrong password
    pub async fn login(&self, request: LoginRequest) -> AuthResult<LoginOutcome> {
        let email = normalize_email(&request.email);

        let Some(mut account) = self.store.find_by_email(&email).await? else {
            // Burn the same Argon2 work as a real check.
            let _ = self.hasher.verify(&request.password, &self.dummy_hash);
            debug!("Login rejected: unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        if !self.hasher.verify(&request.password, &account.password_hash)? {
            warn!("Login rejected: wrong password for account {}", account.id);
            return Err(AuthError::InvalidCredentials);
        }

        let tokens = self.start_session(&mut account).await?;
        info!("Account {} logged in", account.id);

        Ok(LoginOutcome {
            tokens,
            profile: AccountProfile::from(&account),
        })
    }

    /// Resolve an access token to the account it currently authorizes
    ///
    /// The token must validate cryptographically and must be the access token
    /// stored on the account named by its `sub` claim.
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidToken` - not the account's current access token
    /// * `AuthError::TokenExpired` / `TokenMalformed` / `TokenSignatureInvalid`
    ///   / `TokenNotYetValid` - failed validation
    pub async fn authenticate(&self, access_token: &str) -> AuthResult<Account> {
        let claims = self.issuer.validate_kind(access_token, TokenKind::Access)?;

        let account = self
            .store
            .find_by_access_token(&token_digest(access_token))
            .await?
            .ok_or(AuthError::InvalidToken)?;

        if account.id != claims.sub {
            return Err(AuthError::InvalidToken);
        }

        Ok(account)
    }

    /// Logout: clear the stored token pair
    pub async fn logout(&self, access_token: &str) -> AuthResult<()> {
        let mut account = self.authenticate(access_token).await?;
        account.clear_session();
        self.store.save(&account).await?;

        info!("Account {} logged out", account.id);
        Ok(())
    }

    /// Exchange the current refresh token for a new pair
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidRefreshToken` - any reason the token is not usable
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<TokenPair> {
        let claims = self
            .issuer
            .validate_kind(refresh_token, TokenKind::Refresh)
            .map_err(|e| {
                debug!("Refresh rejected: {}", e);
                AuthError::InvalidRefreshToken
            })?;

        let mut account = self
            .store
            .find_by_refresh_token(&token_digest(refresh_token))
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;

        if account.id != claims.sub {
            return Err(AuthError::InvalidRefreshToken);
        }

        let tokens = self
            .start_session(&mut account)
            .await
            .map_err(|e| match e {
                // Someone else rotated or logged out first.
                AuthError::Conflict => AuthError::InvalidRefreshToken,
                other => other,
            })?;

        debug!("Account {} refreshed its tokens", account.id);
        Ok(tokens)
    }

    /// Start the password reset flow
    ///
    /// The outcome message is identical for known and unknown emails; a
    /// token is only generated when the account exists and the save wins.
    ///
    /// # Errors
    ///
    /// * `AuthError::ValidationFailed` - malformed email
    pub async fn forgot_password(&self, email: &str) -> AuthResult<ForgotPasswordOutcome> {
        let email = normalize_email(email);
        validate_email(&email)?;

        let reset_token = match self.store.find_by_email(&email).await? {
            Some(account) => match self.resets.issue(&account).await {
                Ok(token) => {
                    info!("Issued password reset token for account {}", account.id);
                    Some(token)
                }
                // Lost the race to a concurrent save; answer as for an unknown email.
                Err(AuthError::Conflict | AuthError::AccountNotFound) => {
                    debug!("Reset token for account {} not stored: account changed", account.id);
                    None
                }
                Err(e) => return Err(e),
            },
            None => {
                debug!("Password reset requested for unknown email");
                None
            }
        };

        Ok(ForgotPasswordOutcome {
            message: FORGOT_PASSWORD_MESSAGE,
            reset_token,
        })
    }

    /// Complete the password reset flow
    ///
    /// # Errors
    ///
    /// * `AuthError::PasswordMismatch` - confirmation differs
    /// * `AuthError::ValidationFailed` - new password violates the policy
    /// * `AuthError::InvalidOrExpiredToken` - token unknown, expired or used
    pub async fn reset_password(&self, request: ResetPasswordRequest) -> AuthResult<()> {
        let matches: bool = request
            .password
            .as_bytes()
            .ct_eq(request.confirm_password.as_bytes())
            .into();
        if !matches {
            return Err(AuthError::PasswordMismatch);
        }
        self.validate_password(&request.password)?;

        let password_hash = self.hasher.hash(&request.password)?;
        let account = self.resets.consume(&request.token, password_hash).await?;

        info!("Password reset for account {}", account.id);
        Ok(())
    }

    /// Profile of the account an access token authorizes
    pub async fn profile(&self, access_token: &str) -> AuthResult<AccountProfile> {
        let account = self.authenticate(access_token).await?;
        Ok(AccountProfile::from(&account))
    }

    /// Update first/last name; absent or blank fields are left unchanged
    pub async fn update_profile(
        &self,
        access_token: &str,
        request: UpdateProfileRequest,
    ) -> AuthResult<AccountProfile> {
        let mut account = self.authenticate(access_token).await?;

        if let Some(first_name) = non_blank(request.first_name) {
            account.first_name = validate_name("first_name", &first_name)?;
        }
        if let Some(last_name) = non_blank(request.last_name) {
            account.last_name = validate_name("last_name", &last_name)?;
        }

        let saved = self.store.save(&account).await?;
        Ok(AccountProfile::from(&saved))
    }

    /// Issue a pair, store its digests on `account` and save
    async fn start_session(&self, account: &mut Account) -> AuthResult<TokenPair> {
        let tokens = self.issuer.issue_pair(account.id, &account.email)?;
        account.set_session(
            token_digest(&tokens.access_token),
            token_digest(&tokens.refresh_token),
        );
        *account = self.store.save(account).await?;
        Ok(tokens)
    }

    /// Validate password length policy
    fn validate_password(&self, password: &str) -> AuthResult<()> {
        let len = password.chars().count();
        if len < self.password_min_length {
            return Err(AuthError::ValidationFailed(format!(
                "password must be at least {} characters long",
                self.password_min_length
            )));
        }
        if len > PASSWORD_MAX_LENGTH {
            return Err(AuthError::ValidationFailed(format!(
                "password must be at most {PASSWORD_MAX_LENGTH} characters long"
            )));
        }
        Ok(())
    }
}

/// Trim and lower-case an email; every store lookup uses this form
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validate email format
fn validate_email(email: &str) -> AuthResult<()> {
    let invalid = || AuthError::ValidationFailed("email must be a valid email address".to_string());

    if email.is_empty() || email.len() > EMAIL_MAX_LENGTH {
        return Err(invalid());
    }
    if email.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(invalid());
    }

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|label| label.is_empty()) {
        return Err(invalid());
    }

    Ok(())
}

/// Validate a profile name and return it trimmed
fn validate_name(field: &str, value: &str) -> AuthResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AuthError::ValidationFailed(format!("{field} is required")));
    }
    if trimmed.chars().count() > NAME_MAX_LENGTH {
        return Err(AuthError::ValidationFailed(format!(
            "{field} must be at most {NAME_MAX_LENGTH} characters long"
        )));
    }
    Ok(trimmed.to_string())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
