//! Single-use password reset tokens.

use super::{
    config::AuthConfigError,
    errors::{AuthError, AuthResult},
    models::Account,
    tokens::token_digest,
};
use crate::db::{AccountStore, StoreError};
use chrono::{Duration, Utc};
use rand::RngCore;
use std::sync::Arc;

/// Random bytes per reset token
const RESET_TOKEN_BYTES: usize = 32;

/// Issues reset tokens and consumes them exactly once
#[derive(Clone)]
pub struct ResetTokenManager {
    store: Arc<dyn AccountStore>,
    ttl: Duration,
}

impl ResetTokenManager {
    pub fn new(store: Arc<dyn AccountStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Generate a reset token for `account`, replacing any earlier one
    ///
    /// Only the digest and expiry are stored; the returned plaintext is meant
    /// for out-of-band delivery.
    pub async fn issue(&self, account: &Account) -> AuthResult<String> {
        let expires_at = Utc::now()
            .checked_add_signed(self.ttl)
            .ok_or(AuthConfigError::ExpiryOverflow)?;

        let mut bytes = [0u8; RESET_TOKEN_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        let token = hex::encode(bytes);

        let mut updated = account.clone();
        updated.reset_token_digest = Some(token_digest(&token));
        updated.reset_token_expires_at = Some(expires_at);
        self.store.save(&updated).await?;

        Ok(token)
    }

    /// Swap in `new_password_hash` and burn the token in one save
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidOrExpiredToken` - unknown, expired, or consumed
    ///   concurrently by another request
    pub async fn consume(&self, token: &str, new_password_hash: String) -> AuthResult<Account> {
        let mut account = self
            .store
            .find_by_reset_token(&token_digest(token))
            .await?
            .ok_or(AuthError::InvalidOrExpiredToken)?;

        let expired = account
            .reset_token_expires_at
            .is_none_or(|expires_at| expires_at <= Utc::now());
        if expired {
            account.clear_reset_token();
            // Best effort: a failure here still leaves the token unusable.
            if let Err(e) = self.store.save(&account).await {
                log::debug!(
                    "Could not clear expired reset token for account {}: {}",
                    account.id,
                    e
                );
            }
            return Err(AuthError::InvalidOrExpiredToken);
        }

        account.password_hash = new_password_hash;
        account.clear_reset_token();

        match self.store.save(&account).await {
            Ok(saved) => Ok(saved),
            Err(StoreError::Conflict | StoreError::NotFound) => {
                Err(AuthError::InvalidOrExpiredToken)
            }
            Err(e) => Err(e.into()),
        }
    }
}
