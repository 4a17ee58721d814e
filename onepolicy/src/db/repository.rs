//! Account store trait and its PostgreSQL implementation.
//!
//! The trait keeps the auth core independent of the database so it can be
//! exercised against [`MemoryAccountStore`](super::MemoryAccountStore).

use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use std::time::Duration;

use super::{
    errors::{StoreError, StoreResult},
    timeouts::{DEFAULT_QUERY_TIMEOUT, with_timeout},
};
use crate::auth::{Account, AccountId, NewAccount};

/// Durable record of accounts keyed by id, with lookup by email and token digest
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Find account by ID
    async fn find_by_id(&self, id: AccountId) -> StoreResult<Option<Account>>;

    /// Find account by (normalized) email
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Account>>;

    /// Find account whose current access token has this digest
    async fn find_by_access_token(&self, digest: &str) -> StoreResult<Option<Account>>;

    /// Find account whose current refresh token has this digest
    async fn find_by_refresh_token(&self, digest: &str) -> StoreResult<Option<Account>>;

    /// Find account whose outstanding reset token has this digest
    async fn find_by_reset_token(&self, digest: &str) -> StoreResult<Option<Account>>;

    /// Insert a new account
    ///
    /// Fails with `StoreError::Duplicate` when the email is taken.
    async fn create(&self, account: NewAccount) -> StoreResult<Account>;

    /// Write back every mutable field of `account`
    ///
    /// Succeeds only if the stored `version` still equals `account.version`;
    /// returns the stored record with the bumped version and `updated_at`.
    /// Fails with `StoreError::Conflict` if someone saved in between and
    /// `StoreError::NotFound` if the row is gone.
    async fn save(&self, account: &Account) -> StoreResult<Account>;

    /// Check that the store is reachable
    async fn ping(&self) -> StoreResult<()>;
}

const ACCOUNT_COLUMNS: &str = "id, email, password_hash, first_name, last_name, \
     access_token_digest, refresh_token_digest, reset_token_digest, reset_token_expires_at, \
     version, created_at, updated_at";

/// Default PostgreSQL implementation of `AccountStore`
#[derive(Clone)]
pub struct PgAccountStore {
    pool: PgPool,
    query_timeout: Duration,
}

impl PgAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    /// Override the per-query deadline
    pub fn with_query_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }

    async fn find_one(&self, column: &str, value: &str) -> StoreResult<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE {column} = $1");
        let row = with_timeout(
            self.query_timeout,
            sqlx::query(&sql).bind(value).fetch_optional(&self.pool),
        )
        .await?;

        row.as_ref().map(row_to_account).transpose()
    }
}

fn row_to_account(r: &PgRow) -> StoreResult<Account> {
    Ok(Account {
        id: r.try_get("id")?,
        email: r.try_get("email")?,
        password_hash: r.try_get("password_hash")?,
        first_name: r.try_get("first_name")?,
        last_name: r.try_get("last_name")?,
        access_token_digest: r.try_get("access_token_digest")?,
        refresh_token_digest: r.try_get("refresh_token_digest")?,
        reset_token_digest: r.try_get("reset_token_digest")?,
        reset_token_expires_at: r.try_get("reset_token_expires_at")?,
        version: r.try_get("version")?,
        created_at: r.try_get("created_at")?,
        updated_at: r.try_get("updated_at")?,
    })
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn find_by_id(&self, id: AccountId) -> StoreResult<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1");
        let row = with_timeout(
            self.query_timeout,
            sqlx::query(&sql).bind(id).fetch_optional(&self.pool),
        )
        .await?;

        row.as_ref().map(row_to_account).transpose()
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        self.find_one("email", email).await
    }

    async fn find_by_access_token(&self, digest: &str) -> StoreResult<Option<Account>> {
        self.find_one("access_token_digest", digest).await
    }

    async fn find_by_refresh_token(&self, digest: &str) -> StoreResult<Option<Account>> {
        self.find_one("refresh_token_digest", digest).await
    }

    async fn find_by_reset_token(&self, digest: &str) -> StoreResult<Option<Account>> {
        self.find_one("reset_token_digest", digest).await
    }

    async fn create(&self, account: NewAccount) -> StoreResult<Account> {
        let sql = format!(
            "INSERT INTO accounts (email, password_hash, first_name, last_name) \
             VALUES ($1, $2, $3, $4) RETURNING {ACCOUNT_COLUMNS}"
        );
        let row = with_timeout(
            self.query_timeout,
            sqlx::query(&sql)
                .bind(&account.email)
                .bind(&account.password_hash)
                .bind(&account.first_name)
                .bind(&account.last_name)
                .fetch_one(&self.pool),
        )
        .await?;

        row_to_account(&row)
    }

    async fn save(&self, account: &Account) -> StoreResult<Account> {
        let sql = format!(
            r#"
            UPDATE accounts
            SET password_hash = $3, first_name = $4, last_name = $5,
                access_token_digest = $6, refresh_token_digest = $7,
                reset_token_digest = $8, reset_token_expires_at = $9,
                version = version + 1, updated_at = NOW()
            WHERE id = $1 AND version = $2
            RETURNING {ACCOUNT_COLUMNS}
            "#
        );
        let row = with_timeout(
            self.query_timeout,
            sqlx::query(&sql)
                .bind(account.id)
                .bind(account.version)
                .bind(&account.password_hash)
                .bind(&account.first_name)
                .bind(&account.last_name)
                .bind(&account.access_token_digest)
                .bind(&account.refresh_token_digest)
                .bind(&account.reset_token_digest)
                .bind(account.reset_token_expires_at)
                .fetch_optional(&self.pool),
        )
        .await?;

        match row {
            Some(row) => row_to_account(&row),
            // Distinguish a lost race from a vanished row.
            None => match self.find_by_id(account.id).await? {
                Some(_) => Err(StoreError::Conflict),
                None => Err(StoreError::NotFound),
            },
        }
    }

    async fn ping(&self) -> StoreResult<()> {
        with_timeout(
            self.query_timeout,
            sqlx::query("SELECT 1").execute(&self.pool),
        )
        .await?;
        Ok(())
    }
}
