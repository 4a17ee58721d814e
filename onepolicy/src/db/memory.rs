//! In-memory account store (useful for testing).

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::Mutex;

use super::{
    errors::{StoreError, StoreResult},
    repository::AccountStore,
};
use crate::auth::{Account, AccountId, NewAccount};

struct StoreData {
    accounts: HashMap<AccountId, Account>,
    next_id: AccountId,
}

/// `AccountStore` kept in a mutex-guarded map
///
/// Enforces the same email uniqueness and compare-and-swap rules as the
/// PostgreSQL store.
pub struct MemoryAccountStore {
    data: Mutex<StoreData>,
}

impl Default for MemoryAccountStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self {
            data: Mutex::new(StoreData {
                accounts: HashMap::new(),
                next_id: 1,
            }),
        }
    }

    /// Number of stored accounts
    pub async fn len(&self) -> usize {
        self.data.lock().await.accounts.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn find_where<F>(&self, predicate: F) -> StoreResult<Option<Account>>
    where
        F: Fn(&Account) -> bool + Send,
    {
        let data = self.data.lock().await;
        Ok(data.accounts.values().find(|a| predicate(a)).cloned())
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn find_by_id(&self, id: AccountId) -> StoreResult<Option<Account>> {
        Ok(self.data.lock().await.accounts.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        self.find_where(|a| a.email == email).await
    }

    async fn find_by_access_token(&self, digest: &str) -> StoreResult<Option<Account>> {
        self.find_where(|a| a.access_token_digest.as_deref() == Some(digest))
            .await
    }

    async fn find_by_refresh_token(&self, digest: &str) -> StoreResult<Option<Account>> {
        self.find_where(|a| a.refresh_token_digest.as_deref() == Some(digest))
            .await
    }

    async fn find_by_reset_token(&self, digest: &str) -> StoreResult<Option<Account>> {
        self.find_where(|a| a.reset_token_digest.as_deref() == Some(digest))
            .await
    }

    async fn create(&self, account: NewAccount) -> StoreResult<Account> {
        let mut data = self.data.lock().await;
        if data.accounts.values().any(|a| a.email == account.email) {
            return Err(StoreError::Duplicate);
        }

        let id = data.next_id;
        data.next_id += 1;

        let now = Utc::now();
        let created = Account {
            id,
            email: account.email,
            password_hash: account.password_hash,
            first_name: account.first_name,
            last_name: account.last_name,
            access_token_digest: None,
            refresh_token_digest: None,
            reset_token_digest: None,
            reset_token_expires_at: None,
            version: 0,
            created_at: now,
            updated_at: now,
        };
        data.accounts.insert(id, created.clone());
        Ok(created)
    }

    async fn save(&self, account: &Account) -> StoreResult<Account> {
        let mut data = self.data.lock().await;
        let stored = data
            .accounts
            .get_mut(&account.id)
            .ok_or(StoreError::NotFound)?;

        if stored.version != account.version {
            return Err(StoreError::Conflict);
        }

        // id, email and created_at are immutable.
        stored.password_hash = account.password_hash.clone();
        stored.first_name = account.first_name.clone();
        stored.last_name = account.last_name.clone();
        stored.access_token_digest = account.access_token_digest.clone();
        stored.refresh_token_digest = account.refresh_token_digest.clone();
        stored.reset_token_digest = account.reset_token_digest.clone();
        stored.reset_token_expires_at = account.reset_token_expires_at;
        stored.version += 1;
        stored.updated_at = Utc::now();

        Ok(stored.clone())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
