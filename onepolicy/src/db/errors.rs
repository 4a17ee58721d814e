//! Account store error types.

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by an [`AccountStore`](super::AccountStore)
#[derive(Debug, Error)]
pub enum StoreError {
    /// Record to update does not exist
    #[error("Account not found")]
    NotFound,

    /// Unique constraint on email violated
    #[error("Email already exists")]
    Duplicate,

    /// Compare-and-swap lost against a concurrent writer
    #[error("Account was modified concurrently")]
    Conflict,

    /// Operation exceeded its deadline
    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),

    /// Database error
    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                StoreError::Duplicate
            }
            other => StoreError::Database(other),
        }
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
