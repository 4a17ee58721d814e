//! # onepolicy
//!
//! Account registration, login, logout, token refresh, password reset and
//! profile management over a relational account table.
//!
//! ## Core Modules
//!
//! - [`auth`]: credential hashing, token issuance/validation, reset tokens and
//!   the [`AuthManager`](auth::AuthManager) that orchestrates them
//! - [`db`]: the [`AccountStore`](db::AccountStore) trait with PostgreSQL and
//!   in-memory implementations, pool setup and query timeouts
//!
//! Transport is left to the caller; see the `op_server` crate for the HTTP
//! front end.

/// Credential and token lifecycle.
pub mod auth;

/// Account persistence.
pub mod db;

pub use auth::{AuthConfig, AuthError, AuthManager, AuthResult};
pub use db::{AccountStore, Database, DatabaseConfig, MemoryAccountStore, PgAccountStore};
