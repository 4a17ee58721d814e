//! Authentication middleware for protected endpoints.
//!
//! Extracts the access token from the `Authorization` header, resolves it to
//! a live session through [`AuthManager::authenticate`](onepolicy::AuthManager::authenticate),
//! then injects an [`AuthenticatedAccount`] into request extensions.
//!
//! # Extracting the Account
//!
//! ```rust,no_run
//! use axum::extract::Extension;
//! use op_server::api::middleware::AuthenticatedAccount;
//!
//! async fn protected_handler(Extension(session): Extension<AuthenticatedAccount>) -> String {
//!     format!("Authenticated as account {}", session.account.id)
//! }
//! # let _ = protected_handler;
//! ```

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use onepolicy::auth::Account;

use super::{AppState, error::ApiError};

/// Session resolved from a bearer token
#[derive(Debug, Clone)]
pub struct AuthenticatedAccount {
    /// Account as read while authenticating
    pub account: Account,
    /// Raw access token the request carried
    pub token: String,
}

/// Pull the token out of `Authorization`
///
/// Accepts both `Bearer <token>` and a bare token.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    (!token.is_empty()).then_some(token)
}

/// Authentication middleware that validates access tokens and injects the account.
///
/// # Behavior
///
/// - **Success**: Injects [`AuthenticatedAccount`] into request extensions and calls the next handler
/// - **Missing header**: `401` with `No authorization token provided`
/// - **Invalid, expired or revoked token**: `401` with the token error message
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers())
        .ok_or(ApiError::MissingToken)?
        .to_string();

    let account = state.auth_manager.authenticate(&token).await?;

    request
        .extensions_mut()
        .insert(AuthenticatedAccount { account, token });
    Ok(next.run(request).await)
}
