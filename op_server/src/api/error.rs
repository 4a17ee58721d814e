//! Mapping of auth failures onto HTTP responses.
//!
//! Every error body has the shape `{"error": "<message>"}`. Messages come
//! from [`AuthError::client_message`], so store internals never reach clients.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use onepolicy::auth::AuthError;
use serde::{Deserialize, Serialize};

/// Body returned by every failing endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Errors produced by the HTTP layer
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Body missing, not JSON, or lacking required fields
    #[error("{0}")]
    InvalidBody(String),

    #[error("No authorization token provided")]
    MissingToken,

    #[error("Too many attempts, please try again later")]
    RateLimited,
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidBody(rejection.body_text())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Auth(err) => auth_status(err),
            ApiError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            ApiError::MissingToken => StatusCode::UNAUTHORIZED,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    fn client_message(&self) -> String {
        match self {
            ApiError::Auth(err) => err.client_message(),
            other => other.to_string(),
        }
    }
}

fn auth_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::ValidationFailed(_)
        | AuthError::PasswordMismatch
        | AuthError::InvalidOrExpiredToken => StatusCode::BAD_REQUEST,

        AuthError::InvalidCredentials
        | AuthError::InvalidToken
        | AuthError::InvalidRefreshToken
        | AuthError::TokenExpired
        | AuthError::TokenMalformed
        | AuthError::TokenSignatureInvalid
        | AuthError::TokenNotYetValid
        | AuthError::AccountNotFound => StatusCode::UNAUTHORIZED,

        AuthError::EmailAlreadyRegistered | AuthError::Conflict => StatusCode::CONFLICT,

        AuthError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        AuthError::HashingError | AuthError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            // Full detail stays in the log; the client gets the sanitized text.
            tracing::error!(status = %status, "Request failed: {}", self);
        }

        let body = ErrorResponse {
            error: self.client_message(),
        };
        (status, Json(body)).into_response()
    }
}
