//! Authentication API handlers.
//!
//! Every route is served under both `/auth` and `/api/v1/auth`.
//!
//! # Examples
//!
//! Register a new account:
//! ```bash
//! curl -X POST http://localhost:8080/auth/register \
//!   -H "Content-Type: application/json" \
//!   -d '{"email": "a@x.com", "password": "Abcdef12!", "first_name": "Ada", "last_name": "Lovelace"}'
//! ```
//!
//! Login:
//! ```bash
//! curl -X POST http://localhost:8080/auth/login \
//!   -H "Content-Type: application/json" \
//!   -d '{"email": "a@x.com", "password": "Abcdef12!"}'
//! ```

use axum::{
    Json,
    extract::{Extension, State, rejection::JsonRejection},
    http::StatusCode,
};
use onepolicy::auth::{
    AccountProfile, AuthError, LoginRequest, RegisterRequest, ResetPasswordRequest,
    UpdateProfileRequest, normalize_email,
};
use serde::{Deserialize, Serialize};

use super::{AppState, error::ApiError, middleware::AuthenticatedAccount, request_id::RequestId};
use crate::{logging::log_security_event, metrics};

type JsonBody<T> = Result<Json<T>, JsonRejection>;

#[derive(Debug, Deserialize)]
pub struct RefreshTokenPayload {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordPayload {
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: &str) -> Json<Self> {
        Json(Self {
            message: message.to_string(),
        })
    }
}

/// `register` and `update_profile` response
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub message: String,
    pub user: AccountProfile,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub message: String,
    pub access_token: String,
    pub refresh_token: String,
    pub user: AccountProfile,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub message: String,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ForgotPasswordResponse {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_token: Option<String>,
}

/// Register a new account.
///
/// # Request Body
///
/// ```json
/// {"email": "a@x.com", "password": "Abcdef12!", "first_name": "Ada", "last_name": "Lovelace"}
/// ```
///
/// # Response
///
/// `201 Created` with `{"message": "User registered successfully", "user": {...}}`.
/// No session is started; the client logs in separately.
///
/// # Errors
///
/// - `400 Bad Request`: invalid email, password policy, or missing names
/// - `409 Conflict`: email already registered
pub async fn register(
    State(state): State<AppState>,
    payload: JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let Json(request) = payload?;

    let result = state.auth_manager.register(request).await;
    metrics::registrations_total(result.is_ok());
    let user = result?;

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            message: "User registered successfully".to_string(),
            user,
        }),
    ))
}

/// Authenticate and start a session.
///
/// # Response
///
/// `200 OK` with `{"message", "access_token", "refresh_token", "user"}`.
/// Any earlier session of the account is replaced.
///
/// # Errors
///
/// - `401 Unauthorized`: `Invalid email or password`, for unknown emails and wrong passwords alike
/// - `429 Too Many Requests`: more than 5 attempts for the email within 5 minutes
pub async fn login(
    State(state): State<AppState>,
    request_id: RequestId,
    payload: JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(request) = payload?;

    if !state.login_limiter.check(&normalize_email(&request.email)) {
        metrics::rate_limit_hits_total("login");
        log_security_event("rate_limited", None, "Login attempts exceeded");
        return Err(ApiError::RateLimited);
    }

    let result = state.auth_manager.login(request).await;
    metrics::login_attempts_total(result.is_ok());

    match result {
        Ok(outcome) => Ok(Json(LoginResponse {
            message: "Login successful".to_string(),
            access_token: outcome.tokens.access_token,
            refresh_token: outcome.tokens.refresh_token,
            user: outcome.profile,
        })),
        Err(e) => {
            if matches!(e, AuthError::InvalidCredentials) {
                log_security_event(
                    "failed_login",
                    None,
                    &format!("Invalid credentials (request {})", request_id.as_str()),
                );
            }
            Err(e.into())
        }
    }
}

/// Rotate the token pair.
///
/// # Request Body
///
/// ```json
/// {"refresh_token": "eyJhbGciOiJIUzI1NiIs..."}
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: `Invalid refresh token`, whatever the underlying cause
pub async fn refresh_token(
    State(state): State<AppState>,
    payload: JsonBody<RefreshTokenPayload>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let Json(payload) = payload?;

    let result = state.auth_manager.refresh(&payload.refresh_token).await;
    metrics::token_refreshes_total(result.is_ok());
    let tokens = result?;

    Ok(Json(RefreshResponse {
        message: "Token refreshed successfully".to_string(),
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
    }))
}

/// Start the password reset flow.
///
/// The response message is the same whether or not the email is registered.
/// `reset_token` is only included when the server runs with
/// `EXPOSE_RESET_TOKEN=true`.
///
/// # Errors
///
/// - `400 Bad Request`: malformed email
/// - `429 Too Many Requests`: more than 3 requests for the email within an hour
pub async fn forgot_password(
    State(state): State<AppState>,
    payload: JsonBody<ForgotPasswordPayload>,
) -> Result<Json<ForgotPasswordResponse>, ApiError> {
    let Json(payload) = payload?;

    if !state.reset_limiter.check(&normalize_email(&payload.email)) {
        metrics::rate_limit_hits_total("forgot_password");
        log_security_event("rate_limited", None, "Password reset requests exceeded");
        return Err(ApiError::RateLimited);
    }

    let outcome = state.auth_manager.forgot_password(&payload.email).await?;
    metrics::password_resets_total("requested");

    let reset_token = if state.expose_reset_token {
        outcome.reset_token
    } else {
        None
    };

    Ok(Json(ForgotPasswordResponse {
        message: outcome.message.to_string(),
        reset_token,
    }))
}

/// Complete the password reset flow.
///
/// # Request Body
///
/// ```json
/// {"token": "9f86d0...", "password": "NewPass456!", "confirm_password": "NewPass456!"}
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: mismatched confirmation, password policy, or an
///   unknown, expired or already used token
pub async fn reset_password(
    State(state): State<AppState>,
    payload: JsonBody<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(request) = payload?;

    state.auth_manager.reset_password(request).await?;
    metrics::password_resets_total("completed");

    Ok(MessageResponse::new("Password has been reset successfully"))
}

/// End the current session; both tokens stop working.
pub async fn logout(
    State(state): State<AppState>,
    Extension(session): Extension<AuthenticatedAccount>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.auth_manager.logout(&session.token).await?;
    metrics::logouts_total();

    Ok(MessageResponse::new("Logged out successfully"))
}

/// Profile of the authenticated account.
pub async fn me(Extension(session): Extension<AuthenticatedAccount>) -> Json<AccountProfile> {
    Json(AccountProfile::from(&session.account))
}

/// Update first and/or last name; absent or blank fields are left unchanged.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(session): Extension<AuthenticatedAccount>,
    payload: JsonBody<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let Json(request) = payload?;

    let user = state
        .auth_manager
        .update_profile(&session.token, request)
        .await?;

    Ok(Json(UserResponse {
        message: "Profile updated successfully".to_string(),
        user,
    }))
}
