//! HTTP API for the authentication server.
//!
//! # Modules
//!
//! - [`auth`]: Account lifecycle handlers (register, login, refresh, reset, profile)
//! - [`middleware`]: Bearer-token authentication for protected endpoints
//! - [`error`]: Mapping of auth failures onto status codes and `{"error"}` bodies
//! - [`rate_limiter`]: Per-email sliding windows for login and forgot-password
//! - [`request_id`]: `x-request-id` propagation
//!
//! # Endpoints Overview
//!
//! Auth routes are mounted at both `/auth` and `/api/v1/auth`:
//!
//! ```text
//! POST /register          - Create account (public)
//! POST /login             - Start session (public, rate limited)
//! POST /refresh-token     - Rotate token pair (public)
//! POST /forgot-password   - Issue reset token (public, rate limited)
//! POST /reset-password    - Consume reset token (public)
//! POST /logout            - End session (auth required)
//! GET  /me                - Current profile (auth required)
//! PUT  /profile           - Update names (auth required)
//! ```
//!
//! Root routes: `/`, `/ping`, `/version`, `/status`, `/health`, `/live`, `/ready`.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use op_server::api::{create_router, AppState};
//! use onepolicy::{AuthConfig, AuthManager, MemoryAccountStore};
//! use std::sync::Arc;
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!
//! let store = Arc::new(MemoryAccountStore::new());
//! let auth_manager = AuthManager::new(store.clone(), &AuthConfig::new("secret"))?;
//! let app = create_router(AppState::new(Arc::new(auth_manager), store, false));
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively. In production, configure appropriate
//! origins, methods, and headers.

pub mod auth;
pub mod error;
pub mod middleware;
pub mod rate_limiter;
pub mod request_id;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post, put},
};
use onepolicy::{AccountStore, AuthManager};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use rate_limiter::KeyedRateLimiter;

/// Application state shared across all HTTP handlers.
///
/// Cloned for each request (cheap due to Arc wrappers).
#[derive(Clone)]
pub struct AppState {
    pub auth_manager: Arc<AuthManager>,
    /// Same store the manager uses; health probes ping it directly
    pub store: Arc<dyn AccountStore>,
    pub login_limiter: Arc<KeyedRateLimiter>,
    pub reset_limiter: Arc<KeyedRateLimiter>,
    /// Include the reset token in forgot-password responses
    pub expose_reset_token: bool,
}

impl AppState {
    /// State with the default login and forgot-password limits
    pub fn new(
        auth_manager: Arc<AuthManager>,
        store: Arc<dyn AccountStore>,
        expose_reset_token: bool,
    ) -> Self {
        Self {
            auth_manager,
            store,
            login_limiter: Arc::new(KeyedRateLimiter::login()),
            reset_limiter: Arc::new(KeyedRateLimiter::forgot_password()),
            expose_reset_token,
        }
    }
}

/// Create the complete API router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    let root_routes = Router::new()
        .route("/", get(root))
        .route("/ping", get(ping))
        .route("/version", get(version))
        .route("/status", get(live))
        .route("/health", get(health_check))
        .route("/live", get(live))
        .route("/ready", get(ready));

    let auth_routes = create_auth_router(state.clone());

    Router::new()
        .merge(root_routes)
        .nest("/api/v1/auth", auth_routes.clone())
        .nest("/auth", auth_routes)
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn create_auth_router(state: AppState) -> Router<AppState> {
    let public_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/refresh-token", post(auth::refresh_token))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password));

    let protected_routes = Router::new()
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .route("/profile", put(auth::update_profile))
        .layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth_middleware,
        ));

    Router::new().merge(public_routes).merge(protected_routes)
}

async fn root() -> impl IntoResponse {
    Json(json!({ "message": "Hello from onepolicy-api" }))
}

async fn ping() -> impl IntoResponse {
    Json(json!({ "message": "pong" }))
}

async fn version() -> impl IntoResponse {
    Json(json!({ "version": env!("CARGO_PKG_VERSION") }))
}

async fn live() -> impl IntoResponse {
    Json(json!({ "status": "OK" }))
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the account store answers a ping, `503 Service
/// Unavailable` otherwise.
///
/// ```bash
/// curl http://localhost:8080/health
/// # {"status":"healthy","version":"1.0.0","database":true,"timestamp":"2026-01-01T10:30:00Z"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_healthy = match state.store.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            false
        }
    };

    let status_code = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if db_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}

/// Readiness probe: ready once the store is reachable.
async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.ping().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "OK" }))),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unavailable" })),
        ),
    }
}
