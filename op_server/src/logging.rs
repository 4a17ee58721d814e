//! Structured logging configuration.
//!
//! The server logs through `tracing`; records emitted by the `onepolicy`
//! library via the `log` facade are forwarded into the same subscriber.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Log levels are configurable via the `RUST_LOG` env var and default to
/// `info` with noisy dependencies turned down.
///
/// # Example
///
/// ```no_run
/// use op_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,hyper=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    // `init` also installs the `log` bridge.
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log security event with structured data
///
/// Never pass tokens, hashes or passwords in `message`.
///
/// # Arguments
///
/// * `event_type` - Type of security event
/// * `account_id` - Optional account ID
/// * `message` - Event message
///
/// # Example
///
/// ```
/// use op_server::logging::log_security_event;
///
/// log_security_event("failed_login", None, "Invalid credentials");
/// ```
pub fn log_security_event(event_type: &str, account_id: Option<i64>, message: &str) {
    tracing::warn!(
        event_type = event_type,
        account_id = account_id,
        "SECURITY: {}",
        message
    );
}
