//! Authentication server for onepolicy.
//!
//! Serves account registration, login, token refresh and password reset over
//! HTTP, backed by PostgreSQL.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Error};
use onepolicy::{AccountStore, AuthManager, Database, PgAccountStore};
use op_server::{api, config::ServerConfig, logging, metrics};
use pico_args::Arguments;
use tracing::info;

const HELP: &str = "\
Run the onepolicy authentication server

USAGE:
  op_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8080]
  --db-url     URL         Database connection string  [default: env DATABASE_URL or postgres://postgres@localhost/onepolicy]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND                      Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL                     PostgreSQL connection string
  JWT_SECRET                       JWT signing secret (required)
  JWT_ACCESS_TOKEN_EXPIRY_MINUTES  Access token lifetime [default: 15]
  JWT_REFRESH_TOKEN_EXPIRY_DAYS    Refresh token lifetime [default: 7]
  PASSWORD_MIN_LENGTH              Minimum password length [default: 8]
  RESET_TOKEN_EXPIRY_MINUTES       Reset token lifetime [default: 60]
  PASSWORD_PEPPER                  Password hashing pepper
  EXPOSE_RESET_TOKEN               Return reset tokens in responses (development only)
  METRICS_BIND                     Prometheus listener address
  (See .env.example for all configuration options)
";

struct Args {
    bind: Option<SocketAddr>,
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        bind: pargs.opt_value_from_str("--bind")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
    };

    logging::init();

    let config = ServerConfig::from_env(args.bind, args.database_url)?;
    info!("Starting authentication server at {}", config.bind);

    if let Some(metrics_bind) = config.metrics_bind {
        metrics::init_metrics(metrics_bind).map_err(|e| anyhow::anyhow!(e))?;
        info!("Prometheus metrics available at http://{}/metrics", metrics_bind);
    }

    let db = Database::new(&config.database)
        .await
        .context("Failed to connect to database")?;
    db.migrate().await.context("Failed to run migrations")?;
    info!("Database ready");

    let store: Arc<dyn AccountStore> = Arc::new(
        PgAccountStore::new(db.pool().clone()).with_query_timeout(config.database.query_timeout()),
    );
    let auth_manager = Arc::new(AuthManager::new(store.clone(), &config.auth)?);

    if config.expose_reset_token {
        tracing::warn!("EXPOSE_RESET_TOKEN is enabled; reset tokens are returned to clients");
    }

    let state = api::AppState::new(auth_manager, store, config.expose_reset_token);
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down server...");
    db.close().await;

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
