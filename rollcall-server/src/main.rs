//! rollcall-server - campus attendance and mark sheet service
//!
//! Startup order: tracing, arguments, configuration, database, router.

use anyhow::{Context, Result};
use clap::Parser;
use rollcall_common::api::load_shared_secret;
use rollcall_common::config::{ConfigOverrides, ServiceConfig};
use rollcall_common::db::init_database;
use rollcall_common::time::SystemClock;
use rollcall_server::{build_router, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "rollcall_server=info,rollcall_common=info,tower_http=info";

/// Command-line arguments for rollcall-server
#[derive(Parser, Debug)]
#[command(name = "rollcall-server")]
#[command(about = "Campus attendance and mark sheet service")]
#[command(version)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long, env = "ROLLCALL_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "ROLLCALL_PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(long, env = "ROLLCALL_HOST")]
    host: Option<String>,

    /// SQLite database file
    #[arg(short, long, env = "ROLLCALL_DATABASE")]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing; the config file may lower or raise the level later
    let rust_log_set = std::env::var_os("RUST_LOG").is_some();
    let (filter, filter_handle) = reload::Layer::new(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()),
    );
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting rollcall-server v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();

    let config = ServiceConfig::load(ConfigOverrides {
        config_path: args.config,
        database_path: args.database,
        host: args.host,
        port: args.port,
    })
    .context("Failed to load configuration")?;

    if !rust_log_set {
        let level = &config.logging.level;
        let directives = format!("rollcall_server={0},rollcall_common={0},tower_http={0}", level);
        filter_handle
            .reload(EnvFilter::new(directives))
            .context("Failed to apply configured log level")?;
    }

    info!("Database path: {}", config.database_path.display());
    let pool = init_database(&config.database_path)
        .await
        .context("Failed to initialize database")?;
    info!("✓ Database ready");

    let shared_secret = load_shared_secret(&pool)
        .await
        .context("Failed to load token signing secret")?;
    info!("✓ Loaded token signing secret");

    info!(
        "Campus geofence: ({}, {}) radius {} km; slots {}",
        config.campus.latitude,
        config.campus.longitude,
        config.campus.radius_km,
        config.slots.describe()
    );

    let bind_address = config.bind_address();
    let state = AppState::new(pool, shared_secret, config, Arc::new(SystemClock))
        .context("Failed to build application state")?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    info!("rollcall-server listening on http://{}", bind_address);
    info!("Health check: http://{}/api/health", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
