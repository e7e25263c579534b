//! Managed Groups API Server
//!
//! # Usage
//!
//! ```bash
//! # Start with default settings (0.0.0.0:8080) and no seed data
//! cargo run --bin managed-groups-server
//!
//! # Seed auth methods, groups, scopes and grants from a JSON file
//! cargo run --bin managed-groups-server -- --config bootstrap.json
//!
//! # Enable debug logging
//! RUST_LOG=debug cargo run --bin managed-groups-server
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Logging level (trace, debug, info, warn, error)
//! - `MANAGED_GROUPS_HOST`: Server host (default: 0.0.0.0)
//! - `MANAGED_GROUPS_PORT`: Server port (default: 8080)
//! - `MANAGED_GROUPS_CONFIG`: Bootstrap config path

use anyhow::{Context, Result};
use clap::Parser;
use cretoai_managed_groups::BootstrapConfig;
use managed_groups_api::{build_router, AppState};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "managed-groups-server",
    version,
    about = "REST API server for managed groups",
    long_about = None
)]
struct Args {
    /// Host to bind to
    #[arg(
        short = 'H',
        long,
        default_value = "0.0.0.0",
        env = "MANAGED_GROUPS_HOST"
    )]
    host: String,

    /// Port to listen on
    #[arg(short = 'p', long, default_value = "8080", env = "MANAGED_GROUPS_PORT")]
    port: u16,

    /// Bootstrap JSON with auth methods, managed groups, scopes and grants
    #[arg(short = 'c', long, env = "MANAGED_GROUPS_CONFIG")]
    config: Option<PathBuf>,

    /// Enable JSON logging format
    #[arg(long, env = "MANAGED_GROUPS_JSON_LOGS")]
    json_logs: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info", env = "RUST_LOG")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args);

    info!(version = env!("CARGO_PKG_VERSION"), "starting managed groups server");

    let bootstrap = match &args.config {
        Some(path) => BootstrapConfig::from_file(path)
            .with_context(|| format!("loading bootstrap config {}", path.display()))?,
        None => BootstrapConfig::default(),
    };
    info!(
        auth_methods = bootstrap.auth_methods.len(),
        managed_groups = bootstrap.managed_groups.len(),
        grants = bootstrap.grants.len(),
        "bootstrap config loaded"
    );

    let state = AppState::new(bootstrap.into_service());
    let app = build_router(state);

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}

/// Initialize tracing/logging subsystem
fn init_tracing(args: &Args) {
    let log_level = args.log_level.parse::<tracing::Level>().unwrap_or_else(|_| {
        eprintln!("Invalid log level '{}', using 'info'", args.log_level);
        tracing::Level::INFO
    });
    let http_level = if log_level >= tracing::Level::DEBUG {
        "debug"
    } else {
        "info"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "managed_groups_server={lvl},managed_groups_api={lvl},cretoai_managed_groups={lvl},tower_http={http},axum={http}",
            lvl = log_level,
            http = http_level,
        )
        .into()
    });

    if args.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .init();
    }
}
