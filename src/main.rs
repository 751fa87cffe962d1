//! Scored router server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ─────────────▶ http (axum, request ID, trace, timeout)
//!                        │
//!                        ▼
//!                    server Router ──▶ HostRoute ──▶ VirtualHost ──▶ Router ──▶ Route ──▶ Handler
//!                        │                                                     (Responder,
//!                        └──▶ default host                                      Redirector)
//!
//!     config file ──▶ ConfigWatcher ──▶ new route tree ──▶ atomic swap
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use scored_router::config::{load_config, AppConfig, ConfigWatcher};
use scored_router::http::HttpServer;
use scored_router::lifecycle::{signals, Shutdown};
use scored_router::observability::{logging, metrics};

#[derive(Debug, Parser)]
#[command(name = "scored-router", version, about = "URI-template router serving configured routes")]
struct Cli {
    /// TOML configuration file. Watched for changes.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };

    logging::init(&config.observability);
    tracing::info!("scored-router v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        routing_mode = %config.router.routing_mode,
        required_score = config.router.required_score,
        hosts = config.hosts.len(),
        routes = config.routes.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    // The watcher stops when dropped, so keep it until the server returns.
    let (_watcher, config_updates) = match &cli.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        None => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    let server = HttpServer::new(config)?;
    server
        .run(listener, config_updates, shutdown.subscribe())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
