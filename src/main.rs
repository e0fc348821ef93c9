//! API Gateway
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌───────────────────────────────────────────────────────┐
//!                      │                      API GATEWAY                       │
//!                      │                                                        │
//!   Client Request     │  ┌────────┐   ┌─────────┐   ┌─────────┐   ┌─────────┐  │
//!   ───────────────────┼─▶│  http  │──▶│ routing │──▶│ breaker │──▶│discovery│  │
//!                      │  │ server │   │  table  │   │ permit  │   │ resolve │  │
//!                      │  └────────┘   └─────────┘   └────┬────┘   └────┬────┘  │
//!                      │                                  │ open        │        │
//!                      │                                  ▼             ▼        │
//!   Client Response    │                            ┌──────────┐  ┌──────────┐   │
//!   ◀──────────────────┼────────────────────────────│ fallback │◀─│ forward  │◀──┼── Upstream
//!                      │                            └──────────┘  └──────────┘   │
//!                      │                                                        │
//!                      │  config (hot reload) · observability · admin · lifecycle│
//!                      └───────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use api_gateway::config::{load_config, watcher::ConfigWatcher, GatewayConfig};
use api_gateway::lifecycle::signals::trigger_on_signal;
use api_gateway::lifecycle::StartupError;
use api_gateway::observability::{logging, metrics};
use api_gateway::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "api-gateway")]
#[command(about = "HTTP API gateway with service discovery and circuit breaking", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reload routes when the configuration file changes.
    #[arg(short, long, requires = "config")]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path).map_err(StartupError::Config)?,
        None => GatewayConfig::default(),
    };

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "api-gateway starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
        registry = ?config.discovery.registry,
        upstream_timeout_ms = config.timeouts.upstream_ms,
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

    // Keep the watcher handle alive for the lifetime of the server.
    let (config_updates, _watcher) = match (&cli.config, cli.watch) {
        (Some(path), true) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (updates, Some(watcher.run()?))
        }
        _ => {
            let (_tx, updates) = mpsc::unbounded_channel();
            (updates, None)
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: config.listener.bind_address.clone(),
            source,
        })?;

    let server = HttpServer::new(config)?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        trigger_on_signal(&shutdown).await;
    });

    server.run(listener, config_updates, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
