//! sentinel-rpc
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌───────────────────────────────────────────────┐
//!   wallet           │                 SENTINEL RPC                  │
//!   ───── POST / ───▶│  http ──▶ gate::engine ──▶ decoder            │
//!                    │               │                               │
//!                    │               ├──▶ pending (staged txs)       │
//!   collaborator     │               ├──▶ intents (ip + minute)      │
//!   ─ POST /intents ▶│  http ──▶ intents                             │
//!                    │               ├──▶ evaluator ─────────────────┼──▶ risk service
//!                    │               └──▶ release ───────────────────┼──▶ upstream node
//!                    │                                               │
//!                    │  other methods ─▶ upstream client (verbatim) ─┼──▶ upstream node
//!                    └───────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use sentinel_rpc::config::loader::{load_config, load_from_env};
use sentinel_rpc::config::watcher::ConfigWatcher;
use sentinel_rpc::lifecycle::{wait_for_signal, Shutdown};
use sentinel_rpc::observability::{init_logging, init_metrics};
use sentinel_rpc::HttpServer;

#[derive(Parser)]
#[command(name = "sentinel-rpc", version)]
#[command(about = "JSON-RPC proxy that gates transactions on a risk verdict", long_about = None)]
struct Args {
    /// TOML configuration file; defaults plus environment when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reload the gate policy when the configuration file changes
    #[arg(short, long, requires = "config")]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => load_from_env()?,
    };

    init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "sentinel-rpc starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.rpc_url,
        upstream_key_set = !config.upstream.api_key.is_empty(),
        risk_api = %config.risk.api_url,
        gated_method = %config.gate.method,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr)?,
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    // Keep the watcher alive for the lifetime of the server.
    let (_watcher, config_updates) = match (&args.config, args.watch) {
        (Some(path), true) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        _ => (None, mpsc::unbounded_channel().1),
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config)?;
    let server_task = tokio::spawn(server.run(listener, config_updates, shutdown.subscribe()));

    wait_for_signal().await?;
    shutdown.trigger();
    server_task.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
