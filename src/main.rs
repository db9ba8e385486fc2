//! Reverse proxy core control plane.
//!
//! Loads a configuration file, publishes it, runs active health checks and
//! optionally follows file changes until Ctrl+C.
//!
//! ```text
//!   config file ──▶ loader ──▶ ConfigCoordinator ──▶ snapshot (ArcSwap)
//!        │                          │                    │
//!        └── watcher (--watch) ─────┘                    ├──▶ Resolver (per request)
//!                                                        └──▶ HealthCheckEngine
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use reverse_proxy_core::config::{load_config, ConfigHooks, ConfigWatcher};
use reverse_proxy_core::health::{HealthCheckEngine, HyperProbeTransport};
use reverse_proxy_core::lifecycle::{wait_for_signal, Shutdown};
use reverse_proxy_core::observability::logging;
use reverse_proxy_core::runtime::ConfigCoordinator;

#[derive(Parser, Debug)]
#[command(name = "proxy-core", version, about = "Reverse proxy core control plane")]
struct Args {
    /// Path to the configuration file (.toml or .json)
    #[arg(short, long)]
    config: PathBuf,

    /// Reload the configuration when the file changes
    #[arg(short, long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = load_config(&args.config)?;
    logging::init(&config.observability)?;

    tracing::info!(
        path = ?args.config,
        routes = config.routes.len(),
        clusters = config.clusters.len(),
        "Configuration loaded"
    );

    let coordinator = Arc::new(ConfigCoordinator::new(ConfigHooks::new()));
    let generation = coordinator.apply(config)?;
    tracing::info!(generation, "proxy-core v0.1.0 started");

    let shutdown = Shutdown::new();

    let engine = HealthCheckEngine::new(&coordinator, Arc::new(HyperProbeTransport::new()));
    let engine_handle = tokio::spawn(engine.run(shutdown.subscribe()));

    // Dropping the notify handle stops the watch, so keep it for the whole run.
    let mut _watcher = None;
    let mut reload_handle = None;
    if args.watch {
        let (watcher, updates) = ConfigWatcher::new(&args.config);
        _watcher = Some(watcher.run()?);
        reload_handle = Some(tokio::spawn(
            coordinator.clone().reload_on_change(updates, shutdown.subscribe()),
        ));
    }

    wait_for_signal().await?;
    shutdown.trigger();

    if let Err(e) = engine_handle.await {
        tracing::error!(error = %e, "Health check engine task failed");
    }
    if let Some(handle) = reload_handle {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "Config reload task failed");
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
