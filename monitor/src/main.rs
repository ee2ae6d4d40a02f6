//! dockwatchd - periodic container sweeps
//!
//! Connects to the container engine and runs the configured exec and inspect
//! sweeps, writing their output to one shared stdout writer until SIGINT or
//! SIGTERM.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use dockwatch::config::AppConfig;
use dockwatch::engine::DockerEngine;
use dockwatch::logging::init_logging;
use dockwatch::monitor::LineSink;
use dockwatch::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;

    // Initialize logging
    init_logging(&config.log_level)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting dockwatchd");

    if config.metrics.enabled {
        dockwatch::metrics::init_metrics(&config.metrics.listen)?;
        info!(listen = %config.metrics.listen, "Prometheus metrics initialized");
    }

    let engine = DockerEngine::connect(&config.docker).context("Failed to connect to Docker")?;
    match engine.version().await {
        Ok(version) => info!(docker_version = %version, "Docker engine reachable"),
        Err(e) => warn!(error = %e, "Docker engine not reachable yet, sweeps will keep retrying"),
    }

    let state = Arc::new(AppState::new(config, Arc::new(engine)));
    let token = CancellationToken::new();
    let (sink, writer) = LineSink::spawn(tokio::io::stdout());
    let mut sweeps = JoinSet::new();

    if state.config.sweep.exec_enabled {
        let state = state.clone();
        let token = token.clone();
        let mut sink = sink.clone();
        sweeps.spawn(async move {
            let command = state.config.sweep.exec_command.clone();
            state.monitor.run_exec_sweep(&mut sink, token, &command).await;
        });
    }

    if state.config.sweep.inspect_enabled {
        let state = state.clone();
        let token = token.clone();
        let mut sink = sink.clone();
        sweeps.spawn(async move {
            state.monitor.run_inspect_sweep(&mut sink, token).await;
        });
    }

    // The writer task ends once the sweeps drop their clones
    drop(sink);

    if sweeps.is_empty() {
        warn!("No sweeps enabled, nothing to do");
        return Ok(());
    }

    shutdown_signal().await;
    info!("Shutting down, waiting for in-flight sweeps to finish...");
    token.cancel();

    while let Some(result) = sweeps.join_next().await {
        if let Err(e) = result {
            warn!(error = %e, "Sweep task failed");
        }
    }

    if let Err(e) = writer.await {
        warn!(error = %e, "Sweep output writer failed");
    }

    info!("dockwatchd stopped");
    Ok(())
}

/// Handle shutdown signals gracefully
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
