//! Shipscreen daemon - Main Entry Point

mod app;
mod config;
mod telemetry;

use anyhow::Result;
use app::App;
use config::DaemonConfig;
use shipscreen_core::application::shutdown_channel;
use std::time::Duration;
use tracing::{error, info};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = telemetry::init_logging()?;

    info!("Shipscreen v{} starting...", VERSION);

    let config = DaemonConfig::load()?;
    let app = App::build(&config).await?;

    // Crash recovery before any worker pops
    info!("Running crash recovery...");
    match app.recovery.recover_orphaned_jobs().await {
        Ok(report) => info!(recovered_jobs = report.total(), "Crash recovery completed"),
        Err(e) => error!(error = ?e, "Crash recovery failed"),
    }

    let (rpc_addr, rpc_handle) = app
        .rpc
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("RPC server start failed: {}", e))?;

    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let mut tasks = Vec::new();

    info!(count = app.workers.len(), "Starting workers...");
    for (index, worker) in app.workers.into_iter().enumerate() {
        let token = shutdown_rx.clone();
        tasks.push(tokio::spawn(async move {
            if let Err(e) = worker.run(token).await {
                error!(worker = index, error = ?e, "Worker failed");
            }
        }));
    }

    let periodic = app.periodic;
    let token = shutdown_rx.clone();
    tasks.push(tokio::spawn(async move { periodic.run(token).await }));

    let maintenance = app.maintenance;
    tasks.push(tokio::spawn(async move { maintenance.run(shutdown_rx).await }));

    info!(rpc = %rpc_addr, "System ready. Press Ctrl+C to shutdown");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Exiting gracefully...");

    shutdown_tx.shutdown();
    rpc_handle
        .stop()
        .map_err(|e| anyhow::anyhow!("RPC server stop failed: {}", e))?;

    let drain = drain_tasks(tasks);
    if tokio::time::timeout(SHUTDOWN_GRACE, drain).await.is_err() {
        error!("Background tasks did not stop in time");
    }

    info!("Shutdown complete.");
    Ok(())
}

async fn drain_tasks(tasks: Vec<tokio::task::JoinHandle<()>>) {
    for task in tasks {
        let _ = task.await;
    }
}
