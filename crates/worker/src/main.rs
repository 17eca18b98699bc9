// Calcflow worker binary

use std::sync::Arc;

use anyhow::{Context, Result};
use calcflow_core::telemetry::{init_telemetry, TelemetryConfig};
use calcflow_core::ArithmeticEvaluator;
use calcflow_worker::{HttpTaskSource, WorkerConfig, WorkerPool};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    init_telemetry(TelemetryConfig::from_env("calcflow-worker"));

    let config = WorkerConfig::from_env();
    info!(
        orchestrator_url = %config.orchestrator_url,
        worker_id = %config.pool.worker_id,
        "calcflow worker starting..."
    );

    let source = HttpTaskSource::new(&config.orchestrator_url, config.request_timeout)
        .context("Failed to build HTTP client")?;
    let pool = WorkerPool::new(config.pool, Arc::new(source), Arc::new(ArithmeticEvaluator));
    pool.start().context("Failed to start worker pool")?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;
    info!("Received shutdown signal");

    pool.shutdown().await.context("Worker pool shutdown failed")?;
    info!("calcflow worker stopped");
    Ok(())
}
