// Calcflow control plane: HTTP API, task queue and lease sweeper

use anyhow::{Context, Result};
use calcflow_control_plane::{
    auth::{AuthConfig, AuthState},
    build_app,
    storage::StorageBackend,
    ServerConfig,
};
use calcflow_core::telemetry::{init_telemetry, TelemetryConfig};
use calcflow_core::{spawn_lease_sweeper, Orchestrator};
use std::sync::Arc;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    init_telemetry(TelemetryConfig::from_env("calcflow-control-plane"));

    tracing::info!("calcflow control plane starting...");

    let config = ServerConfig::from_env();

    let db = StorageBackend::open(&config.db_path)
        .await
        .context("Failed to open user database")?;
    if config.uses_in_memory_db() {
        tracing::warn!("Using in-memory user storage; accounts are lost on restart");
    } else {
        tracing::info!(path = %config.db_path, "Connected to user database");
    }

    let auth_config = AuthConfig::from_env();
    tracing::info!(mode = auth_config.mode.as_str(), "Authentication configured");
    let auth_state = AuthState::new(auth_config, db);

    let orchestrator = Orchestrator::new(config.queue_config());
    tracing::info!(
        lease_secs = config.lease_duration.as_secs(),
        sweep_secs = config.lease_sweep_interval.as_secs(),
        "Task queue configured"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = spawn_lease_sweeper(
        Arc::clone(orchestrator.queue()),
        config.lease_sweep_interval,
        shutdown_rx,
    );

    if !config.api_prefix.is_empty() {
        tracing::info!(prefix = %config.api_prefix, "API prefix configured");
    }
    let app = build_app(&config, orchestrator, auth_state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    tracing::info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    let _ = shutdown_tx.send(true);
    if let Err(e) = sweeper.await {
        tracing::warn!("Lease sweeper did not stop cleanly: {}", e);
    }

    tracing::info!("calcflow control plane stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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

    tracing::info!("Shutdown signal received");
}
