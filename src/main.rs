//! SQLite TTL Cache - purge daemon
//!
//! Opens the cache table described by the environment and keeps its purge
//! task running until shutdown, so expired rows are reclaimed even while no
//! application process has the store open.

use anyhow::Context;
use serde_json::Value;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sqlite_ttl_cache::{CacheStore, StoreConfig};

/// Main entry point for the purge daemon.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the store, which starts the background purge task
/// 4. Wait for SIGINT/SIGTERM, then stop the purge task gracefully
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sqlite_ttl_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting SQLite TTL cache purge daemon");

    let config = StoreConfig::from_env();
    info!(
        "Configuration loaded: path={}, table={}, default_ttl={:?}, purge_interval={:?}",
        config.path, config.name, config.default_ttl, config.purge_interval
    );

    let store: CacheStore<Value> = CacheStore::open(config)
        .await
        .context("failed to open cache store")?;
    info!("Store opened with {} rows", store.len().await?);

    shutdown_signal().await;

    store.stop_purge().await?;
    let stats = store.stats();
    info!(
        "Shutdown complete: {} purge runs removed {} rows ({} failed)",
        stats.purge_runs, stats.purged_rows, stats.purge_failures
    );
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
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
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
