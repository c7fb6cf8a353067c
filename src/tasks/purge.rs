//! Purge Task
//!
//! Background task that periodically deletes expired rows, independent of reads.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::cache::expiry::current_timestamp_ms;
use crate::cache::{run_blocking, SqliteEngine};
use crate::error::{CacheError, Result};

// == Purge Scheduler ==
/// Handle to a running purge task.
///
/// Dropping the handle also stops the task.
#[derive(Debug)]
pub struct PurgeScheduler {
    handle: JoinHandle<()>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl PurgeScheduler {
    /// Signals the task to stop and waits for it to finish.
    pub async fn stop(mut self) -> Result<()> {
        if let Some(shutdown) = self.shutdown.take() {
            // The task may already have exited on its own
            let _ = shutdown.send(());
        }
        match (&mut self.handle).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_cancelled() => Ok(()),
            Err(e) => Err(CacheError::Internal(format!("Purge task failed: {e}"))),
        }
    }

    /// Aborts the task without waiting.
    pub fn abort(&self) {
        self.handle.abort();
    }

    /// Returns true once the task has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Spawns a background task that deletes expired rows every `interval`.
///
/// The task only holds a weak reference to the engine: it exits on its own
/// once the engine is dropped. A failed tick is logged and skipped; the
/// schedule continues.
///
/// # Arguments
/// * `engine` - Weak reference to the engine whose table is purged
/// * `interval` - Period between purge ticks; the first tick fires after one period
///
/// # Example
/// ```ignore
/// let engine = Arc::new(SqliteEngine::open(&config)?);
/// let purger = spawn_purge_task(Arc::downgrade(&engine), Duration::from_secs(300));
/// // Later, during shutdown:
/// purger.stop().await?;
/// ```
pub fn spawn_purge_task(engine: Weak<SqliteEngine>, interval: Duration) -> PurgeScheduler {
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

    let handle = tokio::spawn(async move {
        info!("Starting purge task with interval of {:?}", interval);

        let mut ticker = interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    info!("Purge task stopped");
                    break;
                }
                _ = ticker.tick() => {}
            }

            let Some(engine) = engine.upgrade() else {
                debug!("Cache engine dropped, purge task exiting");
                break;
            };
            purge_tick(&engine).await;
        }
    });

    PurgeScheduler {
        handle,
        shutdown: Some(shutdown_tx),
    }
}

async fn purge_tick(engine: &Arc<SqliteEngine>) {
    let now = current_timestamp_ms();
    match run_blocking(engine, move |e| e.purge(now)).await {
        Ok(removed) if removed > 0 => {
            info!("Purge: removed {} expired entries from '{}'", removed, engine.table());
        }
        Ok(_) => {
            debug!("Purge: no expired entries in '{}'", engine.table());
        }
        Err(e) => {
            engine.stats().record_purge_failure();
            warn!("Purge of '{}' failed, skipping tick: {}", engine.table(), e);
        }
    }
}
