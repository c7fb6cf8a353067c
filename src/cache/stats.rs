//! Cache Statistics Module
//!
//! Tracks read hits and misses plus background purge activity.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Cache Stats ==
/// Point-in-time snapshot of store counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Reads that returned a live value
    pub hits: u64,
    /// Reads that found nothing live (absent or expired)
    pub misses: u64,
    /// Completed purge runs
    pub purge_runs: u64,
    /// Rows physically removed by purge runs
    pub purged_rows: u64,
    /// Purge ticks that failed and were skipped
    pub purge_failures: u64,
}

impl CacheStats {
    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// == Stats Recorder ==
/// Lock-free counters shared by the store and its purge task.
#[derive(Debug, Default)]
pub(crate) struct StatsRecorder {
    hits: AtomicU64,
    misses: AtomicU64,
    purge_runs: AtomicU64,
    purged_rows: AtomicU64,
    purge_failures: AtomicU64,
}

impl StatsRecorder {
    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_purge(&self, removed: usize) {
        self.purge_runs.fetch_add(1, Ordering::Relaxed);
        self.purged_rows.fetch_add(removed as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_purge_failure(&self) {
        self.purge_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            purge_runs: self.purge_runs.load(Ordering::Relaxed),
            purged_rows: self.purged_rows.load(Ordering::Relaxed),
            purge_failures: self.purge_failures.load(Ordering::Relaxed),
        }
    }
}
