//! Cache Store Module
//!
//! Async key-value facade over the SQLite engine: expiry-aware reads,
//! gated writes, and an owned background purge task.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::info;

use crate::cache::codec::{check_cacheable, CacheabilityPredicate, Encoder, JsonEncoder, NotNull};
use crate::cache::engine::{run_blocking, SqliteEngine};
use crate::cache::expiry::{compute_expiry, current_timestamp_ms, resolve_ttl, NEVER_EXPIRES};
use crate::cache::{CacheEntry, CacheStats};
use crate::config::StoreConfig;
use crate::error::{CacheError, Result};
use crate::tasks::{spawn_purge_task, PurgeScheduler};

/// `ttl()` result for a key with no row.
pub const TTL_MISSING: i64 = -2;

/// `ttl()` result for a key that never expires.
pub const TTL_NEVER: i64 = NEVER_EXPIRES;

// == Cache Store ==
/// Disk-backed cache of `V` values with per-entry TTL.
///
/// Reads treat expired rows as absent without deleting them; a background
/// purge task removes them physically every `purge_interval`.
pub struct CacheStore<V> {
    pub(crate) engine: Arc<SqliteEngine>,
    pub(crate) encoder: Box<dyn Encoder<V>>,
    pub(crate) gate: Box<dyn CacheabilityPredicate<V>>,
    pub(crate) default_ttl: Option<Duration>,
    purger: Mutex<Option<PurgeScheduler>>,
    _value: PhantomData<fn() -> V>,
}

impl<V> std::fmt::Debug for CacheStore<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("engine", &self.engine)
            .field("default_ttl", &self.default_ttl)
            .finish_non_exhaustive()
    }
}

// == Store Builder ==
/// Builder for a [`CacheStore`] with a custom encoder or cacheability gate.
pub struct StoreBuilder<V> {
    config: StoreConfig,
    encoder: Box<dyn Encoder<V>>,
    gate: Box<dyn CacheabilityPredicate<V>>,
}

impl<V> StoreBuilder<V>
where
    V: Serialize + DeserializeOwned + Send + 'static,
{
    fn new(config: StoreConfig) -> Self {
        Self {
            config,
            encoder: Box::new(JsonEncoder),
            gate: Box::new(NotNull),
        }
    }

    /// Replaces the default JSON encoder.
    pub fn encoder(mut self, encoder: impl Encoder<V> + 'static) -> Self {
        self.encoder = Box::new(encoder);
        self
    }

    /// Replaces the default not-null cacheability gate.
    pub fn cacheable(mut self, gate: impl CacheabilityPredicate<V> + 'static) -> Self {
        self.gate = Box::new(gate);
        self
    }

    /// Opens the backing store and starts the purge task.
    ///
    /// An invalid config fails with `Configuration` before anything is opened.
    /// Must be called from within a tokio runtime.
    pub async fn open(self) -> Result<CacheStore<V>> {
        let config = self.config.clone();
        let engine = tokio::task::spawn_blocking(move || SqliteEngine::open(&config))
            .await
            .map_err(|e| CacheError::Internal(format!("Task join error: {e}")))??;
        let engine = Arc::new(engine);

        let purger = spawn_purge_task(Arc::downgrade(&engine), self.config.purge_interval);

        info!(
            "Cache store ready: table='{}', default_ttl={:?}, purge_interval={:?}",
            self.config.name, self.config.default_ttl, self.config.purge_interval
        );

        Ok(CacheStore {
            engine,
            encoder: self.encoder,
            gate: self.gate,
            default_ttl: self.config.default_ttl,
            purger: Mutex::new(Some(purger)),
            _value: PhantomData,
        })
    }
}

impl<V> CacheStore<V>
where
    V: Serialize + DeserializeOwned + Send + 'static,
{
    // == Constructor ==
    /// Opens a store with the JSON encoder and the not-null gate.
    pub async fn open(config: StoreConfig) -> Result<Self> {
        StoreBuilder::new(config).open().await
    }

    /// Starts building a store with custom capabilities.
    pub fn builder(config: StoreConfig) -> StoreBuilder<V> {
        StoreBuilder::new(config)
    }

    // == Get ==
    /// Returns the value if the key exists and is live.
    ///
    /// Expired rows are reported absent but left in place for the purge task.
    pub async fn get(&self, key: &str) -> Result<Option<V>> {
        let now = current_timestamp_ms();
        let key = key.to_string();
        let row = run_blocking(&self.engine, move |e| e.select(&key)).await?;
        self.decode_live(row, now)
    }

    /// Returns the stored value regardless of expiry.
    ///
    /// Diagnostic hook for observing physical deletion by the purge task.
    pub async fn get_raw(&self, key: &str) -> Result<Option<V>> {
        let key = key.to_string();
        let row = run_blocking(&self.engine, move |e| e.select(&key)).await?;
        row.map(|row| self.encoder.decode(&row.val)).transpose()
    }

    // == TTL ==
    /// Remaining lifetime in milliseconds.
    ///
    /// Returns [`TTL_MISSING`] when no row exists and [`TTL_NEVER`] when the
    /// entry never expires. Negative for expired rows not yet purged.
    pub async fn ttl(&self, key: &str) -> Result<i64> {
        let key = key.to_string();
        let row = run_blocking(&self.engine, move |e| e.select(&key)).await?;
        Ok(match row {
            None => TTL_MISSING,
            Some(row) if row.never_expires() => TTL_NEVER,
            Some(row) => row.expired_at - current_timestamp_ms(),
        })
    }

    // == Set ==
    /// Stores a value, replacing any existing row for the key.
    ///
    /// Fails with `NotCacheable` and writes nothing if the gate rejects the value.
    ///
    /// # Arguments
    /// * `key` - The key to store
    /// * `value` - The value to store, checked against the cacheability gate
    /// * `ttl` - Optional TTL (uses the store default if None; zero never expires)
    pub async fn set(&self, key: &str, value: &V, ttl: Option<Duration>) -> Result<()> {
        check_cacheable(&*self.gate, value)?;
        let val = self.encoder.encode(value)?;

        let created_at = current_timestamp_ms();
        let expired_at = compute_expiry(resolve_ttl(ttl, self.default_ttl), created_at);
        let entry = CacheEntry::new(key, val, created_at, expired_at);

        run_blocking(&self.engine, move |e| e.upsert(&entry)).await
    }

    // == Delete ==
    /// Deletes a key. Deleting an absent key is not an error.
    pub async fn del(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        run_blocking(&self.engine, move |e| e.delete(&key)).await?;
        Ok(())
    }

    // == Keys ==
    /// Lists keys matching a glob pattern (`*` matches any run), all keys when None.
    ///
    /// Matches physical rows, so expired keys not yet purged are included.
    pub async fn keys(&self, pattern: Option<&str>) -> Result<Vec<String>> {
        let pattern = pattern.map(str::to_string);
        run_blocking(&self.engine, move |e| e.keys(pattern.as_deref())).await
    }

    // == Reset ==
    /// Deletes every entry.
    pub async fn reset(&self) -> Result<()> {
        run_blocking(&self.engine, |e| e.reset()).await?;
        Ok(())
    }

    // == Diagnostics ==

    /// Number of physical rows, including expired rows not yet purged.
    pub async fn len(&self) -> Result<usize> {
        run_blocking(&self.engine, |e| e.count()).await
    }

    /// Returns true if the table holds no rows at all.
    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Returns true if a row for the key physically exists, live or not.
    pub async fn contains_row(&self, key: &str) -> Result<bool> {
        let key = key.to_string();
        let row = run_blocking(&self.engine, move |e| e.select(&key)).await?;
        Ok(row.is_some())
    }

    /// Runs one purge immediately. Returns the number of rows removed.
    pub async fn purge_expired(&self) -> Result<usize> {
        let now = current_timestamp_ms();
        run_blocking(&self.engine, move |e| e.purge(now)).await
    }

    /// Returns current store statistics.
    pub fn stats(&self) -> CacheStats {
        self.engine.stats().snapshot()
    }

    /// Name of the backing table.
    pub fn name(&self) -> &str {
        self.engine.table()
    }

    /// Stops the background purge task and waits for it to exit. Idempotent.
    pub async fn stop_purge(&self) -> Result<()> {
        let purger = self.purger.lock().await.take();
        match purger {
            Some(purger) => purger.stop().await,
            None => Ok(()),
        }
    }

    /// Decodes a row if it is live at `now`, recording a hit or a miss.
    pub(crate) fn decode_live(&self, row: Option<CacheEntry>, now: i64) -> Result<Option<V>> {
        match row {
            Some(row) if row.is_live(now) => {
                self.engine.stats().record_hit();
                self.encoder.decode(&row.val).map(Some)
            }
            _ => {
                self.engine.stats().record_miss();
                Ok(None)
            }
        }
    }
}

impl<V> Drop for CacheStore<V> {
    fn drop(&mut self) {
        if let Some(purger) = self.purger.get_mut().take() {
            purger.abort();
        }
    }
}
