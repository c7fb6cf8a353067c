//! Batch Operations
//!
//! Multi-key operations on [`CacheStore`], each executed as a single
//! SQLite transaction.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cache::codec::check_cacheable;
use crate::cache::engine::run_blocking;
use crate::cache::expiry::{compute_expiry, current_timestamp_ms, resolve_ttl};
use crate::cache::{CacheEntry, CacheStore};
use crate::error::Result;

impl<V> CacheStore<V>
where
    V: Serialize + DeserializeOwned + Send + 'static,
{
    // == MGet ==
    /// Fetches several keys in one read transaction.
    ///
    /// The result has one slot per input key, in input order; `None` marks a
    /// key that is missing or expired. Liveness is judged against a single
    /// timestamp taken at the start of the call.
    pub async fn mget<K: AsRef<str>>(&self, keys: &[K]) -> Result<Vec<Option<V>>> {
        self.mget_at(keys, current_timestamp_ms()).await
    }

    /// Fetches several keys, judging every slot live or expired at `now`.
    pub(crate) async fn mget_at<K: AsRef<str>>(
        &self,
        keys: &[K],
        now: i64,
    ) -> Result<Vec<Option<V>>> {
        let keys: Vec<String> = keys.iter().map(|k| k.as_ref().to_string()).collect();
        let rows = run_blocking(&self.engine, move |e| e.select_many(&keys)).await?;

        // One `now` for every slot, taken before the read: duplicate keys always agree
        rows.into_iter()
            .map(|row| self.decode_live(row, now))
            .collect()
    }

    // == MSet ==
    /// Stores several entries atomically with one shared TTL.
    ///
    /// Every value passes the cacheability gate and is encoded before the
    /// transaction starts; the first rejection fails the whole call with
    /// `NotCacheable` and nothing is written.
    pub async fn mset<K: AsRef<str>>(&self, entries: &[(K, V)], ttl: Option<Duration>) -> Result<()> {
        let created_at = current_timestamp_ms();
        let expired_at = compute_expiry(resolve_ttl(ttl, self.default_ttl), created_at);

        let mut rows = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            check_cacheable(&*self.gate, value)?;
            let val = self.encoder.encode(value)?;
            let key: &str = key.as_ref();
            rows.push(CacheEntry::new(key, val, created_at, expired_at));
        }

        run_blocking(&self.engine, move |e| e.upsert_many(&rows)).await
    }

    // == MDel ==
    /// Deletes several keys atomically. Absent keys are skipped.
    pub async fn mdel<K: AsRef<str>>(&self, keys: &[K]) -> Result<()> {
        let keys: Vec<String> = keys.iter().map(|k| k.as_ref().to_string()).collect();
        run_blocking(&self.engine, move |e| e.delete_many(&keys)).await?;
        Ok(())
    }
}
