//! Configuration Module
//!
//! Construction options for a cache store, loadable from environment variables.

use std::env;
use std::time::Duration;

use crate::error::{CacheError, Result};

/// Reserved `path` value for a transient in-memory store.
pub const IN_MEMORY_PATH: &str = ":memory:";

/// Default period between purge ticks (5 minutes).
pub const DEFAULT_PURGE_INTERVAL: Duration = Duration::from_millis(300_000);

/// Store configuration parameters.
///
/// `path` and `name` are required; [`StoreConfig::validate`] rejects a config
/// where either is empty before anything touches the disk.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Location of the SQLite file, or [`IN_MEMORY_PATH`]
    pub path: String,
    /// Table holding the entries, must be a plain SQL identifier
    pub name: String,
    /// TTL applied when a write omits one; None means entries never expire
    pub default_ttl: Option<Duration>,
    /// Period between background purge ticks
    pub purge_interval: Duration,
}

impl StoreConfig {
    /// Creates a config for the given backing store and table with default options.
    ///
    /// # Arguments
    /// * `path` - SQLite file path, or [`IN_MEMORY_PATH`] for a transient store
    /// * `name` - Table holding the entries
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            default_ttl: None,
            purge_interval: DEFAULT_PURGE_INTERVAL,
        }
    }

    /// Creates an in-memory config for the given table.
    pub fn in_memory(name: impl Into<String>) -> Self {
        Self::new(IN_MEMORY_PATH, name)
    }

    /// Sets the store-level default TTL.
    ///
    /// # Arguments
    /// * `ttl` - TTL applied when a write omits one; zero means "never expires"
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    /// Sets the period between purge ticks.
    pub fn with_purge_interval(mut self, interval: Duration) -> Self {
        self.purge_interval = interval;
        self
    }

    /// Creates a new StoreConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_PATH` - SQLite file path or `:memory:` (required)
    /// - `CACHE_TABLE` - Table name (required)
    /// - `CACHE_TTL_MS` - Default TTL in milliseconds (default: none)
    /// - `CACHE_PURGE_INTERVAL_MS` - Purge period in milliseconds (default: 300000)
    ///
    /// Missing required variables are left empty and reported by [`validate`](Self::validate).
    pub fn from_env() -> Self {
        Self {
            path: env::var("CACHE_PATH").unwrap_or_default(),
            name: env::var("CACHE_TABLE").unwrap_or_default(),
            default_ttl: env::var("CACHE_TTL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis),
            purge_interval: env::var("CACHE_PURGE_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_PURGE_INTERVAL),
        }
    }

    /// Returns true if this config points at a transient in-memory database.
    pub fn is_in_memory(&self) -> bool {
        self.path == IN_MEMORY_PATH
    }

    // == Validate ==
    /// Checks required fields and the table identifier.
    pub fn validate(&self) -> Result<()> {
        if self.path.is_empty() {
            return Err(CacheError::Configuration("Missing path".to_string()));
        }
        if self.name.is_empty() {
            return Err(CacheError::Configuration("Missing table name".to_string()));
        }
        if !is_identifier(&self.name) {
            return Err(CacheError::Configuration(format!(
                "Table name '{}' is not a valid identifier",
                self.name
            )));
        }
        if self.purge_interval.is_zero() {
            return Err(CacheError::Configuration(
                "Purge interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
