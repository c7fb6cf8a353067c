//! SQLite TTL Cache - A disk-backed key-value cache
//!
//! Stores opaque encoded values in a SQLite table with per-entry expiry,
//! atomic batch operations and a background purge of expired rows.

pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

pub use cache::{CacheStore, StoreBuilder};
pub use config::StoreConfig;
pub use error::{CacheError, Result};
pub use tasks::{spawn_purge_task, PurgeScheduler};
