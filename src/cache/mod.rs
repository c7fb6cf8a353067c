//! Cache Module
//!
//! Provides a SQLite-backed key-value store with per-entry TTL, atomic batch
//! operations and a pluggable value codec.

mod batch;
mod codec;
mod engine;
mod entry;
pub mod expiry;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use codec::{CacheabilityPredicate, Encoder, JsonEncoder, NotNull};
pub use engine::SqliteEngine;
pub use entry::CacheEntry;
pub use stats::CacheStats;
pub use store::{CacheStore, StoreBuilder, TTL_MISSING, TTL_NEVER};

pub(crate) use engine::run_blocking;
