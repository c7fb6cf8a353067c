//! Error types for the cache store
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache store.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Required construction option missing or malformed
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Value rejected by the cacheability predicate, carries its textual form
    #[error("no cacheable value {0}")]
    NotCacheable(String),

    /// Underlying SQLite failure
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Encoding or decoding of a stored value failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal failure (poisoned lock, blocking task join)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache store.
pub type Result<T> = std::result::Result<T, CacheError>;
