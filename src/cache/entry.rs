//! Cache Entry Module
//!
//! Defines the persisted row shape and the table schema it lives in.

use rusqlite::Row;

use crate::cache::expiry::{is_live, NEVER_EXPIRES};

// == Cache Entry ==
/// One row of the cache table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Primary key
    pub key: String,
    /// Encoded value, opaque to the engine
    pub val: String,
    /// Write timestamp (Unix milliseconds)
    pub created_at: i64,
    /// Expiration timestamp (Unix milliseconds), or [`NEVER_EXPIRES`]
    pub expired_at: i64,
}

impl CacheEntry {
    /// Builds a row from an already encoded value and precomputed timestamps.
    pub fn new(key: impl Into<String>, val: impl Into<String>, created_at: i64, expired_at: i64) -> Self {
        Self {
            key: key.into(),
            val: val.into(),
            created_at,
            expired_at,
        }
    }

    /// Returns true if the row is visible to ordinary readers at `now`.
    pub fn is_live(&self, now: i64) -> bool {
        is_live(self.expired_at, now)
    }

    /// Returns true if the row carries the "never expires" sentinel.
    pub fn never_expires(&self) -> bool {
        self.expired_at == NEVER_EXPIRES
    }

    /// Maps a `SELECT key, val, created_at, expired_at` row.
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            key: row.get(0)?,
            val: row.get(1)?,
            created_at: row.get(2)?,
            expired_at: row.get(3)?,
        })
    }
}

// == Schema ==
/// Idempotent DDL for the entry table and its expiry index.
///
/// The index name is derived from the table name so several tables can share
/// one database file.
pub(crate) fn schema_sql(table: &str) -> String {
    format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            key TEXT PRIMARY KEY,
            val TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            expired_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_{table}_expired_at ON {table}(expired_at);
        "#
    )
}
