//! Storage Engine
//!
//! Synchronous CRUD over the entry table. Owns the single SQLite handle and
//! the fixed set of statements every store operation is built from.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::cache::entry::{schema_sql, CacheEntry};
use crate::cache::expiry::NEVER_EXPIRES;
use crate::cache::stats::StatsRecorder;
use crate::config::StoreConfig;
use crate::error::{CacheError, Result};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQL text for each operation, rendered once for the configured table.
///
/// Executed through `prepare_cached`, so each is compiled once per connection.
#[derive(Debug)]
struct Statements {
    select: String,
    keys: String,
    upsert: String,
    delete: String,
    reset: String,
    purge: String,
    count: String,
}

impl Statements {
    fn for_table(table: &str) -> Self {
        Self {
            select: format!(
                "SELECT key, val, created_at, expired_at FROM {table} WHERE key = ?1"
            ),
            keys: format!(r"SELECT key FROM {table} WHERE key LIKE ?1 ESCAPE '\' ORDER BY key"),
            upsert: format!(
                "INSERT OR REPLACE INTO {table} (key, val, created_at, expired_at) VALUES (?1, ?2, ?3, ?4)"
            ),
            delete: format!("DELETE FROM {table} WHERE key = ?1"),
            reset: format!("DELETE FROM {table}"),
            purge: format!(
                "DELETE FROM {table} WHERE expired_at != {NEVER_EXPIRES} AND expired_at < ?1"
            ),
            count: format!("SELECT COUNT(*) FROM {table}"),
        }
    }
}

// == Sqlite Engine ==
/// Entry table on a single SQLite connection.
///
/// Single-key operations are one statement each. Batch operations run inside
/// one explicit transaction and roll back as a unit on error.
pub struct SqliteEngine {
    conn: Mutex<Connection>,
    table: String,
    sql: Statements,
    stats: StatsRecorder,
}

impl std::fmt::Debug for SqliteEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteEngine")
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

impl SqliteEngine {
    // == Constructor ==
    /// Opens the backing store, switches it to WAL and creates the schema if absent.
    ///
    /// The config is validated first; nothing is opened for an invalid config.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        config.validate()?;

        let conn = if config.is_in_memory() {
            Connection::open_in_memory()?
        } else {
            Connection::open(Path::new(&config.path))?
        };
        conn.busy_timeout(BUSY_TIMEOUT)?;

        // In-memory databases report "memory" and keep it
        let journal_mode: String =
            conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        conn.execute_batch(&schema_sql(&config.name))?;
        debug!(
            "Schema ready for table '{}' (journal_mode={})",
            config.name, journal_mode
        );

        info!("Cache engine opened at {} (table '{}')", config.path, config.name);
        Ok(Self {
            conn: Mutex::new(conn),
            table: config.name.clone(),
            sql: Statements::for_table(&config.name),
            stats: StatsRecorder::default(),
        })
    }

    /// Name of the entry table.
    pub fn table(&self) -> &str {
        &self.table
    }

    pub(crate) fn stats(&self) -> &StatsRecorder {
        &self.stats
    }

    /// Lock the connection for use.
    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| CacheError::Internal("connection lock poisoned".to_string()))
    }

    // == Single-key Operations ==

    /// Fetches a row regardless of liveness.
    pub fn select(&self, key: &str) -> Result<Option<CacheEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(&self.sql.select)?;
        Ok(stmt.query_row(params![key], CacheEntry::from_row).optional()?)
    }

    /// Inserts or fully replaces the row for `entry.key`.
    pub fn upsert(&self, entry: &CacheEntry) -> Result<()> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(&self.sql.upsert)?;
        stmt.execute(params![entry.key, entry.val, entry.created_at, entry.expired_at])?;
        Ok(())
    }

    /// Deletes a row. Returns whether one existed.
    pub fn delete(&self, key: &str) -> Result<bool> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(&self.sql.delete)?;
        Ok(stmt.execute(params![key])? > 0)
    }

    /// Lists keys of physically present rows matching a glob pattern.
    pub fn keys(&self, pattern: Option<&str>) -> Result<Vec<String>> {
        let like = glob_to_like(pattern);
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(&self.sql.keys)?;
        let rows = stmt.query_map(params![like], |row| row.get::<_, String>(0))?;
        let mut keys = Vec::new();
        for key in rows {
            keys.push(key?);
        }
        Ok(keys)
    }

    /// Deletes every row. Returns the number removed.
    pub fn reset(&self) -> Result<usize> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(&self.sql.reset)?;
        Ok(stmt.execute([])?)
    }

    /// Deletes every expiring row with `expired_at < now`. Returns the number removed.
    pub fn purge(&self, now: i64) -> Result<usize> {
        let removed = {
            let conn = self.conn()?;
            let mut stmt = conn.prepare_cached(&self.sql.purge)?;
            stmt.execute(params![now])?
        };
        self.stats.record_purge(removed);
        Ok(removed)
    }

    /// Number of physically present rows, expired or not.
    pub fn count(&self) -> Result<usize> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(&self.sql.count)?;
        let count: i64 = stmt.query_row([], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Runs arbitrary SQL against the connection.
    #[cfg(test)]
    pub(crate) fn execute_raw(&self, sql: &str) -> Result<()> {
        self.conn()?.execute_batch(sql)?;
        Ok(())
    }

    // == Batch Operations ==

    /// Fetches several rows inside one read transaction, preserving input order.
    pub fn select_many<K: AsRef<str>>(&self, keys: &[K]) -> Result<Vec<Option<CacheEntry>>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut rows = Vec::with_capacity(keys.len());
        {
            let mut stmt = tx.prepare_cached(&self.sql.select)?;
            for key in keys {
                let key: &str = key.as_ref();
                rows.push(stmt.query_row(params![key], CacheEntry::from_row).optional()?);
            }
        }
        tx.commit()?;
        Ok(rows)
    }

    /// Upserts all rows atomically; on any failure none are written.
    pub fn upsert_many(&self, entries: &[CacheEntry]) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(&self.sql.upsert)?;
            for entry in entries {
                stmt.execute(params![entry.key, entry.val, entry.created_at, entry.expired_at])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Deletes all given keys atomically. Returns the number of rows removed.
    pub fn delete_many<K: AsRef<str>>(&self, keys: &[K]) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut removed = 0;
        {
            let mut stmt = tx.prepare_cached(&self.sql.delete)?;
            for key in keys {
                let key: &str = key.as_ref();
                removed += stmt.execute(params![key])?;
            }
        }
        tx.commit()?;
        Ok(removed)
    }
}

/// Runs an engine operation on the blocking pool.
pub(crate) async fn run_blocking<T, F>(engine: &Arc<SqliteEngine>, op: F) -> Result<T>
where
    F: FnOnce(&SqliteEngine) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let engine = Arc::clone(engine);
    tokio::task::spawn_blocking(move || op(&engine))
        .await
        .map_err(|e| CacheError::Internal(format!("Task join error: {e}")))?
}

/// Translates a glob pattern (`*` = any run) into a LIKE pattern.
///
/// LIKE metacharacters in the input are escaped so they match literally.
/// No pattern matches every key.
pub(crate) fn glob_to_like(pattern: Option<&str>) -> String {
    let Some(pattern) = pattern else {
        return "%".to_string();
    };
    let mut like = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        match c {
            '*' => like.push('%'),
            '%' | '_' | '\\' => {
                like.push('\\');
                like.push(c);
            }
            _ => like.push(c),
        }
    }
    like
}
