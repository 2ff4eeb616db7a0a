//! Cache storage trait with in-memory and SQLite implementations.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::traits::Invalidation;

/// A single cached response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedEntry {
  /// Serialized JSON payload
  pub data: Vec<u8>,
  /// When the entry was stored
  pub cached_at: DateTime<Utc>,
  /// Marked stale by a mutation; never served again
  pub invalidated: bool,
}

/// Trait for cache storage backends.
pub trait CacheStorage: Send + Sync {
  /// Get the entry stored under `key`.
  fn get(&self, key: &str) -> Result<Option<CachedEntry>>;

  /// Store (or replace) a fresh entry.
  fn put(&self, key: &str, description: &str, data: &[u8]) -> Result<()>;

  /// Mark matching entries stale. Returns how many entries were touched.
  fn invalidate(&self, scope: &Invalidation) -> Result<usize>;

  /// Drop every entry.
  fn clear(&self) -> Result<()>;
}

impl<S: CacheStorage + ?Sized> CacheStorage for Box<S> {
  fn get(&self, key: &str) -> Result<Option<CachedEntry>> {
    (**self).get(key)
  }

  fn put(&self, key: &str, description: &str, data: &[u8]) -> Result<()> {
    (**self).put(key, description, data)
  }

  fn invalidate(&self, scope: &Invalidation) -> Result<usize> {
    (**self).invalidate(scope)
  }

  fn clear(&self) -> Result<()> {
    (**self).clear()
  }
}

/// Process-local storage. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStorage {
  entries: Mutex<HashMap<String, CachedEntry>>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }
}

impl CacheStorage for MemoryStorage {
  fn get(&self, key: &str) -> Result<Option<CachedEntry>> {
    let entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(entries.get(key).cloned())
  }

  fn put(&self, key: &str, _description: &str, data: &[u8]) -> Result<()> {
    let mut entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    entries.insert(
      key.to_string(),
      CachedEntry {
        data: data.to_vec(),
        cached_at: Utc::now(),
        invalidated: false,
      },
    );
    Ok(())
  }

  fn invalidate(&self, scope: &Invalidation) -> Result<usize> {
    let mut entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    let mut touched = 0;
    for (key, entry) in entries.iter_mut() {
      if scope.matches(key) {
        entry.invalidated = true;
        touched += 1;
      }
    }
    Ok(touched)
  }

  fn clear(&self) -> Result<()> {
    self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?
      .clear();
    Ok(())
  }
}

/// SQLite-based cache storage, persisted between runs for offline use.
///
/// One database file serves every server; rows are scoped to the API origin
/// the storage was opened for.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
  origin: String,
}

/// Bumped whenever the table layout changes; older tables are dropped.
const SCHEMA_VERSION: i64 = 2;

/// Schema for cache tables.
const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS query_cache (
    origin TEXT NOT NULL,
    cache_key TEXT NOT NULL,
    description TEXT NOT NULL,
    data BLOB NOT NULL,
    cached_at TEXT NOT NULL,
    invalidated INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (origin, cache_key)
);
"#;

impl SqliteStorage {
  /// Open the cache database at the default location.
  pub fn open_default(origin: &str) -> Result<Self> {
    Self::open(&Self::default_path()?, origin)
  }

  /// Open (or create) the cache database at `path`, scoped to `origin`.
  pub fn open(path: &Path, origin: &str) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    let version: i64 = conn
      .query_row("PRAGMA user_version", [], |row| row.get(0))
      .map_err(|e| eyre!("Failed to read cache schema version: {}", e))?;
    if version < SCHEMA_VERSION {
      // Rows written before origin scoping cannot be attributed to a server
      conn
        .execute_batch("DROP TABLE IF EXISTS query_cache;")
        .map_err(|e| eyre!("Failed to drop old cache table: {}", e))?;
    }

    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;
    conn
      .pragma_update(None, "user_version", SCHEMA_VERSION)
      .map_err(|e| eyre!("Failed to record cache schema version: {}", e))?;

    Ok(Self {
      conn: Mutex::new(conn),
      origin: origin.to_string(),
    })
  }

  /// Get the default database path.
  pub fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("m9s").join("cache.db"))
  }
}

impl CacheStorage for SqliteStorage {
  fn get(&self, key: &str) -> Result<Option<CachedEntry>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let row: Option<(Vec<u8>, String, bool)> = conn
      .query_row(
        "SELECT data, cached_at, invalidated FROM query_cache
         WHERE origin = ? AND cache_key = ?",
        params![self.origin, key],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read cache entry {}: {}", key, e))?;

    match row {
      Some((data, cached_at, invalidated)) => Ok(Some(CachedEntry {
        data,
        cached_at: parse_datetime(&cached_at)?,
        invalidated,
      })),
      None => Ok(None),
    }
  }

  fn put(&self, key: &str, description: &str, data: &[u8]) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO query_cache
           (origin, cache_key, description, data, cached_at, invalidated)
         VALUES (?, ?, ?, ?, ?, 0)",
        params![self.origin, key, description, data, Utc::now().to_rfc3339()],
      )
      .map_err(|e| eyre!("Failed to store cache entry {}: {}", key, e))?;

    Ok(())
  }

  fn invalidate(&self, scope: &Invalidation) -> Result<usize> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let touched = match scope {
      Invalidation::Key(key) => conn.execute(
        "UPDATE query_cache SET invalidated = 1 WHERE origin = ?1 AND cache_key = ?2",
        params![self.origin, key],
      ),
      Invalidation::Prefix(prefix) => conn.execute(
        "UPDATE query_cache SET invalidated = 1
         WHERE origin = ?1 AND substr(cache_key, 1, length(?2)) = ?2",
        params![self.origin, prefix],
      ),
    }
    .map_err(|e| eyre!("Failed to invalidate cache entries: {}", e))?;

    Ok(touched)
  }

  fn clear(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute("DELETE FROM query_cache WHERE origin = ?", params![self.origin])
      .map_err(|e| eyre!("Failed to clear cache: {}", e))?;

    Ok(())
  }
}

/// Parse a stored RFC 3339 timestamp.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
}
