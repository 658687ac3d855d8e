//! SQLite-backed key-value store.
//!
//! One `WITHOUT ROWID` table keyed by BLOB. SQLite orders BLOBs with memcmp,
//! so a range query on `[prefix, upper_bound)` is an ordered prefix scan.

use chime_core::error::{ChimeError, Result};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::Mutex;

use crate::kv::{KvStore, prefix_upper_bound};

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

fn storage(e: impl std::fmt::Display) -> ChimeError {
    ChimeError::Storage(e.to_string())
}

impl SqliteStore {
    /// Open or create the store database.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(|e| storage(format!("DB open: {e}")))?;
        let store = Self { conn: Mutex::new(conn) };
        store.migrate()?;
        tracing::debug!("💾 Store opened at {}", path.display());
        Ok(store)
    }

    /// Private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| storage(format!("DB open: {e}")))?;
        let store = Self { conn: Mutex::new(conn) };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().map_err(storage)?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS kv (
                key BLOB PRIMARY KEY,
                value BLOB NOT NULL
            ) WITHOUT ROWID;
            ",
        )
        .map_err(|e| storage(format!("Migration: {e}")))?;
        Ok(())
    }
}

impl KvStore for SqliteStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let conn = self.conn.lock().map_err(storage)?;
        conn.query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
            row.get::<_, Vec<u8>>(0)
        })
        .optional()
        .map_err(|e| storage(format!("Get: {e}")))
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let conn = self.conn.lock().map_err(storage)?;
        conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )
        .map_err(|e| storage(format!("Put: {e}")))?;
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        let conn = self.conn.lock().map_err(storage)?;
        conn.execute("DELETE FROM kv WHERE key = ?1", params![key])
            .map_err(|e| storage(format!("Delete: {e}")))?;
        Ok(())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let conn = self.conn.lock().map_err(storage)?;
        let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<(Vec<u8>, Vec<u8>)> {
            Ok((row.get(0)?, row.get(1)?))
        };
        let rows = match prefix_upper_bound(prefix) {
            Some(end) => {
                let mut stmt = conn
                    .prepare("SELECT key, value FROM kv WHERE key >= ?1 AND key < ?2 ORDER BY key")
                    .map_err(|e| storage(format!("Scan: {e}")))?;
                stmt.query_map(params![prefix, end], map_row)
                    .map_err(|e| storage(format!("Scan: {e}")))?
                    .collect::<rusqlite::Result<Vec<_>>>()
            }
            None => {
                let mut stmt = conn
                    .prepare("SELECT key, value FROM kv WHERE key >= ?1 ORDER BY key")
                    .map_err(|e| storage(format!("Scan: {e}")))?;
                stmt.query_map(params![prefix], map_row)
                    .map_err(|e| storage(format!("Scan: {e}")))?
                    .collect::<rusqlite::Result<Vec<_>>>()
            }
        };
        rows.map_err(|e| storage(format!("Scan: {e}")))
    }
}
