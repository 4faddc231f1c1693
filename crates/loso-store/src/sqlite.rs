// ABOUTME: SQLite-backed Storage implementation holding entries in a single key/value table.
// ABOUTME: Provides upsert, delete, ordered enumeration, and count over the entries table.

use std::path::Path;

use loso_core::{Storage, StorageError};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;

/// Errors that can occur during SQLite storage operations.
#[derive(Debug, Error)]
pub enum SqliteError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl From<SqliteError> for StorageError {
    fn from(err: SqliteError) -> Self {
        StorageError::backend(err)
    }
}

/// A Storage backend over a SQLite database. Keys enumerate in sorted order.
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Open or create a SQLite store at the given path.
    pub fn open(path: &Path) -> Result<Self, SqliteError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        tracing::info!(path = %path.display(), "opened sqlite store");
        Self::init(conn)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, SqliteError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, SqliteError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS entries (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(Self { conn })
    }

    fn get(&self, key: &str) -> Result<Option<String>, SqliteError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM entries WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn upsert(&self, key: &str, value: &str) -> Result<(), SqliteError> {
        self.conn.execute(
            "INSERT INTO entries (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), SqliteError> {
        self.conn
            .execute("DELETE FROM entries WHERE key = ?1", params![key])?;
        Ok(())
    }

    fn delete_all(&self) -> Result<(), SqliteError> {
        self.conn.execute("DELETE FROM entries", [])?;
        Ok(())
    }

    fn key_at(&self, index: usize) -> Result<Option<String>, SqliteError> {
        let Ok(offset) = i64::try_from(index) else {
            return Ok(None);
        };
        let key = self
            .conn
            .query_row(
                "SELECT key FROM entries ORDER BY key LIMIT 1 OFFSET ?1",
                params![offset],
                |row| row.get(0),
            )
            .optional()?;
        Ok(key)
    }

    fn count(&self) -> Result<usize, SqliteError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

impl Storage for SqliteStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.get(key)?)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        Ok(self.upsert(key, value)?)
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        Ok(self.delete(key)?)
    }

    fn clear(&self) -> Result<(), StorageError> {
        Ok(self.delete_all()?)
    }

    fn key(&self, index: usize) -> Result<Option<String>, StorageError> {
        Ok(self.key_at(index)?)
    }

    fn len(&self) -> Result<usize, StorageError> {
        Ok(self.count()?)
    }
}
