// ABOUTME: Durable storage backends for loso.
// ABOUTME: Provides an atomic-write JSON file store and a SQLite store, both implementing Storage.

pub mod file;
pub mod sqlite;

pub use file::{FileStorage, FileStorageError};
pub use sqlite::{SqliteError, SqliteStorage};
