// ABOUTME: Error types for storage backends and the versioned store facade.
// ABOUTME: StorageError covers backend failures; LosoError wraps them along with value decoding failures.

use thiserror::Error;

/// Errors a storage backend can report.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("storage lock poisoned")]
    Poisoned,

    #[error("backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StorageError {
    /// Wrap a backend-specific error.
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend(Box::new(err))
    }
}

/// Errors surfaced by the store facade.
#[derive(Debug, Error)]
pub enum LosoError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("json error for key {key:?}: {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("serialize error: {0}")]
    Serialize(#[from] serde_json::Error),
}
