// ABOUTME: Core library for loso, a versioned key-value facade over a string store.
// ABOUTME: Exposes the Loso facade, the Storage trait, the index record types, and the in-memory backend.

pub mod entry;
pub mod error;
pub mod facade;
pub mod index;
pub mod storage;

pub use entry::Entry;
pub use error::{LosoError, StorageError};
pub use facade::{Loso, LosoOptions};
pub use index::{CONFIG_NAME, INDEX_FORMAT_VERSION, IndexRecord, Metadata, UpdatedTime};
pub use storage::{MemoryStorage, Storage};
