//! Storage core — the persistence gateway and its SQLite backend.

pub mod backend;
pub mod sqlite;

pub use backend::{FlushBatch, FlushStats, Isolation, StorageBackend, StorageError};
pub use sqlite::{SqliteBackend, APPLICATION, FILE_VERSION};
