//! Persistence gateway contract.
//!
//! The engine is written against this trait and a concrete backend is
//! injected at construction. Every method is one transaction scope with
//! commit-or-abort on every exit path; duplicate metadata inserts are
//! absorbed by the backend (insert-or-ignore) rather than surfaced as
//! errors.

use thiserror::Error;

use crate::engine_core::types::{
    AllocRow, CallRow, ClassInfo, CounterInfo, FunctionInfo, SampleRow, SnapshotRecord, ThreadInfo,
};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// The store's identity or file-format properties do not match this
    /// engine. Raised at open time, before any mutation.
    #[error("store format mismatch: {0}")]
    FormatMismatch(String),
}

/// Transaction isolation requested from the backend. Branch-copy and
/// clear operations require `Serializable`; everything else runs at the
/// backend default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Isolation {
    Default,
    Serializable,
}

/// Everything a flush commits in a single transaction: cached metadata
/// records plus the row deltas drained from the aggregator.
#[derive(Debug, Default)]
pub struct FlushBatch<'a> {
    pub functions: &'a [FunctionInfo],
    pub classes: &'a [ClassInfo],
    pub samples: &'a [SampleRow],
    pub calls: &'a [CallRow],
    pub allocations: &'a [AllocRow],
}

/// Outcome of a committed flush batch, for logging.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlushStats {
    pub functions_inserted: usize,
    pub classes_inserted: usize,
    /// Cached metadata records that turned out to already exist.
    pub duplicates_ignored: usize,
}

pub trait StorageBackend: Send {
    /// Commit one flush batch atomically: insert-or-ignore the metadata
    /// records, then add the sample/call/allocation deltas onto the live
    /// (snapshot 0) rows.
    fn commit_batch(&mut self, batch: &FlushBatch<'_>) -> Result<FlushStats, StorageError>;

    /// Insert or update a thread record. Direct write, own transaction.
    fn upsert_thread(&mut self, thread: &ThreadInfo) -> Result<(), StorageError>;

    /// Register a performance counter. Direct write, own transaction.
    fn insert_counter(&mut self, counter: &CounterInfo) -> Result<(), StorageError>;

    /// Record one observed counter value.
    fn insert_counter_value(
        &mut self,
        counter_id: i64,
        time: f64,
        value: f64,
    ) -> Result<(), StorageError>;

    /// Record one garbage-collection event.
    fn insert_gc_event(
        &mut self,
        generation: i64,
        function_id: i64,
        time: f64,
    ) -> Result<(), StorageError>;

    /// Branch-copy the live rows under a new snapshot id, serializably.
    /// Live rows are left untouched; failure leaves no partial snapshot.
    fn create_snapshot(&mut self, name: &str) -> Result<SnapshotRecord, StorageError>;

    /// Delete only the live (snapshot 0) rows, serializably. Named
    /// snapshots survive.
    fn clear_live(&mut self) -> Result<(), StorageError>;

    fn list_snapshots(&mut self) -> Result<Vec<SnapshotRecord>, StorageError>;

    fn write_property(&mut self, name: &str, value: &str) -> Result<(), StorageError>;

    fn get_property(&mut self, name: &str) -> Result<Option<String>, StorageError>;

    /// Escape hatch for collaborators needing ad hoc reads: run a query and
    /// return each row as a JSON object keyed by column name.
    fn query_rows(&mut self, sql: &str) -> Result<Vec<serde_json::Value>, StorageError>;

    /// Run a query expected to produce a single numeric value.
    fn query_scalar(&mut self, sql: &str) -> Result<Option<f64>, StorageError>;

    /// Execute a statement with no result, returning affected rows.
    fn execute(&mut self, sql: &str) -> Result<usize, StorageError>;

    /// Backend name for logging.
    fn backend_name(&self) -> &'static str;
}
