//! Event and metadata record types delivered by the instrumented process.
//!
//! Metadata records (functions, classes, threads, counters) are created once
//! per distinct entity and written through the engine's caches. A `Sample` is
//! transient input: only its aggregated effect is ever persisted.

use serde::{Deserialize, Serialize};

/// Reserved function id marking "outside any function". Used as the synthetic
/// parent of the outermost frame and the synthetic child of the innermost
/// frame of every processed sample.
pub const SENTINEL_FUNCTION: i64 = 0;

/// Snapshot id of the mutable, currently-accumulating live view.
pub const SNAPSHOT_LIVE: i64 = 0;

/// Descriptive metadata for a profiled function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionInfo {
    pub id: i64,
    pub class_id: i64,
    pub is_native: bool,
    pub name: String,
    pub signature: String,
}

/// Descriptive metadata for a profiled class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassInfo {
    pub id: i64,
    pub name: String,
}

/// Liveness and name of a target-process thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadInfo {
    pub id: i64,
    pub is_alive: bool,
    pub name: String,
}

/// Identity of a performance counter exported by the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterInfo {
    pub id: i64,
    pub name: String,
}

/// One stack snapshot: the thread it was captured on, the call stack ordered
/// outer (caller) to inner (callee), and a time weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub thread_id: i64,
    pub functions: Vec<i64>,
    pub time: f64,
}

/// A named, timestamped snapshot row. Id 0 is the always-present "Current"
/// live view created at store initialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub id: i64,
    pub name: String,
    pub timestamp: i64,
}

/// Inclusive-time row drained from the aggregator on flush.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRow {
    pub thread_id: i64,
    pub function_id: i64,
    pub time: f64,
}

/// Call-graph edge row drained from the aggregator on flush.
#[derive(Debug, Clone, PartialEq)]
pub struct CallRow {
    pub thread_id: i64,
    pub parent_id: i64,
    pub child_id: i64,
    pub time: f64,
}

/// Allocation-counter row drained from the aggregator on flush.
#[derive(Debug, Clone, PartialEq)]
pub struct AllocRow {
    pub class_id: i64,
    pub function_id: i64,
    pub count: u64,
    pub total_size: u64,
}
