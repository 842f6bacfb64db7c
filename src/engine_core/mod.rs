//! Engine core — in-memory aggregation of the profiling event stream.
//!
//! # Architecture
//!
//! ```text
//! Collector events → ProfilerEngine (single lock)
//!     ↓
//! Aggregator (call graphs, inclusive time, allocation counters)
//!     ↓ on threshold / interval / GC event
//! FlushBatch → StorageBackend (one transaction per flush)
//!     ↓ on request
//! Snapshot branch-copy / clear of the live rows
//! ```

pub mod aggregator;
pub mod call_graph;
pub mod engine;
pub mod types;

pub use aggregator::{AggregateRows, Aggregator};
pub use call_graph::{AllocCounters, AllocData, CallGraph, SampleTotals};
pub use engine::{
    EngineError, ProfilerEngine, CLASS_CACHE_CAPACITY, FLUSH_INTERVAL, FUNCTION_CACHE_CAPACITY,
    SAMPLE_FLUSH_THRESHOLD,
};
pub use types::{
    AllocRow, CallRow, ClassInfo, CounterInfo, FunctionInfo, Sample, SampleRow, SnapshotRecord,
    ThreadInfo, SENTINEL_FUNCTION, SNAPSHOT_LIVE,
};
