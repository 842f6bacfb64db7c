//! Profstore — in-process profiling telemetry aggregation engine.
//!
//! Receives stack samples, allocation events, GC events, counter values and
//! function/class/thread metadata from an instrumented process, folds them
//! into compact in-memory summaries, and periodically commits those
//! summaries to a durable store. Named, non-destructive snapshots branch
//! the accumulated live view at any point in time.
//!
//! The engine does not interpret symbols, render flame graphs, or decide
//! sampling rates — it aggregates whatever stream it is given.


pub mod config;
pub mod engine_core;
pub mod storage_core;

pub use config::{CollectorConfig, ConfigError, RuntimeConfig};
pub use engine_core::{
    ClassInfo, CounterInfo, EngineError, FunctionInfo, ProfilerEngine, Sample, SnapshotRecord,
    ThreadInfo, SENTINEL_FUNCTION, SNAPSHOT_LIVE,
};
pub use storage_core::{SqliteBackend, StorageBackend, StorageError};
