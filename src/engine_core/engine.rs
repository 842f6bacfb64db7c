//! Engine facade: the single ingest surface for the instrumented process.
//!
//! One mutex serializes every mutation of aggregator state and every flush.
//! There is no background flush thread: whichever ingesting call crosses a
//! threshold pays for the flush synchronously. Aggregated counters are
//! commutative sums, so concurrent callers only move flush boundaries, never
//! final values.

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use thiserror::Error;

use super::aggregator::Aggregator;
use super::types::{ClassInfo, CounterInfo, FunctionInfo, Sample, SnapshotRecord, ThreadInfo};
use crate::storage_core::backend::{FlushBatch, StorageBackend, StorageError};

/// A flush fires once more than this many samples accumulate.
pub const SAMPLE_FLUSH_THRESHOLD: u64 = 2000;
/// Function metadata cache capacity; reaching it triggers a flush.
pub const FUNCTION_CACHE_CAPACITY: usize = 64;
/// Class metadata cache capacity; reaching it triggers a flush.
pub const CLASS_CACHE_CAPACITY: usize = 32;
/// Maximum age of unflushed data before the next ingest call flushes.
pub const FLUSH_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum EngineError {
    /// A sample arrived with no stack frames. Contract violation on the
    /// collector side; failing fast beats silently skewing the aggregates.
    #[error("sample contains no frames")]
    EmptySample,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

struct EngineInner<B: StorageBackend> {
    backend: B,
    aggregator: Aggregator,
    function_cache: Vec<FunctionInfo>,
    class_cache: Vec<ClassInfo>,
    last_flush: Instant,
}

impl<B: StorageBackend> EngineInner<B> {
    fn flush_due(&self) -> bool {
        self.last_flush.elapsed() > FLUSH_INTERVAL
    }

    fn flush(&mut self) -> Result<(), EngineError> {
        let rows = self.aggregator.collect_rows();
        let batch = FlushBatch {
            functions: &self.function_cache,
            classes: &self.class_cache,
            samples: &rows.samples,
            calls: &rows.calls,
            allocations: &rows.allocations,
        };
        let stats = self.backend.commit_batch(&batch)?;

        if stats.duplicates_ignored > 0 {
            log::debug!(
                "flush ignored {} duplicate metadata records",
                stats.duplicates_ignored
            );
        }
        log::debug!(
            "✅ flushed {} functions, {} classes, {} sample rows, {} call rows, {} allocation rows",
            stats.functions_inserted,
            stats.classes_inserted,
            rows.samples.len(),
            rows.calls.len(),
            rows.allocations.len(),
        );

        self.function_cache.clear();
        self.class_cache.clear();
        self.aggregator.reset();
        self.last_flush = Instant::now();
        Ok(())
    }
}

pub struct ProfilerEngine<B: StorageBackend> {
    inner: Mutex<EngineInner<B>>,
}

impl<B: StorageBackend> ProfilerEngine<B> {
    pub fn new(backend: B) -> Self {
        log::info!("🚀 profiler engine started on {} backend", backend.backend_name());
        Self {
            inner: Mutex::new(EngineInner {
                backend,
                aggregator: Aggregator::new(),
                function_cache: Vec::with_capacity(FUNCTION_CACHE_CAPACITY),
                class_cache: Vec::with_capacity(CLASS_CACHE_CAPACITY),
                last_flush: Instant::now(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, EngineInner<B>> {
        self.inner.lock().expect("engine lock poisoned")
    }

    /// Fold one stack sample into the live aggregates, flushing if the
    /// sample threshold is exceeded or a time-based flush is due.
    pub fn parse_sample(&self, sample: &Sample) -> Result<(), EngineError> {
        if sample.functions.is_empty() {
            return Err(EngineError::EmptySample);
        }

        let mut inner = self.lock();
        inner.aggregator.process_sample(sample);
        if inner.aggregator.sample_count() > SAMPLE_FLUSH_THRESHOLD || inner.flush_due() {
            inner.flush()?;
        }
        Ok(())
    }

    /// Register function metadata through the write cache.
    pub fn map_function(&self, function: FunctionInfo) -> Result<(), EngineError> {
        let mut inner = self.lock();
        inner.function_cache.push(function);
        if inner.function_cache.len() >= FUNCTION_CACHE_CAPACITY || inner.flush_due() {
            inner.flush()?;
        }
        Ok(())
    }

    /// Register class metadata through the write cache.
    pub fn map_class(&self, class: ClassInfo) -> Result<(), EngineError> {
        let mut inner = self.lock();
        inner.class_cache.push(class);
        if inner.class_cache.len() >= CLASS_CACHE_CAPACITY || inner.flush_due() {
            inner.flush()?;
        }
        Ok(())
    }

    /// Direct durable write of a thread's liveness and name.
    pub fn update_thread(&self, id: i64, is_alive: bool, name: &str) -> Result<(), EngineError> {
        let mut inner = self.lock();
        inner.backend.upsert_thread(&ThreadInfo {
            id,
            is_alive,
            name: name.to_string(),
        })?;
        Ok(())
    }

    /// Direct durable registration of a performance counter.
    pub fn map_counter(&self, counter: CounterInfo) -> Result<(), EngineError> {
        let mut inner = self.lock();
        inner.backend.insert_counter(&counter)?;
        Ok(())
    }

    /// Direct durable write of one counter observation.
    pub fn perf_counter(&self, counter_id: i64, time: f64, value: f64) -> Result<(), EngineError> {
        let mut inner = self.lock();
        inner.backend.insert_counter_value(counter_id, time, value)?;
        Ok(())
    }

    /// Record a GC event durably, then force a full flush: collections are
    /// natural batching boundaries.
    pub fn garbage_collection(
        &self,
        generation: i64,
        function_id: i64,
        time: f64,
    ) -> Result<(), EngineError> {
        let mut inner = self.lock();
        inner.backend.insert_gc_event(generation, function_id, time)?;
        inner.flush()
    }

    /// Accumulate one allocation event in memory. Committed durably with the
    /// next flush alongside the sample and call tables.
    pub fn object_allocated(
        &self,
        class_id: i64,
        size: u64,
        function_id: i64,
        _time: f64,
    ) -> Result<(), EngineError> {
        let mut inner = self.lock();
        inner.aggregator.record_allocation(class_id, size, function_id);
        Ok(())
    }

    /// Commit cached metadata and aggregated deltas now.
    pub fn flush(&self) -> Result<(), EngineError> {
        self.lock().flush()
    }

    /// Branch the live data into a named snapshot. Flushes first so nothing
    /// cached is excluded; the live view is left untouched.
    pub fn snapshot(&self, name: &str) -> Result<SnapshotRecord, EngineError> {
        let mut inner = self.lock();
        inner.flush()?;
        let record = inner.backend.create_snapshot(name)?;
        log::info!("📸 snapshot {:?} created (id={})", record.name, record.id);
        Ok(record)
    }

    /// Reset the in-memory aggregates and delete the live rows. Named
    /// snapshots are untouched.
    pub fn clear_data(&self) -> Result<(), EngineError> {
        let mut inner = self.lock();
        inner.aggregator.reset();
        inner.backend.clear_live()?;
        log::info!("🧹 profiling data cleared");
        Ok(())
    }

    pub fn snapshots(&self) -> Result<Vec<SnapshotRecord>, EngineError> {
        Ok(self.lock().backend.list_snapshots()?)
    }

    pub fn write_property(&self, name: &str, value: &str) -> Result<(), EngineError> {
        Ok(self.lock().backend.write_property(name, value)?)
    }

    pub fn get_property(&self, name: &str) -> Result<Option<String>, EngineError> {
        Ok(self.lock().backend.get_property(name)?)
    }

    /// Ad hoc read against the underlying store; not used by the engine's
    /// own logic.
    pub fn query_rows(&self, sql: &str) -> Result<Vec<serde_json::Value>, EngineError> {
        Ok(self.lock().backend.query_rows(sql)?)
    }

    pub fn query_scalar(&self, sql: &str) -> Result<Option<f64>, EngineError> {
        Ok(self.lock().backend.query_scalar(sql)?)
    }

    pub fn execute(&self, sql: &str) -> Result<usize, EngineError> {
        Ok(self.lock().backend.execute(sql)?)
    }

    /// Final flush and teardown, releasing the backend.
    pub fn close(self) -> Result<(), EngineError> {
        let mut inner = self.inner.into_inner().expect("engine lock poisoned");
        inner.flush()?;
        log::info!("profiler engine closed");
        Ok(())
    }
}
