//! In-memory fold of the event stream.
//!
//! The aggregator owns the per-thread call graphs, the inclusive-time table
//! and the allocation table. It is plain mutable state: the engine facade
//! serializes access behind its lock. A flush drains the tables into row
//! batches and resets them to empty; the durable store adds the drained
//! deltas onto whatever it already holds.

use std::collections::BTreeMap;

use super::call_graph::{call_rows, AllocData, CallGraph, SampleTotals};
use super::types::{AllocRow, CallRow, Sample, SampleRow, SENTINEL_FUNCTION};

/// Row batches drained from the aggregator by a flush.
#[derive(Debug, Default)]
pub struct AggregateRows {
    pub samples: Vec<SampleRow>,
    pub calls: Vec<CallRow>,
    pub allocations: Vec<AllocRow>,
}

impl AggregateRows {
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty() && self.calls.is_empty() && self.allocations.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct Aggregator {
    call_graphs: BTreeMap<i64, CallGraph>,
    totals: SampleTotals,
    allocs: AllocData,
    sample_count: u64,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one stack sample into the call graph and inclusive-time table.
    ///
    /// `sample.functions` must be non-empty; the engine facade rejects empty
    /// samples before they reach this point.
    pub fn process_sample(&mut self, sample: &Sample) {
        let frames = &sample.functions;
        let graph = self.call_graphs.entry(sample.thread_id).or_default();

        graph.add_edge(frames[0], SENTINEL_FUNCTION, sample.time);
        for f in 1..frames.len() {
            graph.add_edge(frames[f], frames[f - 1], sample.time);
        }
        graph.add_edge(SENTINEL_FUNCTION, frames[frames.len() - 1], sample.time);

        // Inclusive time: once per sample per function, so recursion does not
        // double-count. First occurrence in the stack wins.
        for (i, &function_id) in frames.iter().enumerate() {
            if !frames[..i].contains(&function_id) {
                self.totals.add(function_id, sample.thread_id, sample.time);
            }
        }

        self.sample_count += 1;
    }

    pub fn record_allocation(&mut self, class_id: i64, size: u64, function_id: i64) {
        self.allocs.add(class_id, function_id, size);
    }

    /// Samples folded since the last drain.
    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    pub fn totals(&self) -> &SampleTotals {
        &self.totals
    }

    pub fn call_graph(&self, thread_id: i64) -> Option<&CallGraph> {
        self.call_graphs.get(&thread_id)
    }

    pub fn alloc_data(&self) -> &AllocData {
        &self.allocs
    }

    /// Build row batches from the accumulated tables without resetting them.
    /// A flush commits these first and only then resets, so a failed commit
    /// loses nothing.
    pub fn collect_rows(&self) -> AggregateRows {
        AggregateRows {
            samples: self.totals.to_rows(),
            calls: call_rows(&self.call_graphs),
            allocations: self.allocs.to_rows(),
        }
    }

    /// Drain the accumulated tables into row batches and reset to empty.
    pub fn drain(&mut self) -> AggregateRows {
        let rows = self.collect_rows();
        self.reset();
        rows
    }

    /// Reset every table and the sample counter without producing rows.
    pub fn reset(&mut self) {
        self.call_graphs.clear();
        self.totals.clear();
        self.allocs.clear();
        self.sample_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(thread_id: i64, functions: &[i64], time: f64) -> Sample {
        Sample {
            thread_id,
            functions: functions.to_vec(),
            time,
        }
    }

    #[test]
    fn single_sample_emits_anchored_edge_chain() {
        let mut agg = Aggregator::new();
        agg.process_sample(&sample(1, &[10, 20, 30], 5.0));

        let graph = agg.call_graph(1).unwrap();
        assert_eq!(graph.edge_weight(10, SENTINEL_FUNCTION), 5.0);
        assert_eq!(graph.edge_weight(20, 10), 5.0);
        assert_eq!(graph.edge_weight(30, 20), 5.0);
        assert_eq!(graph.edge_weight(SENTINEL_FUNCTION, 30), 5.0);

        assert_eq!(agg.totals().get(10, 1), 5.0);
        assert_eq!(agg.totals().get(20, 1), 5.0);
        assert_eq!(agg.totals().get(30, 1), 5.0);
    }

    #[test]
    fn recursive_frames_counted_once_for_inclusive_time() {
        let mut agg = Aggregator::new();
        agg.process_sample(&sample(1, &[10, 20, 10], 3.0));

        assert_eq!(agg.totals().get(10, 1), 3.0);
        assert_eq!(agg.totals().get(20, 1), 3.0);
        // The call graph still sees both occurrences.
        let graph = agg.call_graph(1).unwrap();
        assert_eq!(graph.edge_weight(10, 20), 3.0);
        assert_eq!(graph.edge_weight(SENTINEL_FUNCTION, 10), 3.0);
    }

    #[test]
    fn sentinel_flow_conserved_across_batch() {
        let mut agg = Aggregator::new();
        agg.process_sample(&sample(1, &[10, 20, 30], 5.0));
        agg.process_sample(&sample(1, &[10, 20], 2.0));
        agg.process_sample(&sample(1, &[40], 1.5));
        agg.process_sample(&sample(2, &[10], 9.0));

        for thread_id in [1, 2] {
            let graph = agg.call_graph(thread_id).unwrap();
            assert_eq!(
                graph.weight_into(SENTINEL_FUNCTION),
                graph.weight_out_of(SENTINEL_FUNCTION)
            );
        }
        assert_eq!(agg.call_graph(1).unwrap().weight_into(SENTINEL_FUNCTION), 8.5);
    }

    #[test]
    fn aggregation_is_order_independent() {
        let samples = [
            sample(1, &[10, 20], 1.0),
            sample(1, &[10, 20, 30], 2.0),
            sample(2, &[10], 4.0),
            sample(1, &[20, 10], 0.5),
        ];

        let mut forward = Aggregator::new();
        for s in &samples {
            forward.process_sample(s);
        }
        let mut reverse = Aggregator::new();
        for s in samples.iter().rev() {
            reverse.process_sample(s);
        }

        assert_eq!(forward.drain().calls, reverse.drain().calls);
    }

    #[test]
    fn drain_resets_state() {
        let mut agg = Aggregator::new();
        agg.process_sample(&sample(1, &[10], 1.0));
        agg.record_allocation(7, 64, 10);

        let rows = agg.drain();
        assert_eq!(rows.samples.len(), 1);
        assert_eq!(rows.calls.len(), 2);
        assert_eq!(rows.allocations.len(), 1);

        assert_eq!(agg.sample_count(), 0);
        assert!(agg.totals().is_empty());
        assert!(agg.alloc_data().is_empty());
        assert!(agg.drain().is_empty());
    }

    #[test]
    fn allocation_rows_carry_count_and_size() {
        let mut agg = Aggregator::new();
        agg.record_allocation(7, 128, 10);
        agg.record_allocation(7, 64, 10);

        let rows = agg.drain();
        assert_eq!(rows.allocations.len(), 1);
        assert_eq!(rows.allocations[0].count, 2);
        assert_eq!(rows.allocations[0].total_size, 192);
    }
}
