//! Weighted counting structures folded out of the sample stream.
//!
//! All three tables are purely additive, so the interleaving order of
//! concurrently-arriving events never changes the final values. Ordered maps
//! keep flush iteration deterministic.

use std::collections::BTreeMap;

use super::types::{AllocRow, CallRow, SampleRow};

/// Per-thread weighted call graph, keyed child function id first, then parent.
///
/// The sentinel function id (0) anchors every sample: each fully-processed
/// sample contributes exactly one edge entering the sentinel-as-child and one
/// edge leaving the sentinel-as-parent, so per thread the weight flowing into
/// the sentinel equals the weight flowing out of it.
#[derive(Debug, Default)]
pub struct CallGraph {
    edges: BTreeMap<i64, BTreeMap<i64, f64>>,
}

impl CallGraph {
    pub fn add_edge(&mut self, child_id: i64, parent_id: i64, time: f64) {
        *self
            .edges
            .entry(child_id)
            .or_default()
            .entry(parent_id)
            .or_default() += time;
    }

    /// Accumulated weight on a single edge, 0.0 if never observed.
    pub fn edge_weight(&self, child_id: i64, parent_id: i64) -> f64 {
        self.edges
            .get(&child_id)
            .and_then(|parents| parents.get(&parent_id))
            .copied()
            .unwrap_or(0.0)
    }

    /// Total weight entering the given function as a child.
    pub fn weight_into(&self, child_id: i64) -> f64 {
        self.edges
            .get(&child_id)
            .map(|parents| parents.values().sum())
            .unwrap_or(0.0)
    }

    /// Total weight leaving the given function as a parent.
    pub fn weight_out_of(&self, parent_id: i64) -> f64 {
        self.edges
            .values()
            .filter_map(|parents| parents.get(&parent_id))
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, i64, f64)> + '_ {
        self.edges.iter().flat_map(|(&child, parents)| {
            parents
                .iter()
                .map(move |(&parent, &time)| (child, parent, time))
        })
    }
}

/// Inclusive time per function per thread: time credited to a function for
/// appearing anywhere in a sampled stack, once per sample regardless of
/// recursion depth.
#[derive(Debug, Default)]
pub struct SampleTotals {
    totals: BTreeMap<i64, BTreeMap<i64, f64>>,
}

impl SampleTotals {
    pub fn add(&mut self, function_id: i64, thread_id: i64, time: f64) {
        *self
            .totals
            .entry(function_id)
            .or_default()
            .entry(thread_id)
            .or_default() += time;
    }

    pub fn get(&self, function_id: i64, thread_id: i64) -> f64 {
        self.totals
            .get(&function_id)
            .and_then(|threads| threads.get(&thread_id))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    pub fn clear(&mut self) {
        self.totals.clear();
    }

    pub fn to_rows(&self) -> Vec<SampleRow> {
        self.totals
            .iter()
            .flat_map(|(&function_id, threads)| {
                threads.iter().map(move |(&thread_id, &time)| SampleRow {
                    thread_id,
                    function_id,
                    time,
                })
            })
            .collect()
    }
}

/// Additive allocation counters per class per allocating function.
#[derive(Debug, Default)]
pub struct AllocData {
    counters: BTreeMap<i64, BTreeMap<i64, AllocCounters>>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct AllocCounters {
    pub count: u64,
    pub total_size: u64,
}

impl AllocData {
    pub fn add(&mut self, class_id: i64, function_id: i64, size: u64) {
        let entry = self
            .counters
            .entry(class_id)
            .or_default()
            .entry(function_id)
            .or_default();
        entry.count += 1;
        entry.total_size += size;
    }

    pub fn get(&self, class_id: i64, function_id: i64) -> AllocCounters {
        self.counters
            .get(&class_id)
            .and_then(|functions| functions.get(&function_id))
            .copied()
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    pub fn clear(&mut self) {
        self.counters.clear();
    }

    pub fn to_rows(&self) -> Vec<AllocRow> {
        self.counters
            .iter()
            .flat_map(|(&class_id, functions)| {
                functions.iter().map(move |(&function_id, c)| AllocRow {
                    class_id,
                    function_id,
                    count: c.count,
                    total_size: c.total_size,
                })
            })
            .collect()
    }
}

/// Flatten a set of per-thread call graphs into edge rows for flushing.
pub fn call_rows(graphs: &BTreeMap<i64, CallGraph>) -> Vec<CallRow> {
    graphs
        .iter()
        .flat_map(|(&thread_id, graph)| {
            graph.iter().map(move |(child_id, parent_id, time)| CallRow {
                thread_id,
                parent_id,
                child_id,
                time,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_weights_accumulate() {
        let mut graph = CallGraph::default();
        graph.add_edge(10, 0, 5.0);
        graph.add_edge(10, 0, 2.5);
        graph.add_edge(20, 10, 1.0);

        assert_eq!(graph.edge_weight(10, 0), 7.5);
        assert_eq!(graph.edge_weight(20, 10), 1.0);
        assert_eq!(graph.edge_weight(20, 0), 0.0);
    }

    #[test]
    fn sentinel_flow_balances() {
        let mut graph = CallGraph::default();
        // Two samples: [10, 20] weight 3, [10] weight 2.
        graph.add_edge(10, 0, 3.0);
        graph.add_edge(20, 10, 3.0);
        graph.add_edge(0, 20, 3.0);
        graph.add_edge(10, 0, 2.0);
        graph.add_edge(0, 10, 2.0);

        assert_eq!(graph.weight_into(0), graph.weight_out_of(0));
        assert_eq!(graph.weight_into(0), 5.0);
    }

    #[test]
    fn totals_counted_per_thread() {
        let mut totals = SampleTotals::default();
        totals.add(10, 1, 5.0);
        totals.add(10, 2, 1.0);
        totals.add(10, 1, 5.0);

        assert_eq!(totals.get(10, 1), 10.0);
        assert_eq!(totals.get(10, 2), 1.0);
        assert_eq!(totals.get(99, 1), 0.0);
    }

    #[test]
    fn alloc_counters_additive() {
        let mut allocs = AllocData::default();
        allocs.add(7, 10, 128);
        allocs.add(7, 10, 64);
        allocs.add(7, 20, 32);

        assert_eq!(
            allocs.get(7, 10),
            AllocCounters {
                count: 2,
                total_size: 192
            }
        );
        assert_eq!(allocs.get(7, 20).count, 1);
    }

    #[test]
    fn rows_flatten_in_deterministic_order() {
        let mut graphs = BTreeMap::new();
        let mut graph = CallGraph::default();
        graph.add_edge(20, 10, 1.0);
        graph.add_edge(10, 0, 1.0);
        graphs.insert(1, graph);

        let rows = call_rows(&graphs);
        assert_eq!(rows.len(), 2);
        // Ordered by child id.
        assert_eq!(rows[0].child_id, 10);
        assert_eq!(rows[1].child_id, 20);
    }
}
