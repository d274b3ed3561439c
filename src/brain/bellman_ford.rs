//! Multi-Source Bellman-Ford
//!
//! Step 2.1a: The Pathfinder
//!
//! Relaxes every edge from each start currency for a caller-chosen number
//! of passes, then makes one extra pass: anything that still relaxes sits
//! on (or behind) a negative cycle. Cycles are pulled out of the
//! predecessor table.
//!
//! The iteration budget is honoured as given, not clamped to `|V| - 1`.
//! Results are only guaranteed complete when `max_iterations >= |V| - 1`.

use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info};

use super::{canonical_key, is_negative_cycle, simple_cycle, EPSILON};
use crate::cartographer::RateGraph;
use crate::config::AlgorithmSettings;
use crate::types::Currency;

/// Cap on the default start set (every currency with outgoing edges)
pub const MAX_DEFAULT_START_CURRENCIES: usize = 50;

/// Bellman-Ford negative cycle detector
pub struct BellmanFordDetector<'a> {
    graph: &'a RateGraph,
    settings: &'a AlgorithmSettings,
}

impl<'a> BellmanFordDetector<'a> {
    pub fn new(graph: &'a RateGraph, settings: &'a AlgorithmSettings) -> Self {
        Self { graph, settings }
    }

    /// Node indices to run from.
    ///
    /// Explicit start currencies are intersected with the graph; otherwise
    /// every currency with an outgoing edge is used, up to the cap. Sinks
    /// are dropped either way since no cycle can leave them.
    pub fn start_nodes(&self) -> Vec<usize> {
        let requested = &self.settings.bellman_ford_start_currencies;

        if requested.is_empty() {
            return (0..self.graph.node_count())
                .filter(|&i| self.graph.has_outgoing(i))
                .take(MAX_DEFAULT_START_CURRENCIES)
                .collect();
        }

        let mut seen = HashSet::new();
        requested
            .iter()
            .filter_map(|c| self.graph.index_of(c))
            .filter(|&i| self.graph.has_outgoing(i))
            .filter(|&i| seen.insert(i))
            .collect()
    }

    /// Run from a single start node and return raw index cycles in
    /// trade order.
    pub fn find_cycles_from(&self, start: usize, edges: &[(usize, usize, f64)]) -> Vec<Vec<usize>> {
        let n = self.graph.node_count();
        let weights = self.graph.distance_matrix();
        let mut dist = vec![f64::INFINITY; n];
        let mut pred: Vec<Option<usize>> = vec![None; n];
        dist[start] = 0.0;

        let mut passes = 0;
        for _ in 0..self.settings.max_iterations {
            passes += 1;
            let mut relaxed = false;
            for &(u, v, w) in edges {
                if dist[u] < f64::INFINITY && dist[u] + w < dist[v] - EPSILON {
                    dist[v] = dist[u] + w;
                    pred[v] = Some(u);
                    relaxed = true;
                }
            }
            if !relaxed {
                break;
            }
        }

        // Extra pass runs unconditionally. The offending edge becomes the
        // predecessor so the loop can be closed even when the budget ran
        // out one pass short.
        let mut flagged = BTreeSet::new();
        for &(u, v, w) in edges {
            if dist[u] < f64::INFINITY && dist[u] + w < dist[v] - EPSILON {
                pred[v] = Some(u);
                flagged.insert(v);
            }
        }

        debug!(
            "Bellman-Ford from {:?}: {} passes, {} nodes flagged",
            self.graph.currency(start),
            passes,
            flagged.len()
        );

        let mut cycles = Vec::new();
        let mut seen: HashSet<Vec<usize>> = HashSet::new();

        for node in flagged {
            let Some(cycle) = extract_cycle(&pred, node, n) else {
                continue;
            };
            if cycle.len() < 2 || cycle.len() > self.settings.max_path_length {
                debug!("Dropping Bellman-Ford cycle of length {}", cycle.len());
                continue;
            }
            if !is_negative_cycle(weights, &cycle) {
                debug!("Dropping Bellman-Ford cycle above -{}", EPSILON);
                continue;
            }
            let mut key = cycle.clone();
            if let Some(min_pos) = (0..key.len()).min_by_key(|&i| key[i]) {
                key.rotate_left(min_pos);
            }
            if seen.insert(key) {
                cycles.push(cycle);
            }
        }

        cycles
    }

    /// Run from every start node and return deduplicated cycles
    pub fn find_all_cycles(&self) -> Vec<Vec<Currency>> {
        let starts = self.start_nodes();
        if starts.is_empty() {
            info!("Bellman-Ford: no start currency has outgoing edges");
            return Vec::new();
        }

        let edges = self.graph.weighted_edges();
        let mut all_cycles = Vec::new();
        let mut seen_keys: HashSet<String> = HashSet::new();

        for &start in &starts {
            for cycle in self.find_cycles_from(start, &edges) {
                let currencies = self.graph.to_currencies(&cycle);
                if seen_keys.insert(canonical_key(&currencies)) {
                    all_cycles.push(currencies);
                }
            }
        }

        info!(
            "Bellman-Ford: {} unique candidate cycles from {} start currencies",
            all_cycles.len(),
            starts.len()
        );

        all_cycles
    }
}

/// Pull the cycle containing (or leading to) `node` out of the
/// predecessor table.
///
/// Walks back `n` steps to land inside the loop, then walks the loop once
/// with a visited set. Predecessor links point against the trade
/// direction, so the result is reversed.
fn extract_cycle(pred: &[Option<usize>], node: usize, n: usize) -> Option<Vec<usize>> {
    let mut cur = node;
    for _ in 0..n {
        cur = pred[cur]?;
    }

    let mut walk = Vec::new();
    let mut visited = HashSet::new();
    while visited.insert(cur) {
        walk.push(cur);
        cur = pred[cur]?;
    }
    // `cur` is the first repeat; the loop starts where it was first seen
    let from = walk.iter().position(|&x| x == cur)?;
    let mut cycle = simple_cycle(&walk[from..]);
    cycle.reverse();
    Some(cycle)
}
