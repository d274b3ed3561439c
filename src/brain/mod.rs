//! Phase 2: The Brain
//!
//! Responsible for:
//! - Finding negative cycles (arbitrage opportunities) with Bellman-Ford or Floyd-Warshall
//! - Turning index paths back into evaluated, real-rate cycles
//! - Filtering and ranking what survives

mod aggregator;
mod bellman_ford;
mod evaluator;
mod floyd_warshall;

pub use aggregator::ResultAggregator;
pub use bellman_ford::{BellmanFordDetector, MAX_DEFAULT_START_CURRENCIES};
pub use evaluator::{canonical_key, CycleEvaluator, KEY_DELIMITER};
pub use floyd_warshall::{AllPairs, FloydWarshallDetector, MAX_SEARCH_EXTENSIONS};

use std::collections::HashMap;

/// Tolerance for every "is this sum below zero" comparison
pub const EPSILON: f64 = 1e-5;

/// Reduce a closed walk of node indices to its first simple loop.
///
/// `[a, b, c, b, d]` closes at the repeated `b`, giving `[b, c]`.
/// A walk with no repeats is already simple and is returned as is.
pub(crate) fn simple_cycle(walk: &[usize]) -> Vec<usize> {
    let mut seen: HashMap<usize, usize> = HashMap::with_capacity(walk.len());
    for (pos, &node) in walk.iter().enumerate() {
        if let Some(&first) = seen.get(&node) {
            return walk[first..pos].to_vec();
        }
        seen.insert(node, pos);
    }
    walk.to_vec()
}

/// Sum of edge weights around a closed cycle of node indices.
///
/// Summed from the smallest index onward, so every detector gets the same
/// value for the same cycle regardless of the rotation it found.
pub(crate) fn cycle_weight(weights: &[Vec<f64>], cycle: &[usize]) -> f64 {
    let Some(start) = (0..cycle.len()).min_by_key(|&i| cycle[i]) else {
        return f64::INFINITY;
    };
    (0..cycle.len())
        .map(|k| {
            let from = cycle[(start + k) % cycle.len()];
            let to = cycle[(start + k + 1) % cycle.len()];
            weights[from][to]
        })
        .sum()
}

/// True when the cycle is a real opportunity, not rounding noise
pub(crate) fn is_negative_cycle(weights: &[Vec<f64>], cycle: &[usize]) -> bool {
    cycle.len() >= 2 && cycle_weight(weights, cycle) < -EPSILON
}
