//! Cycle Evaluation
//!
//! Step 2.2: The Accountant
//!
//! Log weights find cycles; real rates price them. Every candidate is
//! re-priced here from the adjacency graph, and anything that references
//! a missing edge is thrown away.

use tracing::debug;

use crate::cartographer::RateGraph;
use crate::types::{ArbitrageCycle, Currency, RateHop};

/// Separator used in canonical cycle keys
pub const KEY_DELIMITER: &str = "->";

/// Drop a trailing element that repeats the first (`[A, B, A]` -> `[A, B]`)
fn open_loop(cycle: &[Currency]) -> &[Currency] {
    match cycle {
        [first, .., last] if first == last => &cycle[..cycle.len() - 1],
        _ => cycle,
    }
}

/// Rotation-invariant identity of a cycle.
///
/// The loop is rotated to start at its lexicographically smallest
/// currency, so `[B, C, A]` and `[A, B, C]` share the key `A->B->C`.
/// Direction matters: `[A, C, B]` is a different cycle.
pub fn canonical_key(cycle: &[Currency]) -> String {
    let cycle = open_loop(cycle);
    let Some(start) = cycle
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.cmp(b.1))
        .map(|(i, _)| i)
    else {
        return String::new();
    };

    cycle[start..]
        .iter()
        .chain(cycle[..start].iter())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(KEY_DELIMITER)
}

/// Prices raw cycles against the adjacency graph
pub struct CycleEvaluator<'a> {
    graph: &'a RateGraph,
}

impl<'a> CycleEvaluator<'a> {
    pub fn new(graph: &'a RateGraph) -> Self {
        Self { graph }
    }

    /// Re-price a cycle. Returns `None` if any leg has no edge.
    pub fn evaluate(&self, cycle: &[Currency]) -> Option<ArbitrageCycle> {
        let currencies = open_loop(cycle);
        if currencies.is_empty() {
            return None;
        }

        let mut hops = Vec::with_capacity(currencies.len());
        let mut profit = 1.0;
        let mut bottleneck: Option<f64> = Some(f64::INFINITY);

        for (i, from) in currencies.iter().enumerate() {
            let to = &currencies[(i + 1) % currencies.len()];
            let Some(edge) = self.graph.edge(from, to) else {
                debug!("Dropping cycle {:?}: no edge {} -> {}", currencies, from, to);
                return None;
            };

            profit *= edge.rate;
            bottleneck = match (bottleneck, edge.volume) {
                (Some(current), Some(volume)) => Some(current.min(volume)),
                _ => None,
            };
            hops.push(RateHop {
                from: from.clone(),
                to: to.clone(),
                rate: edge.rate,
            });
        }

        Some(ArbitrageCycle {
            currencies: currencies.to_vec(),
            rates: hops,
            profit,
            profit_percentage: (profit - 1.0) * 100.0,
            total_volume: bottleneck.unwrap_or(0.0),
        })
    }
}
