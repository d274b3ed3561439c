//! Result Aggregation
//!
//! Step 2.3: The Filter
//!
//! Drops cycles that don't clear the profit threshold or are too long,
//! removes rotations of cycles already seen, and ranks the rest.

use std::collections::HashSet;
use tracing::{debug, info};

use super::canonical_key;
use crate::config::AlgorithmSettings;
use crate::types::ArbitrageCycle;

/// Filters, deduplicates and ranks evaluated cycles
pub struct ResultAggregator<'a> {
    settings: &'a AlgorithmSettings,
}

impl<'a> ResultAggregator<'a> {
    pub fn new(settings: &'a AlgorithmSettings) -> Self {
        Self { settings }
    }

    /// Profit must strictly exceed the threshold; length must be in bounds.
    pub fn passes(&self, cycle: &ArbitrageCycle) -> bool {
        let len = cycle.currencies.len();
        cycle.profit_percentage > self.settings.min_profit_percentage()
            && len >= 2
            && len <= self.settings.max_path_length
    }

    /// Filter and dedupe (first occurrence wins), then sort best first.
    pub fn aggregate(&self, cycles: Vec<ArbitrageCycle>) -> Vec<ArbitrageCycle> {
        let total = cycles.len();
        let mut seen_keys: HashSet<String> = HashSet::new();
        let mut filtered_count = 0;
        let mut duplicate_count = 0;

        let mut kept: Vec<ArbitrageCycle> = Vec::with_capacity(total);
        for cycle in cycles {
            if !self.passes(&cycle) {
                debug!(
                    "Filtered: {} | {:+.4}% | {} hops",
                    cycle.route(),
                    cycle.profit_percentage,
                    cycle.hop_count()
                );
                filtered_count += 1;
                continue;
            }
            if !seen_keys.insert(canonical_key(&cycle.currencies)) {
                duplicate_count += 1;
                continue;
            }
            kept.push(cycle);
        }

        if filtered_count > 0 {
            info!(
                "Filtered out {} cycles at or below {:.4}% profit or over {} hops",
                filtered_count,
                self.settings.min_profit_percentage(),
                self.settings.max_path_length
            );
        }
        if duplicate_count > 0 {
            debug!("Dropped {} rotated duplicates", duplicate_count);
        }

        // Stable, so equal-profit cycles keep discovery order
        kept.sort_by(|a, b| {
            b.profit_percentage
                .partial_cmp(&a.profit_percentage)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        kept
    }

    /// Highest profit cycle, if any
    pub fn best(cycles: &[ArbitrageCycle]) -> Option<ArbitrageCycle> {
        cycles
            .iter()
            .max_by(|a, b| {
                a.profit_percentage
                    .partial_cmp(&b.profit_percentage)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .cloned()
    }
}
