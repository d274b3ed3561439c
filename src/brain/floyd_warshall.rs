//! All-Pairs Floyd-Warshall
//!
//! Step 2.1b: The Surveyor
//!
//! Runs the classic O(n³) sweep over the distance matrix with a next-hop
//! table, then reads cycles off the result:
//! - negative diagonal entries (a loop back to `i`)
//! - pairs whose round trip `i -> j -> i` sums below zero
//!
//! Once a negative cycle exists the next-hop table stops describing
//! shortest paths, so it can route a pair through some other loop and
//! hide the one that made the pair negative. The diagonal is still exact
//! about *which* nodes sit on a negative cycle, so a bounded search over
//! the original weights, restricted to those nodes, fills in every cycle
//! the table missed.

use std::collections::HashSet;
use tracing::{debug, info, warn};

use super::{canonical_key, is_negative_cycle, simple_cycle, EPSILON};
use crate::cartographer::RateGraph;
use crate::config::AlgorithmSettings;
use crate::types::Currency;

/// Shortest-path state after the sweep
#[derive(Debug, Clone)]
pub struct AllPairs {
    pub dist: Vec<Vec<f64>>,
    pub next: Vec<Vec<Option<usize>>>,
}

/// Cap on path extensions made by the exhaustive search, per call
pub const MAX_SEARCH_EXTENSIONS: usize = 100_000;

/// Floyd-Warshall negative cycle detector
pub struct FloydWarshallDetector<'a> {
    graph: &'a RateGraph,
    settings: &'a AlgorithmSettings,
}

impl<'a> FloydWarshallDetector<'a> {
    pub fn new(graph: &'a RateGraph, settings: &'a AlgorithmSettings) -> Self {
        Self { graph, settings }
    }

    pub fn shortest_paths(&self) -> AllPairs {
        let mut dist = self.graph.distance_matrix().to_vec();
        let n = dist.len();
        let mut next: Vec<Vec<Option<usize>>> = dist
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .map(|(j, d)| d.is_finite().then_some(j))
                    .collect()
            })
            .collect();

        for k in 0..n {
            for i in 0..n {
                let d_ik = dist[i][k];
                if d_ik == f64::INFINITY {
                    continue;
                }
                for j in 0..n {
                    let d_kj = dist[k][j];
                    if d_kj == f64::INFINITY {
                        continue;
                    }
                    let through = d_ik + d_kj;
                    if through < dist[i][j] {
                        dist[i][j] = through;
                        next[i][j] = next[i][k];
                    }
                }
            }
        }

        AllPairs { dist, next }
    }

    /// Follow the next-hop table from `from` until `to` comes up again.
    ///
    /// The returned path starts at `from` and excludes `to`, so `from == to`
    /// yields a closed loop. Gives up after `max_path_length + 1` hops.
    fn reconstruct(&self, next: &[Vec<Option<usize>>], from: usize, to: usize) -> Option<Vec<usize>> {
        let limit = self.settings.max_path_length.saturating_add(1);
        let mut path = vec![from];
        let mut cur = next[from][to]?;
        let mut hops = 1;

        while cur != to {
            if hops > limit {
                debug!("Next-hop walk {} -> {} exceeded {} hops", from, to, limit);
                return None;
            }
            path.push(cur);
            cur = next[cur][to]?;
            hops += 1;
        }

        Some(path)
    }

    fn accept(&self, walk: &[usize]) -> Option<Vec<usize>> {
        let cycle = simple_cycle(walk);
        (cycle.len() >= 2
            && cycle.len() <= self.settings.max_path_length
            && is_negative_cycle(self.graph.distance_matrix(), &cycle))
        .then_some(cycle)
    }

    /// Every simple negative cycle of at most `max_path_length` hops whose
    /// nodes all lie in `region`, each reported once from its lowest index.
    ///
    /// Returns `false` as the second element when the extension budget ran
    /// out before the search finished.
    pub fn search_cycles(&self, region: &[bool]) -> (Vec<Vec<usize>>, bool) {
        let mut search = CycleSearch {
            weights: self.graph.distance_matrix(),
            region,
            max_len: self.settings.max_path_length,
            budget: MAX_SEARCH_EXTENSIONS,
            found: Vec::new(),
        };

        for root in 0..region.len() {
            if !region[root] {
                continue;
            }
            let mut on_path = vec![false; region.len()];
            on_path[root] = true;
            if !search.extend(root, &mut vec![root], &mut on_path) {
                warn!(
                    "Floyd-Warshall: cycle search stopped after {} extensions",
                    MAX_SEARCH_EXTENSIONS
                );
                return (search.found, false);
            }
        }

        (search.found, true)
    }

    pub fn find_all_cycles(&self) -> Vec<Vec<Currency>> {
        let AllPairs { dist, next } = self.shortest_paths();
        let n = dist.len();

        let mut candidates: Vec<Vec<usize>> = Vec::new();

        for i in 0..n {
            if dist[i][i] < -EPSILON {
                if let Some(cycle) = self.reconstruct(&next, i, i).and_then(|w| self.accept(&w)) {
                    candidates.push(cycle);
                }
            }
        }

        for i in 0..n {
            for j in (i + 1)..n {
                let (there, back) = (dist[i][j], dist[j][i]);
                if there == f64::INFINITY || back == f64::INFINITY || there + back >= -EPSILON {
                    continue;
                }
                let (Some(mut walk), Some(back_half)) =
                    (self.reconstruct(&next, i, j), self.reconstruct(&next, j, i))
                else {
                    continue;
                };
                walk.extend(back_half);
                if let Some(cycle) = self.accept(&walk) {
                    candidates.push(cycle);
                }
            }
        }

        // Loose bound: anything a cycle below -EPSILON passes through
        let region: Vec<bool> = (0..n).map(|i| dist[i][i] < 0.0).collect();
        let (searched, complete) = self.search_cycles(&region);
        debug!(
            "Floyd-Warshall: {} region nodes, {} searched cycles (complete: {})",
            region.iter().filter(|&&r| r).count(),
            searched.len(),
            complete
        );
        candidates.extend(searched);

        let mut seen_keys: HashSet<String> = HashSet::new();
        let cycles: Vec<Vec<Currency>> = candidates
            .iter()
            .map(|c| self.graph.to_currencies(c))
            .filter(|c| seen_keys.insert(canonical_key(c)))
            .collect();

        info!(
            "Floyd-Warshall: {} unique candidate cycles over {} currencies",
            cycles.len(),
            n
        );

        cycles
    }
}

/// Depth-first walk over the original weights
struct CycleSearch<'a> {
    weights: &'a [Vec<f64>],
    region: &'a [bool],
    max_len: usize,
    budget: usize,
    found: Vec<Vec<usize>>,
}

impl CycleSearch<'_> {
    /// Returns `false` once the budget is spent.
    fn extend(&mut self, root: usize, path: &mut Vec<usize>, on_path: &mut [bool]) -> bool {
        let Some(&last) = path.last() else {
            return true;
        };

        for next in root..self.weights.len() {
            if next == last || self.weights[last][next] == f64::INFINITY {
                continue;
            }
            if next == root {
                if path.len() >= 2 && is_negative_cycle(self.weights, path) {
                    self.found.push(path.clone());
                }
                continue;
            }
            if on_path[next] || !self.region[next] || path.len() >= self.max_len {
                continue;
            }
            if self.budget == 0 {
                return false;
            }
            self.budget -= 1;

            on_path[next] = true;
            path.push(next);
            let finished = self.extend(root, path, on_path);
            path.pop();
            on_path[next] = false;
            if !finished {
                return false;
            }
        }

        true
    }
}
