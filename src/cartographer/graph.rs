//! Graph Construction
//!
//! Step 1.2: The Map Maker
//!
//! Builds two projections of the same validated rate set:
//! - an adjacency graph (petgraph) with `-ln(rate)` weights for Bellman-Ford
//! - dense distance/rate matrices for Floyd-Warshall
//!
//! Nodes are inserted in sorted currency order, so a node's index is also
//! its row/column in the matrices.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{BTreeSet, HashMap};
use tracing::info;

use crate::error::EngineError;
use crate::types::{Currency, ExchangeRate};

/// Fewer currencies than this cannot hold a cycle worth reporting
pub const MIN_CURRENCIES: usize = 3;

/// Edge data in the rate graph
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeData {
    /// `-ln(rate)`; negative cycle sums mean profit
    pub weight: f64,
    pub rate: f64,
    pub volume: Option<f64>,
}

impl EdgeData {
    pub fn from_rate(rate: &ExchangeRate) -> Self {
        Self {
            weight: -rate.rate.ln(),
            rate: rate.rate,
            volume: rate.volume,
        }
    }
}

/// Merge a duplicate quote for the same ordered pair into `existing`.
///
/// The lower weight (better rate) wins; ties keep the first quote.
/// Returns true when `existing` was replaced.
pub fn merge_edge(existing: &mut EdgeData, candidate: EdgeData) -> bool {
    if candidate.weight < existing.weight {
        *existing = candidate;
        true
    } else {
        false
    }
}

/// The rate graph, scoped to a single detection call
#[derive(Debug, Clone)]
pub struct RateGraph {
    pub graph: DiGraph<Currency, EdgeData>,
    currency_to_node: HashMap<Currency, NodeIndex>,
    currencies: Vec<Currency>,
    distances: Vec<Vec<f64>>,
    rates: Vec<Vec<f64>>,
}

impl RateGraph {
    /// Build both projections from validated rates.
    pub fn from_rates(rates: &[ExchangeRate]) -> Result<Self, EngineError> {
        let currencies: Vec<Currency> = rates
            .iter()
            .flat_map(|r| [r.from.clone(), r.to.clone()])
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        if rates.is_empty() || currencies.len() < MIN_CURRENCIES {
            return Err(EngineError::InsufficientData {
                valid_rates: rates.len(),
                invalid_rates: 0,
                currencies: currencies.len(),
            });
        }

        let mut graph = DiGraph::with_capacity(currencies.len(), rates.len());
        let mut currency_to_node = HashMap::with_capacity(currencies.len());
        for currency in &currencies {
            let node = graph.add_node(currency.clone());
            currency_to_node.insert(currency.clone(), node);
        }

        let mut merged = 0;
        for rate in rates {
            let (Some(&from), Some(&to)) =
                (currency_to_node.get(&rate.from), currency_to_node.get(&rate.to))
            else {
                continue;
            };
            let candidate = EdgeData::from_rate(rate);

            match graph.find_edge(from, to) {
                Some(edge) => {
                    merged += 1;
                    if let Some(existing) = graph.edge_weight_mut(edge) {
                        merge_edge(existing, candidate);
                    }
                }
                None => {
                    graph.add_edge(from, to, candidate);
                }
            }
        }

        let n = currencies.len();
        let mut distances = vec![vec![f64::INFINITY; n]; n];
        let mut rate_matrix = vec![vec![0.0; n]; n];
        for i in 0..n {
            distances[i][i] = 0.0;
            rate_matrix[i][i] = 1.0;
        }
        for edge in graph.edge_references() {
            let (i, j) = (edge.source().index(), edge.target().index());
            distances[i][j] = edge.weight().weight;
            rate_matrix[i][j] = edge.weight().rate;
        }

        info!(
            "Graph built: {} Nodes, {} Edges ({} duplicate quotes merged)",
            graph.node_count(),
            graph.edge_count(),
            merged
        );

        Ok(Self {
            graph,
            currency_to_node,
            currencies,
            distances,
            rates: rate_matrix,
        })
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Sorted distinct currencies; position == node index == matrix index
    pub fn currencies(&self) -> &[Currency] {
        &self.currencies
    }

    pub fn get_node(&self, currency: &str) -> Option<NodeIndex> {
        self.currency_to_node.get(currency).copied()
    }

    pub fn index_of(&self, currency: &str) -> Option<usize> {
        self.get_node(currency).map(NodeIndex::index)
    }

    pub fn currency(&self, index: usize) -> Option<&Currency> {
        self.currencies.get(index)
    }

    /// Edge between two currencies, by name
    pub fn edge(&self, from: &str, to: &str) -> Option<&EdgeData> {
        let edge = self.graph.find_edge(self.get_node(from)?, self.get_node(to)?)?;
        self.graph.edge_weight(edge)
    }

    pub fn has_outgoing(&self, index: usize) -> bool {
        self.graph
            .neighbors_directed(NodeIndex::new(index), Direction::Outgoing)
            .next()
            .is_some()
    }

    /// Flat `(from, to, weight)` edge list, in insertion order
    pub fn weighted_edges(&self) -> Vec<(usize, usize, f64)> {
        self.graph
            .edge_references()
            .map(|e| (e.source().index(), e.target().index(), e.weight().weight))
            .collect()
    }

    /// `n x n` weights: `∞` where no edge, `0` on the diagonal
    pub fn distance_matrix(&self) -> &[Vec<f64>] {
        &self.distances
    }

    /// `n x n` real rates: `0` where no edge, `1` on the diagonal
    pub fn rate_matrix(&self) -> &[Vec<f64>] {
        &self.rates
    }

    /// Map node indices back to currency codes
    pub fn to_currencies(&self, indices: &[usize]) -> Vec<Currency> {
        indices
            .iter()
            .filter_map(|&i| self.currency(i).cloned())
            .collect()
    }
}
