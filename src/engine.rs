//! Phase 3: The Engine
//!
//! Validator -> Graph -> {Bellman-Ford | Floyd-Warshall} -> Evaluator -> Aggregator
//!
//! One `detect()` call owns everything it builds. Nothing is cached between
//! calls, so an engine can be shared across threads freely.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::brain::{
    canonical_key, BellmanFordDetector, CycleEvaluator, FloydWarshallDetector, ResultAggregator,
};
use crate::cartographer::{RateGraph, RateValidator};
use crate::config::{Algorithm, AlgorithmSettings};
use crate::error::EngineError;
use crate::types::{ArbitrageCycle, Currency, ExchangeRate};

// ============================================
// STATE MACHINE
// ============================================

/// Lifecycle of a single detection call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    Idle,
    Validating,
    GraphBuilt,
    Detecting,
    Evaluating,
    Done,
    Failed,
}

impl EngineState {
    pub fn can_advance_to(self, next: EngineState) -> bool {
        use EngineState::*;
        matches!(
            (self, next),
            (Idle, Validating)
                | (Validating, GraphBuilt)
                | (Validating, Failed)
                | (GraphBuilt, Detecting)
                | (GraphBuilt, Failed)
                | (Detecting, Evaluating)
                | (Evaluating, Done)
        )
    }

    pub fn advance(self, next: EngineState) -> Result<EngineState, EngineError> {
        if !self.can_advance_to(next) {
            return Err(EngineError::IllegalTransition {
                from: self.to_string(),
                to: next.to_string(),
            });
        }
        debug!("Engine {} -> {}", self, next);
        Ok(next)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, EngineState::Done | EngineState::Failed)
    }
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EngineState::Idle => "IDLE",
            EngineState::Validating => "VALIDATING",
            EngineState::GraphBuilt => "GRAPH_BUILT",
            EngineState::Detecting => "DETECTING",
            EngineState::Evaluating => "EVALUATING",
            EngineState::Done => "DONE",
            EngineState::Failed => "FAILED",
        };
        write!(f, "{}", name)
    }
}

// ============================================
// RESULT
// ============================================

/// Outcome of one detection call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArbitrageResult {
    /// Ranked best first
    pub cycles: Vec<ArbitrageCycle>,
    pub total_opportunities: usize,
    pub best_opportunity: Option<ArbitrageCycle>,
    pub timestamp: DateTime<Utc>,
    pub algorithm_used: Algorithm,
    /// Wall-clock time of `detect()` only
    pub execution_time_ms: f64,
    pub valid_rates: usize,
    pub invalid_rates: usize,
}

impl ArbitrageResult {
    /// Canonical keys of every reported cycle
    pub fn canonical_keys(&self) -> BTreeSet<String> {
        self.cycles.iter().map(|c| canonical_key(&c.currencies)).collect()
    }

    pub fn has_opportunities(&self) -> bool {
        !self.cycles.is_empty()
    }
}

// ============================================
// ENGINE
// ============================================

/// Detection façade. Immutable; safe to share behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct ArbitrageEngine {
    settings: AlgorithmSettings,
    validator: RateValidator,
}

impl ArbitrageEngine {
    pub fn new(settings: AlgorithmSettings) -> Self {
        Self {
            settings,
            validator: RateValidator::new(),
        }
    }

    pub fn settings(&self) -> &AlgorithmSettings {
        &self.settings
    }

    /// Find arbitrage cycles in one batch of rates.
    ///
    /// Fails with `InvalidSettings` when the settings do not pass
    /// `AlgorithmSettings::validate`, and with `InsufficientData` when the
    /// batch has no valid rate or spans fewer than three currencies. "Ran fine, found nothing" is an
    /// `Ok` with an empty cycle list.
    pub fn detect(&self, rates: &[ExchangeRate]) -> Result<ArbitrageResult, EngineError> {
        let started = Instant::now();
        let settings = &self.settings;

        let state = EngineState::Idle.advance(EngineState::Validating)?;
        if let Err(e) = settings.validate() {
            state.advance(EngineState::Failed)?;
            warn!("Rejecting settings: {}", e);
            return Err(EngineError::InvalidSettings(e.to_string()));
        }
        let report = self.validator.validate(rates);

        if report.valid.is_empty() {
            state.advance(EngineState::Failed)?;
            warn!("No valid rates in batch of {}", rates.len());
            return Err(EngineError::InsufficientData {
                valid_rates: 0,
                invalid_rates: report.invalid_count,
                currencies: 0,
            });
        }

        let state = state.advance(EngineState::GraphBuilt)?;
        let graph = match RateGraph::from_rates(&report.valid) {
            Ok(graph) => graph,
            Err(EngineError::InsufficientData { valid_rates, currencies, .. }) => {
                state.advance(EngineState::Failed)?;
                warn!("Only {} currencies in batch - nothing to detect", currencies);
                return Err(EngineError::InsufficientData {
                    valid_rates,
                    invalid_rates: report.invalid_count,
                    currencies,
                });
            }
            Err(e) => return Err(e),
        };

        let state = state.advance(EngineState::Detecting)?;
        let candidates: Vec<Vec<Currency>> = match settings.algorithm {
            Algorithm::BellmanFord => BellmanFordDetector::new(&graph, settings).find_all_cycles(),
            Algorithm::FloydWarshall => {
                FloydWarshallDetector::new(&graph, settings).find_all_cycles()
            }
        };

        let state = state.advance(EngineState::Evaluating)?;
        let evaluator = CycleEvaluator::new(&graph);
        let evaluated: Vec<ArbitrageCycle> = candidates
            .iter()
            .filter_map(|c| evaluator.evaluate(c))
            .collect();

        let cycles = ResultAggregator::new(settings).aggregate(evaluated);
        let best_opportunity = ResultAggregator::best(&cycles);
        state.advance(EngineState::Done)?;

        let execution_time_ms = started.elapsed().as_secs_f64() * 1000.0;

        match &best_opportunity {
            Some(best) => info!(
                "{}: {} opportunities in {:.2}ms, best {} ({:+.4}%)",
                settings.algorithm,
                cycles.len(),
                execution_time_ms,
                best.route(),
                best.profit_percentage
            ),
            None => info!(
                "{}: no opportunities in {:.2}ms",
                settings.algorithm, execution_time_ms
            ),
        }

        Ok(ArbitrageResult {
            total_opportunities: cycles.len(),
            cycles,
            best_opportunity,
            timestamp: Utc::now(),
            algorithm_used: settings.algorithm,
            execution_time_ms,
            valid_rates: report.valid_count(),
            invalid_rates: report.invalid_count,
        })
    }
}

/// Run `detect()` on the blocking pool, bounded by `timeout`.
///
/// The detector itself never checks for cancellation; on timeout the
/// blocking task runs to completion in the background and its result is
/// discarded.
pub async fn run_with_timeout(
    engine: Arc<ArbitrageEngine>,
    rates: Vec<ExchangeRate>,
    timeout: Duration,
) -> Result<ArbitrageResult, EngineError> {
    let task = tokio::task::spawn_blocking(move || engine.detect(&rates));

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(EngineError::Join(join_err.to_string())),
        Err(_) => {
            warn!("Detection exceeded {:?}", timeout);
            Err(EngineError::Timeout(timeout))
        }
    }
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartographer::feed::demo_rates;
    use std::collections::HashMap;

    fn settings(algorithm: Algorithm) -> AlgorithmSettings {
        AlgorithmSettings {
            max_iterations: 100,
            min_profit_threshold: 0.0,
            max_path_length: 6,
            algorithm,
            ..Default::default()
        }
    }

    const BOTH: [Algorithm; 2] = [Algorithm::BellmanFord, Algorithm::FloydWarshall];

    fn triangle() -> Vec<ExchangeRate> {
        vec![
            ExchangeRate::new("USD", "EUR", 0.851),
            ExchangeRate::new("EUR", "GBP", 0.901),
            ExchangeRate::new("GBP", "USD", 1.349),
        ]
    }

    /// Every quote derived from one set of mid prices, minus a spread
    fn consistent_rates() -> Vec<ExchangeRate> {
        let mids = [("USD", 1.0), ("EUR", 1.17), ("GBP", 1.35), ("JPY", 0.0067), ("CHF", 1.1)];
        let mut rates = Vec::new();
        for (from, from_mid) in mids {
            for (to, to_mid) in mids {
                if from != to {
                    rates.push(ExchangeRate::new(from, to, from_mid / to_mid * 0.999));
                }
            }
        }
        rates
    }

    /// Three currencies per block, spread on every quote, the first leg
    /// of each block boosted. The blocks never trade with each other.
    fn two_blocks() -> Vec<ExchangeRate> {
        let block = |names: [&str; 3], mids: [f64; 3], boost: f64| {
            let legs = [(0, 1), (1, 2), (2, 0), (1, 0), (2, 1), (0, 2)];
            legs.iter()
                .enumerate()
                .map(|(n, &(a, b))| {
                    let mut rate = mids[a] / mids[b] * 0.998;
                    if n == 0 {
                        rate *= boost;
                    }
                    ExchangeRate::new(names[a], names[b], rate)
                })
                .collect::<Vec<_>>()
        };

        let mut rates = block(["USD", "EUR", "GBP"], [1.0, 1.17, 1.35], 1.03);
        rates.extend(block(["JPY", "CHF", "CAD"], [0.0067, 1.1, 0.73], 1.02));
        rates
    }

    #[test]
    fn test_state_transitions() {
        use EngineState::*;
        assert!(Idle.can_advance_to(Validating));
        assert!(Validating.can_advance_to(Failed));
        assert!(GraphBuilt.can_advance_to(Failed));
        assert!(!Detecting.can_advance_to(Failed));
        assert!(!Idle.can_advance_to(Done));
        assert!(Done.is_terminal() && Failed.is_terminal());
        assert!(matches!(
            Evaluating.advance(Detecting),
            Err(EngineError::IllegalTransition { .. })
        ));
    }

    #[test]
    fn test_guaranteed_detection() {
        for algorithm in BOTH {
            let result = ArbitrageEngine::new(settings(algorithm)).detect(&triangle()).unwrap();

            assert_eq!(result.algorithm_used, algorithm);
            assert_eq!(result.total_opportunities, 1);
            let best = result.best_opportunity.unwrap();
            for currency in ["USD", "EUR", "GBP"] {
                assert!(best.contains(currency));
            }
            assert!(
                (best.profit_percentage - 3.46).abs() < 0.1,
                "{}: got {:.4}%",
                algorithm,
                best.profit_percentage
            );
        }
    }

    #[test]
    fn test_no_false_arbitrage() {
        for algorithm in BOTH {
            let result = ArbitrageEngine::new(settings(algorithm))
                .detect(&consistent_rates())
                .unwrap();
            assert!(result.cycles.is_empty(), "{} found {:?}", algorithm, result.canonical_keys());
            assert!(result.best_opportunity.is_none());
        }
    }

    #[test]
    fn test_determinism() {
        for algorithm in BOTH {
            let engine = ArbitrageEngine::new(settings(algorithm));
            let first = engine.detect(&two_blocks()).unwrap();
            let second = engine.detect(&two_blocks()).unwrap();

            assert_eq!(first.cycles, second.cycles);
            assert_eq!(first.best_opportunity, second.best_opportunity);
        }
    }

    #[test]
    fn test_threshold_monotonicity() {
        for algorithm in BOTH {
            let mut previous = usize::MAX;
            for threshold in [0.0, 0.001, 0.01, 0.02, 0.03, 0.1] {
                let settings = AlgorithmSettings {
                    min_profit_threshold: threshold,
                    ..settings(algorithm)
                };
                let count = ArbitrageEngine::new(settings)
                    .detect(&two_blocks())
                    .unwrap()
                    .total_opportunities;
                assert!(count <= previous, "{} at {}: {} > {}", algorithm, threshold, count, previous);
                previous = count;
            }
            assert_eq!(previous, 0);
        }
    }

    #[test]
    fn test_path_length_bound() {
        for algorithm in BOTH {
            for max_path_length in 2..=6 {
                let settings = AlgorithmSettings { max_path_length, ..settings(algorithm) };
                let result = ArbitrageEngine::new(settings).detect(&two_blocks()).unwrap();
                for cycle in &result.cycles {
                    assert!(cycle.currencies.len() >= 2);
                    assert!(cycle.currencies.len() <= max_path_length);
                }
            }
        }
    }

    #[test]
    fn test_rotations_reported_once() {
        // Bellman-Ford meets the same triangle from every start currency
        let result = ArbitrageEngine::new(settings(Algorithm::BellmanFord))
            .detect(&demo_rates())
            .unwrap();
        assert_eq!(result.total_opportunities, 1);
        assert_eq!(result.canonical_keys().into_iter().collect::<Vec<_>>(), vec!["EUR->GBP->USD"]);
    }

    #[test]
    fn test_round_trip_consistency() {
        let rates = two_blocks();
        let graph = RateGraph::from_rates(&rates).unwrap();
        let evaluator = CycleEvaluator::new(&graph);

        let mut by_key: HashMap<String, f64> = HashMap::new();
        for algorithm in BOTH {
            let result = ArbitrageEngine::new(settings(algorithm)).detect(&rates).unwrap();
            for cycle in result.cycles {
                let again = evaluator.evaluate(&cycle.currencies).unwrap();
                assert!((again.profit_percentage - cycle.profit_percentage).abs() < 1e-9);

                let key = canonical_key(&cycle.currencies);
                if let Some(seen) = by_key.insert(key, cycle.profit_percentage) {
                    assert!((seen - cycle.profit_percentage).abs() < 1e-9);
                }
            }
        }
    }

    #[test]
    fn test_algorithm_agreement() {
        let rates = two_blocks();
        let bf = ArbitrageEngine::new(settings(Algorithm::BellmanFord)).detect(&rates).unwrap();
        let fw = ArbitrageEngine::new(settings(Algorithm::FloydWarshall)).detect(&rates).unwrap();

        // The boosted leg of each block closes both a round trip and a
        // triangle. Floyd-Warshall reports all four; Bellman-Ford may keep
        // only one loop per block but never reports anything else.
        let expected: BTreeSet<String> = ["CAD->JPY->CHF", "CHF->JPY", "EUR->GBP->USD", "EUR->USD"]
            .iter()
            .map(|k| k.to_string())
            .collect();
        assert_eq!(fw.canonical_keys(), expected);
        assert!(!bf.canonical_keys().is_empty());
        assert!(bf.canonical_keys().is_subset(&fw.canonical_keys()));
    }

    #[test]
    fn test_algorithm_agreement_on_random_quotes() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let settings_for = |algorithm: Algorithm| AlgorithmSettings {
            max_path_length: 7,
            ..settings(algorithm)
        };
        let bellman_ford = ArbitrageEngine::new(settings_for(Algorithm::BellmanFord));
        let floyd_warshall = ArbitrageEngine::new(settings_for(Algorithm::FloydWarshall));

        let mut overlapping = 0;
        for seed in 0..60u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let n: usize = rng.gen_range(4..=7);
            let mids: Vec<f64> = (0..n).map(|_| rng.gen_range(0.01..100.0)).collect();

            let mut rates = Vec::new();
            for i in 0..n {
                for j in 0..n {
                    if i != j && rng.gen_bool(0.6) {
                        let noise = 1.0 + 0.01 * rng.gen_range(-1.0..1.0);
                        rates.push(ExchangeRate::new(
                            format!("C{:02}", i),
                            format!("C{:02}", j),
                            mids[i] / mids[j] * noise,
                        ));
                    }
                }
            }

            let (Ok(bf), Ok(fw)) = (bellman_ford.detect(&rates), floyd_warshall.detect(&rates)) else {
                continue;
            };
            let (bf_keys, fw_keys) = (bf.canonical_keys(), fw.canonical_keys());
            assert!(
                bf_keys.is_subset(&fw_keys),
                "seed {}: Bellman-Ford {:?} vs Floyd-Warshall {:?}",
                seed,
                bf_keys,
                fw_keys
            );
            if fw_keys.len() >= 2 {
                overlapping += 1;
            }
        }
        assert!(overlapping > 0);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        for algorithm in BOTH {
            let huge = AlgorithmSettings {
                max_path_length: usize::MAX,
                ..settings(algorithm)
            };
            assert!(matches!(
                ArbitrageEngine::new(huge).detect(&triangle()),
                Err(EngineError::InvalidSettings(_))
            ));

            let idle = AlgorithmSettings { max_iterations: 0, ..settings(algorithm) };
            assert!(matches!(
                ArbitrageEngine::new(idle).detect(&triangle()),
                Err(EngineError::InvalidSettings(_))
            ));
        }
    }

    #[test]
    fn test_validation_counting() {
        let mut rates = demo_rates();
        rates.extend([
            ExchangeRate::new("USD", "JPY", 150.0),
            ExchangeRate::new("JPY", "USD", 1.0 / 151.0),
            ExchangeRate::new("EUR", "JPY", 160.0),
        ]);
        rates.push(ExchangeRate::new("USD", "EUR", -1.0));

        let result = ArbitrageEngine::new(settings(Algorithm::FloydWarshall))
            .detect(&rates)
            .unwrap();
        assert_eq!(result.valid_rates, 9);
        assert_eq!(result.invalid_rates, 1);
    }

    #[test]
    fn test_insufficient_data() {
        let engine = ArbitrageEngine::new(settings(Algorithm::FloydWarshall));

        let all_bad = vec![
            ExchangeRate::new("USD", "EUR", f64::NAN),
            ExchangeRate::new("EUR", "EUR", 1.0),
        ];
        assert_eq!(
            engine.detect(&all_bad),
            Err(EngineError::InsufficientData { valid_rates: 0, invalid_rates: 2, currencies: 0 })
        );
        assert!(matches!(engine.detect(&[]), Err(EngineError::InsufficientData { .. })));

        let pair = vec![
            ExchangeRate::new("USD", "EUR", 0.92),
            ExchangeRate::new("EUR", "USD", 1.10),
            ExchangeRate::new("USD", "USD", 1.0),
        ];
        assert_eq!(
            engine.detect(&pair),
            Err(EngineError::InsufficientData { valid_rates: 2, invalid_rates: 1, currencies: 2 })
        );
    }

    #[test]
    fn test_no_start_currency_is_empty_not_error() {
        let settings = AlgorithmSettings {
            bellman_ford_start_currencies: vec!["XAU".into()],
            ..settings(Algorithm::BellmanFord)
        };
        let result = ArbitrageEngine::new(settings).detect(&triangle()).unwrap();
        assert!(!result.has_opportunities());
        assert!(result.best_opportunity.is_none());
    }

    #[test]
    fn test_input_is_not_mutated() {
        let rates = two_blocks();
        let before = rates.clone();
        ArbitrageEngine::new(settings(Algorithm::FloydWarshall)).detect(&rates).unwrap();
        assert_eq!(rates, before);
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let result = ArbitrageEngine::new(settings(Algorithm::FloydWarshall))
            .detect(&triangle())
            .unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["algorithmUsed"], "floyd-warshall");
        assert!(json["bestOpportunity"]["profitPercentage"].is_number());
        assert!(json["executionTimeMs"].is_number());
    }

    #[test]
    fn test_engine_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ArbitrageEngine>();
    }

    #[tokio::test]
    async fn test_run_with_timeout_completes() {
        let engine = Arc::new(ArbitrageEngine::new(settings(Algorithm::FloydWarshall)));
        let result = run_with_timeout(engine, triangle(), Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(result.total_opportunities, 1);
    }

    #[tokio::test]
    async fn test_run_with_timeout_expires() {
        let codes: Vec<String> = (0..150).map(|i| format!("C{:03}", i)).collect();
        let mut rates = Vec::new();
        for (i, from) in codes.iter().enumerate() {
            for (j, to) in codes.iter().enumerate() {
                if i != j {
                    rates.push(ExchangeRate::new(from.as_str(), to.as_str(), 0.999 + (i * j % 7) as f64 * 1e-4));
                }
            }
        }
        let engine = Arc::new(ArbitrageEngine::new(settings(Algorithm::FloydWarshall)));
        let outcome = run_with_timeout(engine, rates, Duration::from_nanos(1)).await;
        assert!(matches!(outcome, Err(EngineError::Timeout(_))));
    }

    #[test]
    fn test_run_with_timeout_from_sync_context() {
        let engine = Arc::new(ArbitrageEngine::new(settings(Algorithm::BellmanFord)));
        let result = tokio_test::block_on(run_with_timeout(
            engine,
            demo_rates(),
            Duration::from_secs(10),
        ))
        .unwrap();
        assert_eq!(result.algorithm_used, Algorithm::BellmanFord);
    }
}
