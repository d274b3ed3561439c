//! Detection Configuration
//!
//! All knobs for a detection call live in one fully-populated struct.
//! Defaults are resolved here, never inside the detectors.

use eyre::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::types::{normalize_currency, Currency};

/// Upper bound on `max_path_length` accepted by `validate()`
pub const MAX_SUPPORTED_PATH_LENGTH: usize = 12;

// ============================================
// ALGORITHM
// ============================================

/// Which negative-cycle detector to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    /// Multi-source relaxation from a set of start currencies
    BellmanFord,

    /// All-pairs shortest paths over the dense matrix
    FloydWarshall,
}

impl Default for Algorithm {
    fn default() -> Self {
        Algorithm::FloydWarshall
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Algorithm::BellmanFord => write!(f, "bellman-ford"),
            Algorithm::FloydWarshall => write!(f, "floyd-warshall"),
        }
    }
}

impl FromStr for Algorithm {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "bellman-ford" | "bellmanford" | "bf" => Ok(Algorithm::BellmanFord),
            "floyd-warshall" | "floydwarshall" | "fw" => Ok(Algorithm::FloydWarshall),
            other => Err(eyre::eyre!("unknown algorithm '{}'", other)),
        }
    }
}

// ============================================
// SETTINGS
// ============================================

/// Settings for one detection call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AlgorithmSettings {
    /// Bellman-Ford relaxation passes. Results are only complete when this
    /// is at least `currencies - 1`.
    pub max_iterations: usize,

    /// Minimum profit as a fraction (0.001 = 0.1%), strictly exceeded
    pub min_profit_threshold: f64,

    /// Longest cycle (in hops) to report
    pub max_path_length: usize,

    /// Currencies the ingestion layer should keep (empty = all)
    pub selected_currencies: Vec<Currency>,

    pub algorithm: Algorithm,

    /// Bellman-Ford sources (empty = every currency with outgoing edges)
    pub bellman_ford_start_currencies: Vec<Currency>,
}

impl Default for AlgorithmSettings {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            min_profit_threshold: 0.001,
            max_path_length: 5,
            selected_currencies: vec![],
            algorithm: Algorithm::FloydWarshall,
            bellman_ford_start_currencies: vec![],
        }
    }
}

impl AlgorithmSettings {
    /// Load settings from environment variables and .env file
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        Ok(Self {
            max_iterations: env::var("ARB_MAX_ITERATIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_iterations),
            min_profit_threshold: env::var("ARB_MIN_PROFIT_THRESHOLD")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.min_profit_threshold),
            max_path_length: env::var("ARB_MAX_PATH_LENGTH")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_path_length),
            selected_currencies: env::var("ARB_SELECTED_CURRENCIES")
                .map(|s| parse_currency_list(&s))
                .unwrap_or_default(),
            algorithm: env::var("ARB_ALGORITHM")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.algorithm),
            bellman_ford_start_currencies: env::var("ARB_START_CURRENCIES")
                .map(|s| parse_currency_list(&s))
                .unwrap_or_default(),
        }
        .normalized())
    }

    /// Load settings from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let settings: Self = toml::from_str(&content)?;
        Ok(settings.normalized())
    }

    /// Save settings to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Upper-case and trim every currency code, dropping blanks
    pub fn normalized(mut self) -> Self {
        self.selected_currencies = normalize_list(&self.selected_currencies);
        self.bellman_ford_start_currencies = normalize_list(&self.bellman_ford_start_currencies);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(eyre::eyre!("max_iterations must be at least 1"));
        }
        if self.max_path_length < 2 {
            return Err(eyre::eyre!(
                "max_path_length must be at least 2 (currently {})",
                self.max_path_length
            ));
        }
        if self.max_path_length > MAX_SUPPORTED_PATH_LENGTH {
            return Err(eyre::eyre!(
                "max_path_length > {} is not supported (currently {})",
                MAX_SUPPORTED_PATH_LENGTH,
                self.max_path_length
            ));
        }
        if !self.min_profit_threshold.is_finite() || self.min_profit_threshold < 0.0 {
            return Err(eyre::eyre!(
                "min_profit_threshold must be a non-negative fraction (currently {})",
                self.min_profit_threshold
            ));
        }
        Ok(())
    }

    /// Minimum profit expressed in percent, as compared against cycles
    pub fn min_profit_percentage(&self) -> f64 {
        self.min_profit_threshold * 100.0
    }

    /// Print settings summary
    pub fn print_summary(&self) {
        let list = |items: &[Currency]| {
            if items.is_empty() {
                "all".to_string()
            } else {
                items.join(",")
            }
        };

        println!("╔════════════════════════════════════════════════════════════╗");
        println!("║              FX SNIPER - DETECTION SETTINGS                ║");
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ Algorithm:         {:^40} ║", self.algorithm);
        println!("║ Max Iterations:    {:^40} ║", self.max_iterations);
        println!("║ Max Path Length:   {:^40} ║", self.max_path_length);
        println!("║ Min Profit:        {:<39.4}% ║", self.min_profit_percentage());
        println!("║ Currencies:        {:^40} ║", list(&self.selected_currencies));
        println!("║ BF Start Set:      {:^40} ║", list(&self.bellman_ford_start_currencies));
        println!("╚════════════════════════════════════════════════════════════╝");
    }
}

fn parse_currency_list(s: &str) -> Vec<Currency> {
    s.split(',').map(String::from).collect()
}

fn normalize_list(items: &[Currency]) -> Vec<Currency> {
    items
        .iter()
        .map(|c| normalize_currency(c))
        .filter(|c| !c.is_empty())
        .collect()
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = AlgorithmSettings::default();
        assert_eq!(settings.algorithm, Algorithm::FloydWarshall);
        assert_eq!(settings.max_path_length, 5);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_algorithm_parsing() {
        assert_eq!("bellman-ford".parse::<Algorithm>().unwrap(), Algorithm::BellmanFord);
        assert_eq!("FLOYD_WARSHALL".parse::<Algorithm>().unwrap(), Algorithm::FloydWarshall);
        assert!("dijkstra".parse::<Algorithm>().is_err());
        assert_eq!(Algorithm::BellmanFord.to_string(), "bellman-ford");
    }

    #[test]
    fn test_validation_rejects_bad_bounds() {
        let mut settings = AlgorithmSettings { max_path_length: 1, ..Default::default() };
        assert!(settings.validate().is_err());

        settings.max_path_length = 4;
        settings.max_iterations = 0;
        assert!(settings.validate().is_err());

        settings.max_iterations = 10;
        settings.min_profit_threshold = f64::NAN;
        assert!(settings.validate().is_err());

        settings.min_profit_threshold = -0.1;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip_with_partial_file() {
        let toml_src = r#"
            maxPathLength = 3
            algorithm = "bellman-ford"
            bellmanFordStartCurrencies = ["usd", " eur "]
        "#;
        let settings: AlgorithmSettings = toml::from_str(toml_src).unwrap();
        let settings = settings.normalized();

        assert_eq!(settings.max_path_length, 3);
        assert_eq!(settings.algorithm, Algorithm::BellmanFord);
        assert_eq!(settings.bellman_ford_start_currencies, vec!["USD", "EUR"]);
        assert_eq!(settings.max_iterations, 100);

        let path = std::env::temp_dir().join(format!("fx-sniper-{}.toml", std::process::id()));
        settings.save_to_file(&path).unwrap();
        let loaded = AlgorithmSettings::from_file(&path).unwrap();
        fs::remove_file(&path).ok();
        assert_eq!(loaded, settings);
    }
}
