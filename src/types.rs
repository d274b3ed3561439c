//! Shared data types: input rates and evaluated cycles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Currency code, e.g. "USD".
pub type Currency = String;

/// Canonical form of a currency code ("usd " -> "USD")
pub fn normalize_currency(code: &str) -> Currency {
    code.trim().to_uppercase()
}

/// One directed quote: 1 unit of `from` converts to `rate` units of `to`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRate {
    pub from: Currency,
    pub to: Currency,
    pub rate: f64,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    /// Quoted volume available at this rate, if the feed reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

impl ExchangeRate {
    pub fn new(from: impl Into<Currency>, to: impl Into<Currency>, rate: f64) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            rate,
            timestamp: Utc::now(),
            volume: None,
        }
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }
}

/// A single leg of an evaluated cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateHop {
    pub from: Currency,
    pub to: Currency,
    pub rate: f64,
}

/// A profitable (or at least closed) conversion loop with real rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArbitrageCycle {
    /// Currencies in trade order, without the closing element
    pub currencies: Vec<Currency>,
    pub rates: Vec<RateHop>,
    /// Product of all rates around the loop
    pub profit: f64,
    pub profit_percentage: f64,
    /// Bottleneck volume across legs, 0 when any leg has no volume
    pub total_volume: f64,
}

impl ArbitrageCycle {
    pub fn hop_count(&self) -> usize {
        self.rates.len()
    }

    /// Human readable route, e.g. `USD → EUR → GBP → USD`
    pub fn route(&self) -> String {
        let mut parts: Vec<&str> = self.currencies.iter().map(String::as_str).collect();
        if let Some(first) = self.currencies.first() {
            parts.push(first);
        }
        parts.join(" → ")
    }

    pub fn contains(&self, currency: &str) -> bool {
        self.currencies.iter().any(|c| c == currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_currency() {
        assert_eq!(normalize_currency(" usd "), "USD");
        assert_eq!(normalize_currency("Eur"), "EUR");
        assert!(normalize_currency("   ").is_empty());
    }

    #[test]
    fn test_route_closes_loop() {
        let cycle = ArbitrageCycle {
            currencies: vec!["USD".into(), "EUR".into(), "GBP".into()],
            rates: vec![],
            profit: 1.0,
            profit_percentage: 0.0,
            total_volume: 0.0,
        };
        assert_eq!(cycle.route(), "USD → EUR → GBP → USD");
        assert!(cycle.contains("EUR"));
        assert!(!cycle.contains("JPY"));
    }

    #[test]
    fn test_rate_deserializes_without_timestamp() {
        let json = r#"{"from":"USD","to":"EUR","rate":0.9}"#;
        let rate: ExchangeRate = serde_json::from_str(json).unwrap();
        assert_eq!(rate.from, "USD");
        assert_eq!(rate.volume, None);
    }
}
