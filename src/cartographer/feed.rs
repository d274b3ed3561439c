//! Rate feed helpers for the ingestion side.
//!
//! The engine only sees what it is handed; currency selection and file
//! loading happen here, before `detect()` is called.

use eyre::{Result, WrapErr};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::types::{normalize_currency, Currency, ExchangeRate};

/// Load a JSON array of rates from disk, normalizing currency codes.
pub fn load_rates<P: AsRef<Path>>(path: P) -> Result<Vec<ExchangeRate>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read rates from {}", path.display()))?;
    let mut rates: Vec<ExchangeRate> = serde_json::from_str(&content)
        .wrap_err_with(|| format!("failed to parse rates in {}", path.display()))?;

    for rate in &mut rates {
        rate.from = normalize_currency(&rate.from);
        rate.to = normalize_currency(&rate.to);
    }

    info!("Loaded {} rates from {}", rates.len(), path.display());
    Ok(rates)
}

/// Keep only rates whose endpoints are both selected.
///
/// An empty selection keeps everything.
pub fn select_currencies(rates: &[ExchangeRate], selected: &[Currency]) -> Vec<ExchangeRate> {
    if selected.is_empty() {
        return rates.to_vec();
    }
    let selected: HashSet<Currency> = selected.iter().map(|c| normalize_currency(c)).collect();
    rates
        .iter()
        .filter(|r| selected.contains(&r.from) && selected.contains(&r.to))
        .cloned()
        .collect()
}

/// USD/EUR/GBP quotes with a ~3.46% triangular opportunity baked in
pub fn demo_rates() -> Vec<ExchangeRate> {
    vec![
        ExchangeRate::new("USD", "EUR", 0.851),
        ExchangeRate::new("EUR", "USD", 1.0 / 0.853),
        ExchangeRate::new("EUR", "GBP", 0.901),
        ExchangeRate::new("GBP", "EUR", 1.0 / 0.903),
        ExchangeRate::new("GBP", "USD", 1.349),
        ExchangeRate::new("USD", "GBP", 1.0 / 1.351),
    ]
}
