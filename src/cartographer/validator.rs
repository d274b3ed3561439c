//! Rate Validation
//!
//! Step 1.1: The Gatekeeper
//!
//! Drops quotes that would poison the log-weight graph (NaN, zero,
//! negative, self-loops, blank currencies) and counts what it dropped.

use std::collections::HashMap;
use tracing::{debug, warn};

use crate::error::RateRejection;
use crate::types::ExchangeRate;

/// Outcome of validating one batch of rates
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// Rates that passed every check, in input order
    pub valid: Vec<ExchangeRate>,

    /// Number of rejected entries
    pub invalid_count: usize,

    /// Rejections broken down by reason
    pub rejections: HashMap<RateRejection, usize>,
}

impl ValidationReport {
    pub fn valid_count(&self) -> usize {
        self.valid.len()
    }

    pub fn rejected_for(&self, reason: RateRejection) -> usize {
        self.rejections.get(&reason).copied().unwrap_or(0)
    }
}

/// Stateless rate validator
#[derive(Debug, Clone, Copy, Default)]
pub struct RateValidator;

impl RateValidator {
    pub fn new() -> Self {
        Self
    }

    /// Check a single rate
    pub fn check(&self, rate: &ExchangeRate) -> Result<(), RateRejection> {
        if rate.from.trim().is_empty() || rate.to.trim().is_empty() {
            return Err(RateRejection::MissingEndpoint);
        }
        if rate.from == rate.to {
            return Err(RateRejection::SelfLoop);
        }
        if !rate.rate.is_finite() {
            return Err(RateRejection::NonFinite);
        }
        if rate.rate <= 0.0 {
            return Err(RateRejection::NonPositive);
        }
        Ok(())
    }

    /// Validate a batch. The input is never modified; valid entries are cloned.
    pub fn validate(&self, rates: &[ExchangeRate]) -> ValidationReport {
        let mut report = ValidationReport::default();

        for rate in rates {
            match self.check(rate) {
                Ok(()) => report.valid.push(rate.clone()),
                Err(reason) => {
                    debug!("Rejected {} -> {} ({}): {}", rate.from, rate.to, rate.rate, reason);
                    report.invalid_count += 1;
                    *report.rejections.entry(reason).or_insert(0) += 1;
                }
            }
        }

        if report.invalid_count > 0 {
            warn!(
                "Skipped {} of {} rates that failed validation",
                report.invalid_count,
                rates.len()
            );
        }

        report
    }
}
