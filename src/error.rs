//! Error types for the detection engine.

use std::time::Duration;
use thiserror::Error;

/// Fatal errors returned by a detection call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The input could never contain an arbitrage cycle.
    #[error(
        "insufficient data: {valid_rates} valid rates ({invalid_rates} rejected), {currencies} currencies"
    )]
    InsufficientData {
        valid_rates: usize,
        invalid_rates: usize,
        currencies: usize,
    },

    /// Settings that would make detection meaningless or unsafe.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// The caller-side time box expired before detection finished.
    #[error("detection timed out after {0:?}")]
    Timeout(Duration),

    /// The blocking detection task panicked or was cancelled.
    #[error("detection task failed: {0}")]
    Join(String),

    /// Internal state machine was driven out of order.
    #[error("illegal engine transition {from} -> {to}")]
    IllegalTransition { from: String, to: String },
}

/// Why a single rate was skipped during validation.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateRejection {
    #[error("rate is NaN or infinite")]
    NonFinite,

    #[error("rate is zero or negative")]
    NonPositive,

    #[error("rate converts a currency into itself")]
    SelfLoop,

    #[error("rate has an empty endpoint")]
    MissingEndpoint,
}
