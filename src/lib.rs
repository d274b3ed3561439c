//! FX Sniper - Currency Arbitrage Cycle Detection
//!
//! Phase 1: The Cartographer - validates rates and builds the graph
//! Phase 2: The Brain - finds negative cycles and ranks them
//! Phase 3: The Engine - wires it all together per detection call

pub mod brain;
pub mod cartographer;
pub mod config;
pub mod engine;
pub mod error;
pub mod types;

pub use config::{Algorithm, AlgorithmSettings};
pub use engine::{run_with_timeout, ArbitrageEngine, ArbitrageResult, EngineState};
pub use error::{EngineError, RateRejection};
pub use types::{ArbitrageCycle, Currency, ExchangeRate, RateHop};
