//! Phase 1: The Cartographer (Rate Ingest)
//!
//! Validates raw quotes and turns them into a graph the detectors can walk.

pub mod feed;
mod graph;
mod validator;

pub use graph::{merge_edge, EdgeData, RateGraph};
pub use validator::{RateValidator, ValidationReport};
