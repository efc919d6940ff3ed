//! REPRICER: Competitive catalog repricing against a price-comparison site
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod logging;
pub mod types;
pub mod catalog;
pub mod market;
pub mod engine;
