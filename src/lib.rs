//! Cross-venue arbitrage engine for binary prediction markets: ingests
//! order books from Polymarket and Kalshi, matches markets that resolve
//! on the same underlying event, and executes hedged pairs under a
//! strict no-legging policy.

pub mod backtest;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod execution;
pub mod ingest;
pub mod matching;
pub mod persistence;
pub mod risk;
pub mod signal;

pub use error::{Error, Result};
