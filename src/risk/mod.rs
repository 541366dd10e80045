//! Portfolio and venue risk limits enforced before an intent reaches
//! the execution engine.

mod manager;

pub use manager::{InMemoryRiskStore, RiskManager, RiskStore};
