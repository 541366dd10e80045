//! Candidate generation, hard-rules validation, and LLM-based similarity
//! ranking that together narrow raw cross-venue market listings down to
//! validated [`MarketPair`](crate::domain::MarketPair)s.

mod blocking;
pub mod llm;
mod rules;

pub use blocking::{BlockingKey, CandidateGenerator};
pub use rules::{HardRulesValidator, ValidationResult};
