//! LLM-backed final similarity check for candidate market pairs.

mod anthropic;
mod client;
mod openai;
mod validator;

pub use client::{LlmClient, LlmUsage, RateLimiter};
pub use validator::{FieldMatches, LlmValidator, SimilarityResult};

