use serde::Deserialize;
use tracing::warn;

use crate::domain::Market;

use super::client::{ChatMessage, LlmClient};

/// Per-field agreement breakdown the LLM is asked to report alongside
/// its overall similarity score.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FieldMatches {
    #[serde(default)]
    pub time_window: bool,
    #[serde(default)]
    pub outcome_definition: bool,
    #[serde(default)]
    pub resolution_source: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimilarityResult {
    #[serde(default)]
    pub similarity: f64,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub field_matches: FieldMatches,
}

fn build_prompt(market_a: &Market, market_b: &Market) -> String {
    format!(
        "Compare these two prediction-market contracts and judge whether they resolve on the \
         same underlying event. Respond with strict JSON only, matching this shape exactly: \
         {{\"similarity\": <0.0-1.0>, \"explanation\": <string>, \"field_matches\": \
         {{\"time_window\": <bool>, \"outcome_definition\": <bool>, \"resolution_source\": <bool>}}}}.\n\n\
         Market A ({venue_a}): \"{title_a}\" — resolves via {source_a}, closes {closes_a}.\n\
         Market B ({venue_b}): \"{title_b}\" — resolves via {source_b}, closes {closes_b}.",
        venue_a = market_a.venue(),
        title_a = market_a.title,
        source_a = market_a.resolution_source,
        closes_a = market_a.closes_at.to_rfc3339(),
        venue_b = market_b.venue(),
        title_b = market_b.title,
        source_b = market_b.resolution_source,
        closes_b = market_b.closes_at.to_rfc3339(),
    )
}

/// Final similarity gate applied to pairs that already passed blocking
/// and hard-rules validation. Falls back to a conservative `similarity =
/// 0.0` verdict if the LLM call fails entirely, rather than letting an
/// unvalidated pair through.
pub struct LlmValidator {
    client: LlmClient,
    min_score: f64,
}

impl LlmValidator {
    #[must_use]
    pub fn new(client: LlmClient, min_score: f64) -> Self {
        Self { client, min_score }
    }

    /// Scores a candidate pair's similarity via the LLM, returning
    /// `passed = similarity >= min_score`. Never errors: an LLM outage
    /// produces a failed result rather than propagating.
    pub async fn validate(&self, market_a: &Market, market_b: &Market) -> (SimilarityResult, bool) {
        let prompt = build_prompt(market_a, market_b);
        let messages = [ChatMessage { role: "user", content: prompt }];

        let result = match self.client.complete(&messages, 500).await {
            Ok(value) => serde_json::from_value(value).unwrap_or_else(|err| {
                warn!(error = %err, "llm_response_unparseable");
                SimilarityResult { similarity: 0.0, explanation: "unparseable LLM response".into(), field_matches: FieldMatches::default() }
            }),
            Err(err) => {
                warn!(error = %err, "llm_validation_failed");
                SimilarityResult { similarity: 0.0, explanation: format!("LLM call failed: {err}"), field_matches: FieldMatches::default() }
            }
        };

        let passed = result.similarity >= self.min_score;
        (result, passed)
    }
}
