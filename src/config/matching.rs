use serde::Deserialize;

/// Tuning knobs for the candidate-generation -> hard-rules -> LLM
/// matching pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct MatchingConfig {
    #[serde(default = "default_min_jaccard")]
    pub min_jaccard: f64,
    #[serde(default = "default_min_llm_score")]
    pub min_llm_score: f64,
    #[serde(default = "default_time_window_tolerance_hours")]
    pub time_window_tolerance_hours: i64,
    /// Resolution-source pairs that are allowed to mismatch without
    /// failing hard-rules validation, e.g. two outlets both citing the
    /// same underlying data release under different names. Each entry is
    /// unordered: `(a, b)` also matches `(b, a)`.
    #[serde(default)]
    pub allowed_resolution_mismatches: Vec<(String, String)>,
}

fn default_min_jaccard() -> f64 {
    0.3
}

fn default_min_llm_score() -> f64 {
    0.85
}

const fn default_time_window_tolerance_hours() -> i64 {
    24
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            min_jaccard: default_min_jaccard(),
            min_llm_score: default_min_llm_score(),
            time_window_tolerance_hours: default_time_window_tolerance_hours(),
            allowed_resolution_mismatches: Vec::new(),
        }
    }
}
