use serde::Deserialize;

/// Execution state machine tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u8,
    #[serde(default = "default_ingest_channel_capacity")]
    pub ingest_channel_capacity: usize,
    /// Latency budget from the start of an attempt to a settled hedge.
    /// Exceeding it cancels the primary leg rather than leaving it naked.
    #[serde(default = "default_hedge_completion_ms")]
    pub hedge_completion_ms: u64,
}

const fn default_max_attempts() -> u8 {
    2
}

const fn default_ingest_channel_capacity() -> usize {
    1024
}

const fn default_hedge_completion_ms() -> u64 {
    250
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            ingest_channel_capacity: default_ingest_channel_capacity(),
            hedge_completion_ms: default_hedge_completion_ms(),
        }
    }
}
