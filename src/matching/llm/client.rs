use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::LlmProvider;
use crate::{Error, Result};

use super::{anthropic, openai};

/// Chat message in the common provider-agnostic shape both backends
/// translate into their own wire format.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct LlmUsage {
    pub provider: LlmProvider,
    pub model: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub cost_usd: f64,
    pub timestamp: Instant,
}

/// Published per-1M-token input/output pricing in USD. Matched by
/// substring since model names carry date suffixes; falls back to the
/// provider's flagship-tier rate for unrecognized models.
fn price_per_million_tokens(provider: LlmProvider, model: &str) -> (f64, f64) {
    match provider {
        LlmProvider::Anthropic => {
            if model.contains("haiku") {
                (0.80, 4.00)
            } else if model.contains("opus") {
                (15.00, 75.00)
            } else {
                (3.00, 15.00)
            }
        }
        LlmProvider::OpenAi => {
            if model.contains("mini") {
                (0.15, 0.60)
            } else {
                (2.50, 10.00)
            }
        }
    }
}

fn calculate_cost(provider: LlmProvider, model: &str, prompt_tokens: u32, completion_tokens: u32) -> f64 {
    let (input_rate, output_rate) = price_per_million_tokens(provider, model);
    (f64::from(prompt_tokens) * input_rate + f64::from(completion_tokens) * output_rate) / 1_000_000.0
}

/// Token-bucket rate limiter: allows `max_requests` within a sliding
/// `window`, blocking the caller past that until the window advances.
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    requests: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self { max_requests, window, requests: Mutex::new(VecDeque::new()) }
    }

    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut requests = self.requests.lock();
                let cutoff = Instant::now() - self.window;
                while requests.front().is_some_and(|t| *t <= cutoff) {
                    requests.pop_front();
                }
                if requests.len() < self.max_requests {
                    requests.push_back(Instant::now());
                    None
                } else {
                    let oldest = *requests.front().expect("len >= max_requests > 0");
                    Some((oldest + self.window).saturating_duration_since(Instant::now()))
                }
            };

            match wait {
                None => return,
                Some(duration) if duration.is_zero() => continue,
                Some(duration) => {
                    debug!(wait_ms = duration.as_millis(), "rate_limit_waiting");
                    sleep(duration).await;
                }
            }
        }
    }
}

const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_MIN: Duration = Duration::from_secs(2);
const BACKOFF_MAX: Duration = Duration::from_secs(10);

/// Unified LLM client with an Anthropic primary and OpenAI fallback,
/// rate limiting and exponential-backoff retry per provider.
pub struct LlmClient {
    http: Client,
    anthropic_key: Option<String>,
    openai_key: Option<String>,
    anthropic_model: String,
    openai_model: String,
    primary: LlmProvider,
    enable_fallback: bool,
    anthropic_limiter: RateLimiter,
    openai_limiter: RateLimiter,
    usage_history: Mutex<Vec<LlmUsage>>,
}

impl LlmClient {
    #[must_use]
    pub fn new(
        http: Client,
        anthropic_key: Option<String>,
        openai_key: Option<String>,
        anthropic_model: String,
        openai_model: String,
        primary: LlmProvider,
        enable_fallback: bool,
    ) -> Self {
        Self {
            http,
            anthropic_key,
            openai_key,
            anthropic_model,
            openai_model,
            primary,
            enable_fallback,
            anthropic_limiter: RateLimiter::new(50, Duration::from_secs(60)),
            openai_limiter: RateLimiter::new(500, Duration::from_secs(60)),
            usage_history: Mutex::new(Vec::new()),
        }
    }

    async fn call_with_retry(&self, provider: LlmProvider, messages: &[ChatMessage], max_tokens: u32) -> Result<Value> {
        let mut delay = BACKOFF_MIN;
        let mut last_err = None;

        for attempt in 1..=MAX_ATTEMPTS {
            let result = self.call_once(provider, messages, max_tokens).await;
            match result {
                Ok(value) => return Ok(value),
                Err(err) => {
                    warn!(provider = %provider, attempt, error = %err, "llm_call_failed");
                    last_err = Some(err);
                    if attempt < MAX_ATTEMPTS {
                        sleep(delay).await;
                        delay = (delay * 2).min(BACKOFF_MAX);
                    }
                }
            }
        }

        Err(last_err.expect("loop runs at least once"))
    }

    async fn call_once(&self, provider: LlmProvider, messages: &[ChatMessage], max_tokens: u32) -> Result<Value> {
        match provider {
            LlmProvider::Anthropic => {
                self.anthropic_limiter.acquire().await;
                let key = self
                    .anthropic_key
                    .as_deref()
                    .ok_or_else(|| Error::MissingSecret("ANTHROPIC_API_KEY".into()))?;
                let (content, prompt_tokens, completion_tokens) =
                    anthropic::call(&self.http, key, &self.anthropic_model, messages, max_tokens).await?;
                self.record_usage(provider, self.anthropic_model.clone(), prompt_tokens, completion_tokens);
                Ok(content)
            }
            LlmProvider::OpenAi => {
                self.openai_limiter.acquire().await;
                let key = self
                    .openai_key
                    .as_deref()
                    .ok_or_else(|| Error::MissingSecret("OPENAI_API_KEY".into()))?;
                let (content, prompt_tokens, completion_tokens) =
                    openai::call(&self.http, key, &self.openai_model, messages, max_tokens).await?;
                self.record_usage(provider, self.openai_model.clone(), prompt_tokens, completion_tokens);
                Ok(content)
            }
        }
    }

    fn record_usage(&self, provider: LlmProvider, model: String, prompt_tokens: u32, completion_tokens: u32) {
        let cost_usd = calculate_cost(provider, &model, prompt_tokens, completion_tokens);
        info!(%provider, %model, prompt_tokens, completion_tokens, cost_usd, "llm_call_success");
        self.usage_history.lock().push(LlmUsage { provider, model, prompt_tokens, completion_tokens, cost_usd, timestamp: Instant::now() });
    }

    /// Completes `messages` against the primary provider, falling back to
    /// the secondary provider if the primary fails and fallback is enabled.
    pub async fn complete(&self, messages: &[ChatMessage], max_tokens: u32) -> Result<Value> {
        match self.call_with_retry(self.primary, messages, max_tokens).await {
            Ok(value) => Ok(value),
            Err(primary_err) => {
                if !self.enable_fallback {
                    return Err(primary_err);
                }

                let fallback = match self.primary {
                    LlmProvider::Anthropic => LlmProvider::OpenAi,
                    LlmProvider::OpenAi => LlmProvider::Anthropic,
                };

                info!(%fallback, "attempting_llm_fallback");
                match self.call_with_retry(fallback, messages, max_tokens).await {
                    Ok(value) => Ok(value),
                    Err(fallback_err) => {
                        error!(primary_error = %primary_err, fallback_error = %fallback_err, "llm_fallback_exhausted");
                        Err(primary_err)
                    }
                }
            }
        }
    }

    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.usage_history.lock().len()
    }

    /// Sum of `cost_usd` across every recorded call, for surfacing total
    /// LLM spend alongside match-validation throughput.
    #[must_use]
    pub fn total_cost(&self) -> f64 {
        self.usage_history.lock().iter().map(|usage| usage.cost_usd).sum()
    }
}
