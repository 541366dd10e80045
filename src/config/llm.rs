use serde::Deserialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Anthropic,
    OpenAi,
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anthropic => write!(f, "anthropic"),
            Self::OpenAi => write!(f, "openai"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub primary: LlmProvider,
    #[serde(default = "default_fallback")]
    pub fallback: LlmProvider,
    #[serde(default = "default_anthropic_model")]
    pub anthropic_model: String,
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_fallback() -> LlmProvider {
    LlmProvider::OpenAi
}

fn default_anthropic_model() -> String {
    "claude-3-5-haiku-latest".into()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".into()
}

const fn default_requests_per_minute() -> u32 {
    50
}

const fn default_max_retries() -> u32 {
    3
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            primary: LlmProvider::default(),
            fallback: default_fallback(),
            anthropic_model: default_anthropic_model(),
            openai_model: default_openai_model(),
            requests_per_minute: default_requests_per_minute(),
            max_retries: default_max_retries(),
        }
    }
}
