//! Application configuration loading and validation.
//!
//! Configuration is loaded from a TOML file with environment variable
//! overrides for secrets, mirroring the teacher's layered config module.

mod execution;
mod kalshi;
mod llm;
mod logging;
mod matching;
mod polymarket;
mod risk;
mod secrets;
mod signal;

pub use execution::ExecutionConfig;
pub use kalshi::KalshiConfig;
pub use llm::{LlmConfig, LlmProvider};
pub use logging::LoggingConfig;
pub use matching::MatchingConfig;
pub use polymarket::PolymarketConfig;
pub use risk::RiskConfig;
pub use secrets::{SecretsConfig, SecretsLoader};
pub use signal::SignalConfig;

use serde::Deserialize;

use crate::error::Error;

/// Main application configuration.
#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub polymarket: PolymarketConfig,
    #[serde(default)]
    pub kalshi: KalshiConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub signal: SignalConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub secrets: SecretsConfig,
    /// Venues/services this process should run; lets `cli check` and
    /// operators disable a leg without redeploying.
    #[serde(default = "default_enabled_services")]
    pub enabled_services: Vec<String>,
    /// Filesystem paths to friction pack overrides, applied in order.
    #[serde(default)]
    pub friction_pack_paths: Vec<String>,
    #[serde(default = "default_database_path")]
    pub database: String,
}

fn default_enabled_services() -> Vec<String> {
    vec!["polymarket".into(), "kalshi".into()]
}

fn default_database_path() -> String {
    "edgelord-arb.db".into()
}

impl Config {
    pub fn load(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> crate::Result<()> {
        if self.risk.venue_cap_usd <= rust_decimal::Decimal::ZERO {
            return Err(Error::Config("risk.venue_cap_usd must be greater than 0".into()));
        }
        if self.risk.per_contract_limit_usd <= rust_decimal::Decimal::ZERO {
            return Err(Error::Config("risk.per_contract_limit_usd must be greater than 0".into()));
        }
        if self.risk.concurrent_pairs == 0 {
            return Err(Error::Config("risk.concurrent_pairs must be greater than 0".into()));
        }
        Ok(())
    }
}
