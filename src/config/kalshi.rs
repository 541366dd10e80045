use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct KalshiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_demo_base_url")]
    pub demo_base_url: String,
    #[serde(default)]
    pub use_demo: bool,
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    #[serde(default = "default_token_refresh_slack_seconds")]
    pub token_refresh_slack_seconds: u64,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

fn default_base_url() -> String {
    "https://trading-api.kalshi.com/trade-api/v2".into()
}

fn default_demo_base_url() -> String {
    "https://demo-api.kalshi.co/trade-api/v2".into()
}

fn default_ws_url() -> String {
    "wss://trading-api.kalshi.com/trade-api/ws/v2".into()
}

const fn default_token_refresh_slack_seconds() -> u64 {
    60
}

const fn default_max_depth() -> usize {
    10
}

impl Default for KalshiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            demo_base_url: default_demo_base_url(),
            use_demo: false,
            ws_url: default_ws_url(),
            token_refresh_slack_seconds: default_token_refresh_slack_seconds(),
            max_depth: default_max_depth(),
        }
    }
}
