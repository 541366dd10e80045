use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct PolymarketConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    #[serde(default = "default_verifying_contract")]
    pub verifying_contract: String,
    #[serde(default = "default_max_order_expiry_seconds")]
    pub max_order_expiry_seconds: u64,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

fn default_base_url() -> String {
    "https://clob.polymarket.com".into()
}

fn default_ws_url() -> String {
    "wss://ws-subscriptions-clob.polymarket.com/ws/market".into()
}

const fn default_chain_id() -> u64 {
    137
}

fn default_verifying_contract() -> String {
    "0x4bFb41d5B3570DeFd03C39a9A4D8dE6Bd8B8982E".into()
}

const fn default_max_order_expiry_seconds() -> u64 {
    120
}

const fn default_max_depth() -> usize {
    10
}

impl Default for PolymarketConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            ws_url: default_ws_url(),
            chain_id: default_chain_id(),
            verifying_contract: default_verifying_contract(),
            max_order_expiry_seconds: default_max_order_expiry_seconds(),
            max_depth: default_max_depth(),
        }
    }
}
