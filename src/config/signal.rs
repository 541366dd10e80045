use serde::Deserialize;

/// Thresholds the signal aggregator gates on before an edge becomes a
/// tradeable [`EdgeSignal`](crate::domain::EdgeSignal).
#[derive(Debug, Clone, Deserialize)]
pub struct SignalConfig {
    #[serde(default = "default_min_edge_cents")]
    pub min_edge_cents: f64,
    #[serde(default = "default_min_hedge_probability")]
    pub min_hedge_probability: f64,
    #[serde(default = "default_trade_size_usd")]
    pub trade_size_usd: f64,
    #[serde(default = "default_depth_levels")]
    pub depth_levels: usize,
}

fn default_min_edge_cents() -> f64 {
    2.5
}

fn default_min_hedge_probability() -> f64 {
    0.99
}

fn default_trade_size_usd() -> f64 {
    100.0
}

const fn default_depth_levels() -> usize {
    3
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            min_edge_cents: default_min_edge_cents(),
            min_hedge_probability: default_min_hedge_probability(),
            trade_size_usd: default_trade_size_usd(),
            depth_levels: default_depth_levels(),
        }
    }
}
