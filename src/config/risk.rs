use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

/// Hard risk limits enforced before an intent reaches execution.
#[derive(Debug, Clone, Deserialize)]
pub struct RiskConfig {
    #[serde(default = "default_venue_cap")]
    pub venue_cap_usd: Decimal,
    #[serde(default = "default_per_contract_limit")]
    pub per_contract_limit_usd: Decimal,
    #[serde(default = "default_concurrent_pairs")]
    pub concurrent_pairs: usize,
}

fn default_venue_cap() -> Decimal {
    dec!(5000)
}

fn default_per_contract_limit() -> Decimal {
    dec!(250)
}

const fn default_concurrent_pairs() -> usize {
    5
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            venue_cap_usd: default_venue_cap(),
            per_contract_limit_usd: default_per_contract_limit(),
            concurrent_pairs: default_concurrent_pairs(),
        }
    }
}
