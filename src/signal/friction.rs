use tracing::debug;

use crate::domain::{MarketPair, Venue};

/// Rough estimate of the profit margin a winning leg captures, used only
/// to approximate the profit fee owed on Polymarket. Driving this from
/// the pair's actual computed edge instead of a fixed assumption is a
/// follow-up, not part of this build.
const ASSUMED_PROFIT_SPREAD_CENTS: f64 = 2.5;

#[derive(Debug, Clone, Copy)]
pub struct VenueFees {
    pub taker_fee_pct: f64,
    pub maker_fee_pct: f64,
    pub profit_fee_pct: f64,
    pub min_fee: f64,
}

/// Friction costs beyond exchange fees: gas, cross-chain bridging,
/// fiat on-ramp, and FX spread.
#[derive(Debug, Clone, Copy)]
pub struct FrictionPack {
    pub gas_cost_usd: f64,
    pub bridge_cost_usd: f64,
    pub onramp_fee_pct: f64,
    pub fx_spread_pct: f64,
    pub version_hash: &'static str,
}

impl Default for FrictionPack {
    fn default() -> Self {
        Self {
            gas_cost_usd: 2.0,
            bridge_cost_usd: 5.0,
            onramp_fee_pct: 0.005,
            fx_spread_pct: 0.001,
            version_hash: "v1",
        }
    }
}

pub trait VenueFeeCalculator {
    fn calculate_taker_fee(&self, notional: f64) -> f64;
    fn calculate_profit_fee(&self, profit: f64) -> f64;
}

#[derive(Debug, Clone, Copy)]
pub struct PolymarketFeeCalculator {
    pub fees: VenueFees,
}

impl Default for PolymarketFeeCalculator {
    fn default() -> Self {
        Self {
            fees: VenueFees {
                taker_fee_pct: 0.02,
                maker_fee_pct: 0.0,
                profit_fee_pct: 0.02,
                min_fee: 0.0,
            },
        }
    }
}

impl VenueFeeCalculator for PolymarketFeeCalculator {
    fn calculate_taker_fee(&self, notional: f64) -> f64 {
        notional * self.fees.taker_fee_pct
    }

    fn calculate_profit_fee(&self, profit: f64) -> f64 {
        if profit <= 0.0 {
            return 0.0;
        }
        profit * self.fees.profit_fee_pct
    }
}

#[derive(Debug, Clone, Copy)]
pub struct KalshiFeeCalculator {
    pub fees: VenueFees,
}

impl Default for KalshiFeeCalculator {
    fn default() -> Self {
        Self {
            fees: VenueFees {
                taker_fee_pct: 0.007,
                maker_fee_pct: 0.0,
                profit_fee_pct: 0.0,
                min_fee: 0.0,
            },
        }
    }
}

impl VenueFeeCalculator for KalshiFeeCalculator {
    fn calculate_taker_fee(&self, notional: f64) -> f64 {
        notional * self.fees.taker_fee_pct
    }

    fn calculate_profit_fee(&self, _profit: f64) -> f64 {
        0.0
    }
}

/// Calculates total friction cost for a hedged pair trade: exchange fees
/// on both legs plus gas/bridge/onramp/FX costs.
pub struct FrictionModel {
    poly_calc: PolymarketFeeCalculator,
    kalshi_calc: KalshiFeeCalculator,
    friction_pack: FrictionPack,
}

impl Default for FrictionModel {
    fn default() -> Self {
        Self {
            poly_calc: PolymarketFeeCalculator::default(),
            kalshi_calc: KalshiFeeCalculator::default(),
            friction_pack: FrictionPack::default(),
        }
    }
}

impl FrictionModel {
    #[must_use]
    pub fn new(poly_calc: PolymarketFeeCalculator, kalshi_calc: KalshiFeeCalculator, friction_pack: FrictionPack) -> Self {
        Self { poly_calc, kalshi_calc, friction_pack }
    }

    /// Total friction cost in cents for a pair trade of `size_usd` per side.
    pub fn total_cost_cents(&self, pair: &MarketPair, size_usd: f64) -> f64 {
        let (primary_venue, hedge_venue) = pair.venues();

        let (primary_taker_fee, primary_profit_fee) = match primary_venue {
            Venue::Polymarket => (
                self.poly_calc.calculate_taker_fee(size_usd),
                self.poly_calc
                    .calculate_profit_fee(size_usd * ASSUMED_PROFIT_SPREAD_CENTS / 100.0),
            ),
            Venue::Kalshi => (self.kalshi_calc.calculate_taker_fee(size_usd), 0.0),
        };

        let (hedge_taker_fee, hedge_profit_fee) = match hedge_venue {
            Venue::Kalshi => (self.kalshi_calc.calculate_taker_fee(size_usd), 0.0),
            Venue::Polymarket => (
                self.poly_calc.calculate_taker_fee(size_usd),
                self.poly_calc
                    .calculate_profit_fee(size_usd * ASSUMED_PROFIT_SPREAD_CENTS / 100.0),
            ),
        };

        let exchange_fees = primary_taker_fee + hedge_taker_fee + primary_profit_fee + hedge_profit_fee;

        let gas_cost = self.friction_pack.gas_cost_usd * 2.0;
        let bridge_cost = if primary_venue == Venue::Polymarket {
            self.friction_pack.bridge_cost_usd
        } else {
            0.0
        };
        let onramp_cost = size_usd * self.friction_pack.onramp_fee_pct;
        let fx_cost = size_usd * self.friction_pack.fx_spread_pct;

        let total_usd = exchange_fees + gas_cost + bridge_cost + onramp_cost + fx_cost;

        debug!(
            exchange = exchange_fees,
            gas = gas_cost,
            bridge = bridge_cost,
            onramp = onramp_cost,
            fx = fx_cost,
            total_cents = total_usd * 100.0,
            "friction_breakdown"
        );

        total_usd * 100.0
    }
}
