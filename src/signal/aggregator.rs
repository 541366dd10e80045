use chrono::Utc;

use crate::domain::{BookSnapshot, EdgeSignal, MarketPair, OrderSide, Venue};

use super::{DepthModel, FrictionModel};

/// Combines gross edge, friction, and slippage into a final [`EdgeSignal`],
/// gating on minimum hedge probability.
pub struct SignalAggregator {
    friction: FrictionModel,
    depth: DepthModel,
    min_hedge_probability: f64,
}

impl Default for SignalAggregator {
    fn default() -> Self {
        Self { friction: FrictionModel::default(), depth: DepthModel::default(), min_hedge_probability: 0.6 }
    }
}

impl SignalAggregator {
    #[must_use]
    pub fn new(friction: FrictionModel, depth: DepthModel, min_hedge_probability: f64) -> Self {
        Self { friction, depth, min_hedge_probability }
    }

    /// Computes a net edge signal for a pair given the gross edge (in
    /// cents, before costs) and the current books for both legs. Returns
    /// `None` when hedge probability falls below the configured gate.
    ///
    /// `leader`/`leader_stable` come from the lead-lag analyzer's most
    /// recent read on this pair and are carried through unchanged so
    /// downstream persistence and review tooling can see which venue
    /// moves first.
    #[allow(clippy::too_many_arguments)]
    pub fn compute(
        &self,
        pair: &MarketPair,
        gross_edge_cents: f64,
        size_usd: f64,
        primary_book: &BookSnapshot,
        hedge_book: &BookSnapshot,
        hedge_probability: f64,
        recommended_primary_side: OrderSide,
        leader: Option<Venue>,
        leader_stable: bool,
    ) -> Option<EdgeSignal> {
        if hedge_probability < self.min_hedge_probability {
            return None;
        }

        let friction_cents = self.friction.total_cost_cents(pair, size_usd);
        let slippage_cents = self.depth.expected_slippage_cents(pair, size_usd, Some(primary_book), Some(hedge_book));
        let net_edge_cents = gross_edge_cents - friction_cents - slippage_cents;

        let confidence = (hedge_probability * (net_edge_cents.max(0.0) / (gross_edge_cents.abs().max(1.0)))).clamp(0.0, 1.0);

        Some(EdgeSignal {
            pair_id: pair.pair_id.clone(),
            primary: pair.market_a.clone(),
            hedge: pair.market_b.clone(),
            timestamp: Utc::now(),
            gross_edge_cents,
            friction_cents,
            net_edge_cents,
            expected_slippage_cents: slippage_cents,
            confidence,
            recommended_primary_side,
            hedge_probability,
            leader,
            leader_stable,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BookLevel, MarketRef, Venue};
    use rust_decimal_macros::dec;

    fn book() -> BookSnapshot {
        BookSnapshot {
            market: MarketRef::new(Venue::Polymarket, "1", "a"),
            timestamp: Utc::now(),
            bids: vec![BookLevel { price: dec!(0.45), size: dec!(500) }],
            asks: vec![BookLevel { price: dec!(0.46), size: dec!(500) }],
        }
    }

    #[test]
    fn gates_on_hedge_probability() {
        let aggregator = SignalAggregator::default();
        let pair = MarketPair::new(
            "p1",
            MarketRef::new(Venue::Polymarket, "1", "a"),
            MarketRef::new(Venue::Kalshi, "2", "b"),
            1.0,
        );
        let result = aggregator.compute(&pair, 500.0, 100.0, &book(), &book(), 0.2, OrderSide::Buy, None, false);
        assert!(result.is_none());
    }

    #[test]
    fn computes_net_edge_below_gross() {
        let aggregator = SignalAggregator::default();
        let pair = MarketPair::new(
            "p1",
            MarketRef::new(Venue::Polymarket, "1", "a"),
            MarketRef::new(Venue::Kalshi, "2", "b"),
            1.0,
        );
        let signal = aggregator.compute(&pair, 500.0, 100.0, &book(), &book(), 0.9, OrderSide::Buy, Some(Venue::Polymarket), true).unwrap();
        assert!(signal.net_edge_cents < 500.0);
        assert_eq!(signal.gross_edge_cents, 500.0);
        assert!(signal.friction_cents > 0.0);
        assert_eq!(signal.leader, Some(Venue::Polymarket));
        assert!(signal.leader_stable);
    }
}
