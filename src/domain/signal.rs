use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{MarketRef, Venue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }
}

/// Signal emitted when a mispricing opportunity is detected between the
/// two legs of a [`MarketPair`](super::MarketPair).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeSignal {
    pub pair_id: String,
    pub primary: MarketRef,
    pub hedge: MarketRef,
    pub timestamp: DateTime<Utc>,
    /// Raw cross-venue price gap before friction is subtracted.
    pub gross_edge_cents: f64,
    /// Fees plus assumed profit spread, subtracted from `gross_edge_cents`
    /// to arrive at `net_edge_cents`.
    pub friction_cents: f64,
    pub net_edge_cents: f64,
    pub expected_slippage_cents: f64,
    pub confidence: f64,
    pub recommended_primary_side: OrderSide,
    pub hedge_probability: f64,
    /// Venue whose price moves first, per lead-lag analysis, if any.
    pub leader: Option<Venue>,
    /// Whether `leader` has held for at least 3 of the last 4 analysis
    /// windows.
    pub leader_stable: bool,
}

impl EdgeSignal {
    #[must_use]
    pub fn is_actionable(&self, min_edge_cents: f64, min_confidence: f64) -> bool {
        self.net_edge_cents >= min_edge_cents && self.confidence >= min_confidence
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Venue;

    fn sample() -> EdgeSignal {
        EdgeSignal {
            pair_id: "p1".into(),
            primary: MarketRef::new(Venue::Polymarket, "1", "a"),
            hedge: MarketRef::new(Venue::Kalshi, "2", "b"),
            timestamp: Utc::now(),
            gross_edge_cents: 3.8,
            friction_cents: 0.8,
            net_edge_cents: 3.0,
            expected_slippage_cents: 0.5,
            confidence: 0.8,
            recommended_primary_side: OrderSide::Buy,
            hedge_probability: 0.9,
            leader: Some(Venue::Polymarket),
            leader_stable: true,
        }
    }

    #[test]
    fn actionable_requires_both_thresholds() {
        let signal = sample();
        assert!(signal.is_actionable(2.0, 0.7));
        assert!(!signal.is_actionable(5.0, 0.7));
        assert!(!signal.is_actionable(2.0, 0.95));
    }

    #[test]
    fn opposite_side_flips() {
        assert_eq!(OrderSide::Buy.opposite(), OrderSide::Sell);
        assert_eq!(OrderSide::Sell.opposite(), OrderSide::Buy);
    }
}
