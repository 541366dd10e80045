use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{EdgeSignal, MarketRef, OrderSide};

/// Lifecycle states of an [`ExecutionIntent`] as it moves through the
/// state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionState {
    Ready,
    PrimaryPlaced,
    HedgePlaced,
    Settled,
    Failed,
}

/// Decision event carrying the desired execution parameters for a pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionIntent {
    pub intent_id: Uuid,
    pub edge: EdgeSignal,
    pub max_notional: Decimal,
    pub hedge_probability: f64,
    pub state: ExecutionState,
    pub attempts: u8,
    /// Concrete primary-leg order, populated once the book-derived price
    /// is known. `None` until the aggregator threads one through.
    pub primary_order: Option<OrderIntent>,
    /// Concrete hedge-leg order, populated alongside `primary_order`.
    pub hedge_order: Option<OrderIntent>,
    pub created_at: DateTime<Utc>,
}

impl ExecutionIntent {
    #[must_use]
    pub fn new(edge: EdgeSignal, max_notional: Decimal) -> Self {
        let hedge_probability = edge.hedge_probability;
        Self {
            intent_id: Uuid::new_v4(),
            edge,
            max_notional,
            hedge_probability,
            state: ExecutionState::Ready,
            attempts: 0,
            primary_order: None,
            hedge_order: None,
            created_at: Utc::now(),
        }
    }

    /// Builds an intent with the primary/hedge orders already populated
    /// from real book prices, as the aggregator does once it has both
    /// sides of the book in hand.
    #[must_use]
    pub fn with_orders(edge: EdgeSignal, max_notional: Decimal, primary_order: OrderIntent, hedge_order: OrderIntent) -> Self {
        let mut intent = Self::new(edge, max_notional);
        intent.primary_order = Some(primary_order);
        intent.hedge_order = Some(hedge_order);
        intent
    }
}

/// A concrete order to be placed on a venue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderIntent {
    pub market: MarketRef,
    pub side: OrderSide,
    pub limit_price: Decimal,
    pub size: Decimal,
}

/// A record of an order actually submitted to a venue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRecord {
    pub order_id: String,
    pub market: MarketRef,
    pub side: OrderSide,
    pub limit_price: Decimal,
    pub size: Decimal,
    pub submitted_at: DateTime<Utc>,
}

/// A fill against a previously submitted order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fill {
    pub order_id: String,
    pub filled_price: Decimal,
    pub filled_size: Decimal,
    pub filled_at: DateTime<Utc>,
}

/// Outcome of an execution attempt, including latency metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub intent_id: Uuid,
    pub success: bool,
    pub hedge_completed_ms: Option<u64>,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Venue;
    use rust_decimal_macros::dec;

    fn sample_edge() -> EdgeSignal {
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
            leader: None,
            leader_stable: false,
        }
    }

    #[test]
    fn new_intent_starts_ready_with_zero_attempts() {
        let intent = ExecutionIntent::new(sample_edge(), dec!(100));
        assert_eq!(intent.state, ExecutionState::Ready);
        assert_eq!(intent.attempts, 0);
        assert_eq!(intent.hedge_probability, 0.9);
        assert!(intent.primary_order.is_none());
        assert!(intent.hedge_order.is_none());
    }

    #[test]
    fn with_orders_populates_both_legs() {
        let primary_order = OrderIntent {
            market: MarketRef::new(Venue::Polymarket, "1", "a"),
            side: OrderSide::Buy,
            limit_price: dec!(0.55),
            size: dec!(100),
        };
        let hedge_order = OrderIntent {
            market: MarketRef::new(Venue::Kalshi, "2", "b"),
            side: OrderSide::Sell,
            limit_price: dec!(0.60),
            size: dec!(100),
        };
        let intent = ExecutionIntent::with_orders(sample_edge(), dec!(100), primary_order, hedge_order);
        assert!(intent.primary_order.is_some());
        assert!(intent.hedge_order.is_some());
    }
}
