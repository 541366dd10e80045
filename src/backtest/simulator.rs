use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use tracing::{info, warn};

use crate::domain::{BookSnapshot, ExecutionIntent, ExecutionResult, OrderSide};

#[derive(Debug, Clone)]
pub struct SimulatedFill {
    pub success: bool,
    pub filled_price: f64,
    pub filled_size: f64,
    pub latency_ms: u64,
    pub timestamp: DateTime<Utc>,
    pub reason: Option<String>,
}

/// Simulates order execution for paper trading and backtesting: latency,
/// partial fills based on available liquidity, and book-walk slippage.
pub struct ExecutionSimulator {
    latency_p50_ms: u64,
    latency_p95_ms: u64,
    hedge_timeout_ms: u64,
}

impl Default for ExecutionSimulator {
    fn default() -> Self {
        Self { latency_p50_ms: 200, latency_p95_ms: 350, hedge_timeout_ms: 250 }
    }
}

impl ExecutionSimulator {
    #[must_use]
    pub fn new(latency_p50_ms: u64, latency_p95_ms: u64, hedge_timeout_ms: u64) -> Self {
        Self { latency_p50_ms, latency_p95_ms, hedge_timeout_ms }
    }

    fn simulate_latency_ms(&self) -> u64 {
        rand::thread_rng().gen_range(100..=self.latency_p50_ms.max(100))
    }

    fn execute_against_book(&self, book: &BookSnapshot, side: OrderSide, target_size: f64) -> SimulatedFill {
        let levels = match side {
            OrderSide::Buy => &book.asks,
            OrderSide::Sell => &book.bids,
        };

        if levels.is_empty() {
            return SimulatedFill {
                success: false,
                filled_price: 0.0,
                filled_size: 0.0,
                latency_ms: self.simulate_latency_ms(),
                timestamp: book.timestamp,
                reason: Some("No liquidity available".into()),
            };
        }

        let mut total_cost = 0.0;
        let mut total_size = 0.0;
        let mut remaining = target_size;

        for level in levels.iter().take(3) {
            if remaining <= 0.0 {
                break;
            }
            let price = level.price.to_f64().unwrap_or(0.0);
            let available = level.size.to_f64().unwrap_or(0.0);
            let fill_size = remaining.min(available);
            total_cost += fill_size * price;
            total_size += fill_size;
            remaining -= fill_size;
        }

        if total_size == 0.0 {
            return SimulatedFill {
                success: false,
                filled_price: 0.0,
                filled_size: 0.0,
                latency_ms: self.simulate_latency_ms(),
                timestamp: book.timestamp,
                reason: Some("Insufficient liquidity".into()),
            };
        }

        SimulatedFill {
            success: true,
            filled_price: total_cost / total_size,
            filled_size: total_size,
            latency_ms: self.simulate_latency_ms(),
            timestamp: book.timestamp,
            reason: None,
        }
    }

    /// Simulates a fully hedged pair execution against two order books,
    /// gating on `hedge_timeout_ms` total alert-to-fill latency.
    pub fn simulate_hedged_execution(&self, intent: &ExecutionIntent, primary_book: &BookSnapshot, hedge_book: &BookSnapshot) -> ExecutionResult {
        let primary_side = intent.edge.recommended_primary_side;
        let hedge_side = primary_side.opposite();

        let primary_ask = primary_book.asks.first().map(|l| l.price.to_f64().unwrap_or(0.0));
        let target_size = match primary_ask {
            Some(price) if price > 0.0 => intent.max_notional.to_f64().unwrap_or(0.0) / price,
            _ => 0.0,
        };

        let primary_fill = self.execute_against_book(primary_book, primary_side, target_size);
        if !primary_fill.success {
            warn!(reason = ?primary_fill.reason, "primary_execution_failed");
            return ExecutionResult {
                intent_id: intent.intent_id,
                success: false,
                hedge_completed_ms: None,
                message: format!("Primary failed: {}", primary_fill.reason.unwrap_or_default()),
            };
        }

        let hedge_fill = self.execute_against_book(hedge_book, hedge_side, primary_fill.filled_size);
        let total_latency_ms = primary_fill.latency_ms + hedge_fill.latency_ms;

        if total_latency_ms > self.hedge_timeout_ms {
            warn!(latency_ms = total_latency_ms, timeout = self.hedge_timeout_ms, "hedge_timeout");
            return ExecutionResult {
                intent_id: intent.intent_id,
                success: false,
                hedge_completed_ms: Some(total_latency_ms),
                message: "Hedge timeout exceeded".into(),
            };
        }

        if !hedge_fill.success {
            warn!(reason = ?hedge_fill.reason, "hedge_execution_failed");
            return ExecutionResult {
                intent_id: intent.intent_id,
                success: false,
                hedge_completed_ms: Some(total_latency_ms),
                message: format!("Hedge failed: {}", hedge_fill.reason.unwrap_or_default()),
            };
        }

        info!(
            primary_price = primary_fill.filled_price,
            hedge_price = hedge_fill.filled_price,
            size = primary_fill.filled_size,
            latency_ms = total_latency_ms,
            "hedged_execution_success"
        );

        ExecutionResult {
            intent_id: intent.intent_id,
            success: true,
            hedge_completed_ms: Some(total_latency_ms),
            message: "Execution successful".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BookLevel, EdgeSignal, MarketRef, Venue};
    use rust_decimal_macros::dec;

    fn book(asks: Vec<(f64, f64)>, bids: Vec<(f64, f64)>) -> BookSnapshot {
        BookSnapshot {
            market: MarketRef::new(Venue::Polymarket, "1", "a"),
            timestamp: Utc::now(),
            bids: bids.into_iter().map(|(p, s)| BookLevel { price: rust_decimal::Decimal::try_from(p).unwrap(), size: rust_decimal::Decimal::try_from(s).unwrap() }).collect(),
            asks: asks.into_iter().map(|(p, s)| BookLevel { price: rust_decimal::Decimal::try_from(p).unwrap(), size: rust_decimal::Decimal::try_from(s).unwrap() }).collect(),
        }
    }

    fn intent() -> ExecutionIntent {
        let edge = EdgeSignal {
            pair_id: "p1".into(),
            primary: MarketRef::new(Venue::Polymarket, "1", "a"),
            hedge: MarketRef::new(Venue::Kalshi, "2", "b"),
            timestamp: Utc::now(),
            gross_edge_cents: 3.5,
            friction_cents: 0.5,
            net_edge_cents: 3.0,
            expected_slippage_cents: 0.2,
            confidence: 0.9,
            recommended_primary_side: OrderSide::Buy,
            hedge_probability: 0.9,
            leader: None,
            leader_stable: false,
        };
        ExecutionIntent::new(edge, dec!(100))
    }

    #[test]
    fn fails_primary_leg_when_no_liquidity() {
        let simulator = ExecutionSimulator::default();
        let primary = book(vec![], vec![]);
        let hedge = book(vec![], vec![(0.5, 100.0)]);
        let result = simulator.simulate_hedged_execution(&intent(), &primary, &hedge);
        assert!(!result.success);
        assert!(result.message.starts_with("Primary failed"));
    }

    #[test]
    fn succeeds_when_both_legs_have_liquidity_within_timeout() {
        let simulator = ExecutionSimulator::new(50, 60, 10_000);
        let primary = book(vec![(0.5, 500.0)], vec![]);
        let hedge = book(vec![], vec![(0.5, 500.0)]);
        let result = simulator.simulate_hedged_execution(&intent(), &primary, &hedge);
        assert!(result.success);
    }

    fn edge_signal(net_edge_cents: f64) -> EdgeSignal {
        EdgeSignal {
            pair_id: "p1".into(),
            primary: MarketRef::new(Venue::Polymarket, "1", "a"),
            hedge: MarketRef::new(Venue::Kalshi, "2", "b"),
            timestamp: Utc::now(),
            gross_edge_cents: net_edge_cents + 0.5,
            friction_cents: 0.5,
            net_edge_cents,
            expected_slippage_cents: 0.3,
            confidence: 0.9,
            recommended_primary_side: OrderSide::Buy,
            hedge_probability: 0.99,
            leader: None,
            leader_stable: false,
        }
    }

    #[test]
    fn arb_with_crossed_books_settles_within_timeout_budget() {
        // primary ask 0.55/100, hedge bid 0.60/100: gross edge 5.0c, net
        // 4.2c after 0.5c friction and 0.3c slippage assumed upstream.
        let simulator = ExecutionSimulator::new(100, 100, 10_000);
        let primary = book(vec![(0.55, 100.0)], vec![]);
        let hedge = book(vec![], vec![(0.60, 100.0)]);
        let intent = ExecutionIntent::new(edge_signal(4.2), dec!(55));

        let result = simulator.simulate_hedged_execution(&intent, &primary, &hedge);
        assert!(result.success);
        assert_eq!(result.hedge_completed_ms, Some(200));
    }

    #[test]
    fn hedge_leg_exceeding_timeout_budget_fails_with_no_position() {
        // Same crossed books as the successful case, but a timeout budget
        // tighter than the deterministic 200ms round-trip latency floor.
        let simulator = ExecutionSimulator::new(100, 100, 150);
        let primary = book(vec![(0.55, 100.0)], vec![]);
        let hedge = book(vec![], vec![(0.60, 100.0)]);
        let intent = ExecutionIntent::new(edge_signal(4.2), dec!(55));

        let result = simulator.simulate_hedged_execution(&intent, &primary, &hedge);
        assert!(!result.success);
        assert_eq!(result.message, "Hedge timeout exceeded");
        assert_eq!(result.hedge_completed_ms, Some(200));
    }
}
