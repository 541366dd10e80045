use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use edgelord_arb::domain::{EdgeSignal, ExecutionIntent, ExecutionState, MarketRef, OrderSide, Venue};
use edgelord_arb::execution::{ExecutionClient, ExecutionContext, ExecutionStateMachine};
use edgelord_arb::risk::{InMemoryRiskStore, RiskManager};
use edgelord_arb::config::RiskConfig;
use rust_decimal_macros::dec;

fn crossed_book_edge(net_edge_cents: f64) -> EdgeSignal {
    EdgeSignal {
        pair_id: "pair-cpi-dec-2024".into(),
        primary: MarketRef::new(Venue::Polymarket, "poly-1", "CPI >= 3.0% Dec 2024"),
        hedge: MarketRef::new(Venue::Kalshi, "KXCPI-24DEC-T3.0", "CPI >= 3.0% Dec 2024"),
        timestamp: Utc::now(),
        gross_edge_cents: net_edge_cents + 0.5,
        friction_cents: 0.5,
        net_edge_cents,
        expected_slippage_cents: 0.3,
        confidence: 0.95,
        recommended_primary_side: OrderSide::Buy,
        hedge_probability: 0.99,
        leader: Some(Venue::Polymarket),
        leader_stable: true,
    }
}

struct ScriptedClient {
    primary_ok: bool,
    hedge_ok: bool,
    cancel_calls: AtomicUsize,
}

#[async_trait]
impl ExecutionClient for ScriptedClient {
    async fn place_primary(&self, _intent: &ExecutionIntent) -> edgelord_arb::Result<bool> {
        Ok(self.primary_ok)
    }

    async fn hedge(&self, _intent: &ExecutionIntent) -> edgelord_arb::Result<bool> {
        Ok(self.hedge_ok)
    }

    async fn cancel(&self, _intent: &ExecutionIntent) -> edgelord_arb::Result<()> {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A risk-approved edge with both legs fillable settles through the full
/// approve -> place -> hedge chain with no naked leg left behind.
#[tokio::test]
async fn arb_edge_clears_risk_and_settles() {
    let risk_manager = RiskManager::new(InMemoryRiskStore::default(), RiskConfig::default());
    let intent = ExecutionIntent::new(crossed_book_edge(4.2), dec!(55));
    assert!(risk_manager.approve(&intent));

    let client = Arc::new(ScriptedClient { primary_ok: true, hedge_ok: true, cancel_calls: AtomicUsize::new(0) });
    let machine = ExecutionStateMachine::new(client.clone(), 2);
    let mut ctx = ExecutionContext::new(intent);

    let result = machine.execute(&mut ctx).await.unwrap();
    assert!(result.success);
    assert_eq!(ctx.intent.state, ExecutionState::Settled);
    assert_eq!(client.cancel_calls.load(Ordering::SeqCst), 0);
}

/// An intent that would push a venue's running exposure past its cap is
/// rejected before it ever reaches the execution client, and the venue's
/// exposure counter is left untouched.
#[tokio::test]
async fn intent_over_venue_cap_never_reaches_execution() {
    let store = InMemoryRiskStore::default();
    store.increment_notional(Venue::Polymarket, dec!(4900));
    let risk_manager = RiskManager::new(store, RiskConfig::default());

    let intent = ExecutionIntent::new(crossed_book_edge(4.2), dec!(200));
    assert!(!risk_manager.approve(&intent));
    assert_eq!(risk_manager_exposure(&risk_manager), dec!(4900));
}

fn risk_manager_exposure(risk_manager: &RiskManager<InMemoryRiskStore>) -> rust_decimal::Decimal {
    use edgelord_arb::risk::RiskStore;
    risk_manager.store().total_notional(Venue::Polymarket)
}
