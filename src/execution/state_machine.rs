use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::domain::{ExecutionIntent, ExecutionResult, ExecutionState};

use super::ExecutionClient;

/// Mutable state for a single execution attempt.
pub struct ExecutionContext {
    pub intent: ExecutionIntent,
    pub events: Vec<&'static str>,
}

impl ExecutionContext {
    #[must_use]
    pub fn new(intent: ExecutionIntent) -> Self {
        Self { intent, events: Vec::new() }
    }
}

/// Coordinates primary and hedge legs with a strict no-legging policy:
/// a hedge failure always cancels the primary rather than leaving a
/// naked position open.
pub struct ExecutionStateMachine {
    client: Arc<dyn ExecutionClient>,
    max_attempts: u8,
    hedge_completion_ms: u64,
}

impl ExecutionStateMachine {
    #[must_use]
    pub fn new(client: Arc<dyn ExecutionClient>, max_attempts: u8) -> Self {
        Self::with_hedge_budget(client, max_attempts, 250)
    }

    #[must_use]
    pub fn with_hedge_budget(client: Arc<dyn ExecutionClient>, max_attempts: u8, hedge_completion_ms: u64) -> Self {
        Self { client, max_attempts, hedge_completion_ms }
    }

    pub async fn execute(&self, ctx: &mut ExecutionContext) -> crate::Result<ExecutionResult> {
        while ctx.intent.attempts < self.max_attempts {
            ctx.intent.attempts += 1;
            let started_at = Instant::now();

            let primary = self.client.place_primary(&ctx.intent).await?;
            if !primary {
                ctx.events.push("primary_rejected");
                continue;
            }
            ctx.intent.state = ExecutionState::PrimaryPlaced;

            let hedge = self.client.hedge(&ctx.intent).await?;
            let elapsed_ms = started_at.elapsed().as_millis() as u64;

            if !hedge {
                ctx.events.push("hedge_failed");
                self.client.cancel(&ctx.intent).await?;
                ctx.intent.state = ExecutionState::Failed;
                continue;
            }

            if elapsed_ms > self.hedge_completion_ms {
                warn!(intent_id = %ctx.intent.intent_id, elapsed_ms, budget_ms = self.hedge_completion_ms, "hedge_completion_budget_exceeded");
                ctx.events.push("hedge_budget_exceeded");
                self.client.cancel(&ctx.intent).await?;
                ctx.intent.state = ExecutionState::Failed;
                return Ok(ExecutionResult {
                    intent_id: ctx.intent.intent_id,
                    success: false,
                    hedge_completed_ms: Some(elapsed_ms),
                    message: "hedge completion budget exceeded".into(),
                });
            }

            ctx.intent.state = ExecutionState::Settled;
            info!(intent_id = %ctx.intent.intent_id, elapsed_ms, "execution_settled");
            return Ok(ExecutionResult {
                intent_id: ctx.intent.intent_id,
                success: true,
                hedge_completed_ms: Some(elapsed_ms),
                message: "settled".into(),
            });
        }

        warn!(intent_id = %ctx.intent.intent_id, events = ?ctx.events, "execution_exhausted_attempts");
        Ok(ExecutionResult {
            intent_id: ctx.intent.intent_id,
            success: false,
            hedge_completed_ms: None,
            message: if ctx.events.is_empty() {
                "exhausted attempts".to_string()
            } else {
                ctx.events.join(";")
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EdgeSignal, MarketRef, OrderSide, Venue};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedClient {
        primary_ok: bool,
        hedge_ok: bool,
        hedge_delay_ms: u64,
        cancels: AtomicUsize,
        primary_calls: Mutex<usize>,
    }

    #[async_trait]
    impl ExecutionClient for ScriptedClient {
        async fn place_primary(&self, _intent: &ExecutionIntent) -> crate::Result<bool> {
            *self.primary_calls.lock() += 1;
            Ok(self.primary_ok)
        }

        async fn hedge(&self, _intent: &ExecutionIntent) -> crate::Result<bool> {
            if self.hedge_delay_ms > 0 {
                tokio::time::sleep(std::time::Duration::from_millis(self.hedge_delay_ms)).await;
            }
            Ok(self.hedge_ok)
        }

        async fn cancel(&self, _intent: &ExecutionIntent) -> crate::Result<()> {
            self.cancels.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn sample_intent() -> ExecutionIntent {
        let edge = EdgeSignal {
            pair_id: "p1".into(),
            primary: MarketRef::new(Venue::Polymarket, "1", "a"),
            hedge: MarketRef::new(Venue::Kalshi, "2", "b"),
            timestamp: chrono::Utc::now(),
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

    #[tokio::test]
    async fn settles_on_first_successful_attempt() {
        let client = Arc::new(ScriptedClient { primary_ok: true, hedge_ok: true, hedge_delay_ms: 0, cancels: AtomicUsize::new(0), primary_calls: Mutex::new(0) });
        let machine = ExecutionStateMachine::new(client.clone(), 2);
        let mut ctx = ExecutionContext::new(sample_intent());
        let result = machine.execute(&mut ctx).await.unwrap();
        assert!(result.success);
        assert_eq!(ctx.intent.state, crate::domain::ExecutionState::Settled);
        assert_eq!(client.cancels.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancels_primary_on_hedge_failure_then_exhausts() {
        let client = Arc::new(ScriptedClient { primary_ok: true, hedge_ok: false, hedge_delay_ms: 0, cancels: AtomicUsize::new(0), primary_calls: Mutex::new(0) });
        let machine = ExecutionStateMachine::new(client.clone(), 2);
        let mut ctx = ExecutionContext::new(sample_intent());
        let result = machine.execute(&mut ctx).await.unwrap();
        assert!(!result.success);
        assert_eq!(client.cancels.load(Ordering::SeqCst), 2);
        assert_eq!(*client.primary_calls.lock(), 2);
    }

    #[tokio::test]
    async fn stops_after_max_attempts() {
        let client = Arc::new(ScriptedClient { primary_ok: false, hedge_ok: false, hedge_delay_ms: 0, cancels: AtomicUsize::new(0), primary_calls: Mutex::new(0) });
        let machine = ExecutionStateMachine::new(client, 2);
        let mut ctx = ExecutionContext::new(sample_intent());
        let result = machine.execute(&mut ctx).await.unwrap();
        assert!(!result.success);
        assert_eq!(ctx.intent.attempts, 2);
    }

    #[tokio::test]
    async fn cancels_and_fails_when_hedge_completes_outside_budget() {
        let client = Arc::new(ScriptedClient { primary_ok: true, hedge_ok: true, hedge_delay_ms: 50, cancels: AtomicUsize::new(0), primary_calls: Mutex::new(0) });
        let machine = ExecutionStateMachine::with_hedge_budget(client.clone(), 2, 5);
        let mut ctx = ExecutionContext::new(sample_intent());
        let result = machine.execute(&mut ctx).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.message, "hedge completion budget exceeded");
        assert!(result.hedge_completed_ms.unwrap() >= 50);
        assert_eq!(client.cancels.load(Ordering::SeqCst), 1);
        assert_eq!(ctx.intent.state, crate::domain::ExecutionState::Failed);
    }
}
