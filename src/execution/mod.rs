//! Execution state machine and venue executors enforcing strict
//! hedged, taker-only, no-legging order flow.

mod kalshi_executor;
mod polymarket_executor;
mod router;
mod state_machine;
mod traits;

pub use kalshi_executor::KalshiExecutor;
pub use polymarket_executor::PolymarketExecutor;
pub use router::CompositeExecutionClient;
pub use state_machine::{ExecutionContext, ExecutionStateMachine};
pub use traits::ExecutionClient;
