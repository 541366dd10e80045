use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{ExecutionIntent, Venue};

use super::ExecutionClient;

/// Routes the primary leg to whichever venue client owns
/// `intent.edge.primary.venue` and the hedge leg to whichever owns
/// `intent.edge.hedge.venue`, so a single [`ExecutionStateMachine`](super::ExecutionStateMachine)
/// can coordinate a genuinely cross-venue pair instead of one client
/// juggling both legs itself.
pub struct CompositeExecutionClient {
    polymarket: Arc<dyn ExecutionClient>,
    kalshi: Arc<dyn ExecutionClient>,
}

impl CompositeExecutionClient {
    #[must_use]
    pub fn new(polymarket: Arc<dyn ExecutionClient>, kalshi: Arc<dyn ExecutionClient>) -> Self {
        Self { polymarket, kalshi }
    }

    fn client_for(&self, venue: Venue) -> &Arc<dyn ExecutionClient> {
        match venue {
            Venue::Polymarket => &self.polymarket,
            Venue::Kalshi => &self.kalshi,
        }
    }
}

#[async_trait]
impl ExecutionClient for CompositeExecutionClient {
    async fn place_primary(&self, intent: &ExecutionIntent) -> crate::Result<bool> {
        self.client_for(intent.edge.primary.venue).place_primary(intent).await
    }

    async fn hedge(&self, intent: &ExecutionIntent) -> crate::Result<bool> {
        self.client_for(intent.edge.hedge.venue).hedge(intent).await
    }

    async fn cancel(&self, intent: &ExecutionIntent) -> crate::Result<()> {
        self.client_for(intent.edge.primary.venue).cancel(intent).await?;
        self.client_for(intent.edge.hedge.venue).cancel(intent).await
    }
}
