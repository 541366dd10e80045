use async_trait::async_trait;

use crate::domain::ExecutionIntent;

/// Places and cancels orders on a single venue. Implementations own the
/// venue-specific signing, auth refresh, and retry policy.
#[async_trait]
pub trait ExecutionClient: Send + Sync {
    async fn place_primary(&self, intent: &ExecutionIntent) -> crate::Result<bool>;
    async fn hedge(&self, intent: &ExecutionIntent) -> crate::Result<bool>;
    async fn cancel(&self, intent: &ExecutionIntent) -> crate::Result<()>;
}
