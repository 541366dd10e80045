use async_trait::async_trait;

use crate::domain::{BookSnapshot, Market};

/// Events an adapter surfaces from its live connection. A disconnect is
/// not an error on its own; [`ReconnectingAdapter`](super::ReconnectingAdapter)
/// treats it as a signal to reconnect and resubscribe.
#[derive(Debug, Clone)]
pub enum IngestEvent {
    BookSnapshot(BookSnapshot),
    Disconnected { reason: String },
}

/// A venue-specific market data source: REST catalog fetch plus a
/// stateful streaming connection for order book updates.
#[async_trait]
pub trait VenueAdapter: Send {
    /// Fetches the venue's currently tradeable binary markets.
    async fn fetch_markets(&self) -> crate::Result<Vec<Market>>;

    /// Opens the streaming connection. Idempotent: calling while already
    /// connected is a no-op success.
    async fn connect(&mut self) -> crate::Result<()>;

    /// Subscribes to order book updates for the given market ids,
    /// replacing any previous subscription set.
    async fn subscribe(&mut self, market_ids: &[String]) -> crate::Result<()>;

    /// Returns the next event from the stream, or `None` if the stream
    /// has ended and will not produce further events.
    async fn next_event(&mut self) -> Option<IngestEvent>;

    fn venue_name(&self) -> &'static str;
}
