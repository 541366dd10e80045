//! Venue ingestion adapters and the reconnection/fan-in machinery wrapping
//! them.

mod kalshi;
mod orchestrator;
mod polymarket;
mod queue;
mod reconnect;
mod traits;

pub use kalshi::KalshiAdapter;
pub use orchestrator::{IngestMessage, IngestOrchestrator, TaggedEvent};
pub use polymarket::PolymarketAdapter;
pub use queue::DropOldestReceiver;
pub use reconnect::{ReconnectingAdapter, ReconnectionConfig};
pub use traits::{IngestEvent, VenueAdapter};
