use tokio::task::JoinSet;
use tracing::{error, info};

use super::queue::{drop_oldest_channel, push_with_drop_warning, DropOldestReceiver};
use super::traits::{IngestEvent, VenueAdapter};

/// A book snapshot tagged with the venue it came from, as delivered to
/// downstream consumers of [`IngestOrchestrator::run`].
pub type TaggedEvent = (&'static str, IngestEvent);

/// Everything the orchestrator can deliver downstream: a tagged event,
/// or notice that a venue's stream has permanently ended (exhausted
/// reconnect budget, or its circuit breaker will never close again).
#[derive(Debug)]
pub enum IngestMessage {
    Event(TaggedEvent),
    AdapterTerminated { venue: &'static str, reason: String },
}

/// Fans in any number of venue adapters, running each on its own task and
/// forwarding events onto a single drop-oldest buffer. Mirrors the
/// fan-in shape of an `asyncio.gather` over per-venue stream loops:
/// every adapter keeps running independently, and one adapter's
/// reconnect storm never blocks another venue's events. A consumer that
/// falls behind loses the oldest buffered events rather than stalling
/// every adapter's producer task.
pub struct IngestOrchestrator {
    channel_capacity: usize,
}

impl IngestOrchestrator {
    #[must_use]
    pub fn new(channel_capacity: usize) -> Self {
        Self { channel_capacity }
    }

    /// Connects and subscribes every adapter, then streams their events
    /// into the returned receiver until all adapters exhaust themselves.
    /// Each adapter is given its own market id list, fetched from its own
    /// `fetch_markets()` before subscribing.
    pub async fn run(&self, mut adapters: Vec<Box<dyn VenueAdapter>>) -> crate::Result<DropOldestReceiver<IngestMessage>> {
        let (tx, rx) = drop_oldest_channel(self.channel_capacity);
        let mut join_set = JoinSet::new();

        for mut adapter in adapters.drain(..) {
            let tx = tx.clone();

            let markets = adapter.fetch_markets().await?;
            let market_ids: Vec<String> = markets.into_iter().map(|m| m.market_ref.market_id).collect();

            adapter.connect().await?;
            adapter.subscribe(&market_ids).await?;

            join_set.spawn(async move {
                let venue = adapter.venue_name();
                info!(venue, markets = market_ids.len(), "ingest_adapter_started");

                while let Some(event) = adapter.next_event().await {
                    push_with_drop_warning(&tx, venue, IngestMessage::Event((venue, event)));
                }

                info!(venue, "ingest_adapter_stream_ended");
                tx.push(IngestMessage::AdapterTerminated { venue, reason: "stream ended".to_string() });
            });
        }

        drop(tx);

        tokio::spawn(async move {
            while let Some(result) = join_set.join_next().await {
                if let Err(err) = result {
                    error!(error = %err, "ingest_adapter_task_panicked");
                }
            }
        });

        Ok(rx)
    }
}

impl Default for IngestOrchestrator {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BookLevel, BookSnapshot, Market, MarketRef, Venue};
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::collections::VecDeque;

    struct StubAdapter {
        name: &'static str,
        events: VecDeque<IngestEvent>,
    }

    #[async_trait]
    impl VenueAdapter for StubAdapter {
        async fn fetch_markets(&self) -> crate::Result<Vec<Market>> {
            Ok(vec![Market {
                market_ref: MarketRef::new(Venue::Polymarket, "m1", "Market One"),
                title: "Market One".into(),
                category: "politics".into(),
                resolution_source: "official".into(),
                open_time: chrono::Utc::now() - chrono::Duration::days(1),
                closes_at: chrono::Utc::now(),
                threshold_operator: None,
                threshold_value: None,
            }])
        }

        async fn connect(&mut self) -> crate::Result<()> {
            Ok(())
        }

        async fn subscribe(&mut self, _market_ids: &[String]) -> crate::Result<()> {
            Ok(())
        }

        async fn next_event(&mut self) -> Option<IngestEvent> {
            self.events.pop_front()
        }

        fn venue_name(&self) -> &'static str {
            self.name
        }
    }

    #[tokio::test]
    async fn forwards_events_from_multiple_adapters() {
        let snapshot = BookSnapshot {
            market: MarketRef::new(Venue::Polymarket, "m1", "Market One"),
            timestamp: chrono::Utc::now(),
            bids: vec![BookLevel { price: dec!(0.5), size: dec!(10) }],
            asks: vec![],
        };

        let a = Box::new(StubAdapter { name: "alpha", events: vec![IngestEvent::BookSnapshot(snapshot.clone())].into() });
        let b = Box::new(StubAdapter { name: "beta", events: vec![IngestEvent::BookSnapshot(snapshot)].into() });

        let orchestrator = IngestOrchestrator::new(8);
        let mut rx = orchestrator.run(vec![a, b]).await.unwrap();

        let mut venues_seen = Vec::new();
        let mut terminations_seen = Vec::new();
        while let Some(message) = rx.recv().await {
            match message {
                IngestMessage::Event((venue, _event)) => venues_seen.push(venue),
                IngestMessage::AdapterTerminated { venue, .. } => terminations_seen.push(venue),
            }
        }

        venues_seen.sort_unstable();
        terminations_seen.sort_unstable();
        assert_eq!(venues_seen, vec!["alpha", "beta"]);
        assert_eq!(terminations_seen, vec!["alpha", "beta"]);
    }
}
