use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use super::traits::{IngestEvent, VenueAdapter};

#[derive(Debug, Clone)]
pub struct ReconnectionConfig {
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub max_consecutive_failures: u32,
    pub circuit_breaker_cooldown_ms: u64,
    /// Number of times the circuit breaker may trip before the adapter
    /// gives up permanently. `0` means it retries forever.
    pub max_circuit_trips: u32,
}

impl Default for ReconnectionConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
            max_consecutive_failures: 5,
            circuit_breaker_cooldown_ms: 60_000,
            max_circuit_trips: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CircuitState {
    Closed,
    Open { until: Instant },
}

/// Wraps a [`VenueAdapter`] with exponential-backoff reconnection and a
/// circuit breaker, transparently resubscribing to tracked markets after
/// each reconnect. The first event delivered after a reconnect is always
/// a fresh snapshot, since `subscribe` re-requests full state.
pub struct ReconnectingAdapter<A: VenueAdapter> {
    inner: A,
    config: ReconnectionConfig,
    subscribed_markets: Vec<String>,
    consecutive_failures: u32,
    current_delay_ms: u64,
    circuit_state: CircuitState,
    connected: bool,
    circuit_trips: u32,
    terminated: bool,
}

impl<A: VenueAdapter> ReconnectingAdapter<A> {
    #[must_use]
    pub fn new(inner: A, config: ReconnectionConfig) -> Self {
        let initial_delay = config.initial_delay_ms;
        Self {
            inner,
            config,
            subscribed_markets: Vec::new(),
            consecutive_failures: 0,
            current_delay_ms: initial_delay,
            circuit_state: CircuitState::Closed,
            connected: false,
            circuit_trips: 0,
            terminated: false,
        }
    }

    fn reset_backoff(&mut self) {
        self.consecutive_failures = 0;
        self.current_delay_ms = self.config.initial_delay_ms;
        self.circuit_state = CircuitState::Closed;
    }

    fn next_delay(&mut self) -> Duration {
        let delay = Duration::from_millis(self.current_delay_ms);
        let next = (self.current_delay_ms as f64 * self.config.backoff_multiplier) as u64;
        self.current_delay_ms = next.min(self.config.max_delay_ms);
        delay
    }

    fn circuit_allows_connection(&mut self) -> bool {
        match self.circuit_state {
            CircuitState::Closed => true,
            CircuitState::Open { until } => {
                if Instant::now() >= until {
                    info!(venue = self.inner.venue_name(), "circuit_breaker_cooldown_expired");
                    self.reset_backoff();
                    true
                } else {
                    false
                }
            }
        }
    }

    fn record_failure(&mut self) {
        self.consecutive_failures += 1;
        self.connected = false;

        if self.consecutive_failures >= self.config.max_consecutive_failures {
            let cooldown = Duration::from_millis(self.config.circuit_breaker_cooldown_ms);
            self.circuit_state = CircuitState::Open { until: Instant::now() + cooldown };
            self.circuit_trips += 1;
            error!(
                venue = self.inner.venue_name(),
                failures = self.consecutive_failures,
                cooldown_secs = cooldown.as_secs(),
                trips = self.circuit_trips,
                "circuit_breaker_tripped"
            );

            if self.config.max_circuit_trips > 0 && self.circuit_trips >= self.config.max_circuit_trips {
                self.terminated = true;
                error!(venue = self.inner.venue_name(), trips = self.circuit_trips, "circuit_breaker_permanently_open");
            }
        }
    }

    async fn reconnect(&mut self) -> crate::Result<()> {
        if !self.circuit_allows_connection() {
            if let CircuitState::Open { until } = self.circuit_state {
                let remaining = until.saturating_duration_since(Instant::now());
                warn!(venue = self.inner.venue_name(), remaining_secs = remaining.as_secs(), "circuit_breaker_open");
                sleep(remaining).await;
                self.reset_backoff();
            }
        }

        let delay = self.next_delay();
        info!(venue = self.inner.venue_name(), delay_ms = delay.as_millis(), attempt = self.consecutive_failures + 1, "reconnecting");
        sleep(delay).await;

        match self.inner.connect().await {
            Ok(()) => {
                self.connected = true;

                if !self.subscribed_markets.is_empty() {
                    debug!(venue = self.inner.venue_name(), markets = self.subscribed_markets.len(), "resubscribing");
                    let markets = self.subscribed_markets.clone();
                    if let Err(err) = self.inner.subscribe(&markets).await {
                        error!(venue = self.inner.venue_name(), error = %err, "resubscribe_failed");
                        self.connected = false;
                        self.record_failure();
                        return Err(err);
                    }
                }

                self.reset_backoff();
                Ok(())
            }
            Err(err) => {
                error!(venue = self.inner.venue_name(), error = %err, "reconnect_failed");
                self.record_failure();
                Err(err)
            }
        }
    }
}

#[async_trait]
impl<A: VenueAdapter + Send> VenueAdapter for ReconnectingAdapter<A> {
    async fn fetch_markets(&self) -> crate::Result<Vec<crate::domain::Market>> {
        self.inner.fetch_markets().await
    }

    async fn connect(&mut self) -> crate::Result<()> {
        let result = self.inner.connect().await;
        if result.is_ok() {
            self.connected = true;
            self.reset_backoff();
        }
        result
    }

    async fn subscribe(&mut self, market_ids: &[String]) -> crate::Result<()> {
        self.subscribed_markets = market_ids.to_vec();
        self.inner.subscribe(market_ids).await
    }

    async fn next_event(&mut self) -> Option<IngestEvent> {
        if self.terminated {
            return None;
        }

        loop {
            if self.terminated {
                return None;
            }

            if !self.connected {
                if let Err(err) = self.reconnect().await {
                    warn!(venue = self.inner.venue_name(), error = %err, "reconnect_attempt_failed");
                    continue;
                }
            }

            match self.inner.next_event().await {
                Some(IngestEvent::Disconnected { reason }) => {
                    warn!(venue = self.inner.venue_name(), %reason, "connection_lost");
                    self.connected = false;
                    self.record_failure();
                    continue;
                }
                Some(event) => {
                    if self.consecutive_failures > 0 {
                        self.reset_backoff();
                    }
                    return Some(event);
                }
                None => {
                    warn!(venue = self.inner.venue_name(), "stream_ended_unexpectedly");
                    self.connected = false;
                    self.record_failure();
                    continue;
                }
            }
        }
    }

    fn venue_name(&self) -> &'static str {
        self.inner.venue_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Market;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct ScriptedAdapter {
        connect_calls: Arc<AtomicUsize>,
        events: std::collections::VecDeque<IngestEvent>,
    }

    #[async_trait]
    impl VenueAdapter for ScriptedAdapter {
        async fn fetch_markets(&self) -> crate::Result<Vec<Market>> {
            Ok(Vec::new())
        }

        async fn connect(&mut self) -> crate::Result<()> {
            self.connect_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn subscribe(&mut self, _market_ids: &[String]) -> crate::Result<()> {
            Ok(())
        }

        async fn next_event(&mut self) -> Option<IngestEvent> {
            self.events.pop_front()
        }

        fn venue_name(&self) -> &'static str {
            "scripted"
        }
    }

    fn fast_config() -> ReconnectionConfig {
        ReconnectionConfig {
            initial_delay_ms: 1,
            max_delay_ms: 5,
            backoff_multiplier: 2.0,
            max_consecutive_failures: 3,
            circuit_breaker_cooldown_ms: 5,
            max_circuit_trips: 10,
        }
    }

    #[tokio::test]
    async fn reconnects_after_disconnect_event() {
        let connect_calls = Arc::new(AtomicUsize::new(0));
        let adapter = ScriptedAdapter {
            connect_calls: connect_calls.clone(),
            events: vec![
                IngestEvent::Disconnected { reason: "closed".into() },
                IngestEvent::BookSnapshot(crate::domain::BookSnapshot {
                    market: crate::domain::MarketRef::new(crate::domain::Venue::Polymarket, "1", "a"),
                    timestamp: chrono::Utc::now(),
                    bids: vec![],
                    asks: vec![],
                }),
            ]
            .into(),
        };

        let mut reconnecting = ReconnectingAdapter::new(adapter, fast_config());
        reconnecting.connect().await.unwrap();
        let event = reconnecting.next_event().await;
        assert!(matches!(event, Some(IngestEvent::BookSnapshot(_))));
        assert!(connect_calls.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn gives_up_permanently_after_exceeding_max_circuit_trips() {
        let adapter = ScriptedAdapter {
            connect_calls: Arc::new(AtomicUsize::new(0)),
            events: vec![IngestEvent::Disconnected { reason: "closed".into() }].into(),
        };
        let config = ReconnectionConfig { max_consecutive_failures: 1, max_circuit_trips: 1, ..fast_config() };
        let mut reconnecting = ReconnectingAdapter::new(adapter, config);
        reconnecting.connect().await.unwrap();

        assert!(reconnecting.next_event().await.is_none());
        // Once terminated the adapter never attempts to reconnect again.
        assert!(reconnecting.next_event().await.is_none());
    }

    #[test]
    fn backoff_caps_at_max_delay() {
        let mut reconnecting = ReconnectingAdapter::new(
            ScriptedAdapter { connect_calls: Arc::new(AtomicUsize::new(0)), events: Default::default() },
            fast_config(),
        );
        let _ = reconnecting.next_delay();
        let second = reconnecting.next_delay();
        assert!(second.as_millis() as u64 <= 5);
    }
}
