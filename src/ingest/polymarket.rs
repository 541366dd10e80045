use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::config::PolymarketConfig;
use crate::domain::{BookLevel, BookSnapshot, Market, MarketRef, Venue};
use crate::Error;

use super::traits::{IngestEvent, VenueAdapter};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Polymarket CLOB market-data adapter: Gamma API for market metadata,
/// the public CLOB websocket feed for order book updates.
pub struct PolymarketAdapter {
    http: Client,
    ws_url: String,
    gamma_base_url: String,
    max_depth: usize,
    markets_cache: HashMap<String, String>,
    writer: Option<SplitSink<WsStream, Message>>,
    reader: Option<SplitStream<WsStream>>,
}

impl PolymarketAdapter {
    #[must_use]
    pub fn new(config: &PolymarketConfig, http: Client) -> Self {
        Self {
            http,
            ws_url: config.ws_url.clone(),
            gamma_base_url: "https://gamma-api.polymarket.com".to_string(),
            max_depth: config.max_depth,
            markets_cache: HashMap::new(),
            writer: None,
            reader: None,
        }
    }

    fn parse_ws_message(&self, raw: &Value) -> Option<BookSnapshot> {
        if raw.get("event_type").and_then(Value::as_str) != Some("book") {
            return None;
        }

        let token_id = raw.get("market").and_then(Value::as_str)?;
        let book = raw.get("book")?;

        let parse_levels = |levels: &Value| -> Vec<BookLevel> {
            levels
                .as_array()
                .map(|arr| {
                    arr.iter()
                        .take(self.max_depth)
                        .filter_map(|pair| {
                            let pair = pair.as_array()?;
                            let price: Decimal = pair.first()?.as_str()?.parse().ok()?;
                            let size: Decimal = pair.get(1)?.as_str()?.parse().ok()?;
                            (price > Decimal::ZERO && size > Decimal::ZERO).then_some(BookLevel { price, size })
                        })
                        .collect()
                })
                .unwrap_or_default()
        };

        let bids = parse_levels(book.get("bids").unwrap_or(&Value::Null));
        let asks = parse_levels(book.get("asks").unwrap_or(&Value::Null));

        let symbol = self.markets_cache.get(token_id).cloned().unwrap_or_else(|| token_id.to_string());
        let timestamp = raw
            .get("timestamp")
            .and_then(Value::as_i64)
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
            .unwrap_or_else(Utc::now);

        Some(BookSnapshot {
            market: MarketRef::new(Venue::Polymarket, token_id, symbol),
            timestamp,
            bids,
            asks,
        })
    }
}

#[async_trait]
impl VenueAdapter for PolymarketAdapter {
    async fn fetch_markets(&self) -> crate::Result<Vec<Market>> {
        let response: Vec<Value> = self.http.get(format!("{}/markets", self.gamma_base_url)).send().await?.json().await?;

        let markets = response
            .into_iter()
            .filter(|m| m.get("enableOrderBook").and_then(Value::as_bool).unwrap_or(false))
            .filter_map(|m| {
                let token_id = m.get("tokenID").and_then(Value::as_str)?.to_string();
                let title = m.get("question").and_then(Value::as_str).unwrap_or(&token_id).to_string();
                let closes_at = m
                    .get("endDate")
                    .and_then(Value::as_str)
                    .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(Utc::now);
                let open_time = m
                    .get("startDate")
                    .and_then(Value::as_str)
                    .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or(closes_at);
                Some(Market {
                    market_ref: MarketRef::new(Venue::Polymarket, token_id, title.clone()),
                    title,
                    category: m.get("category").and_then(Value::as_str).unwrap_or("").to_string(),
                    resolution_source: m.get("resolutionSource").and_then(Value::as_str).unwrap_or("").to_string(),
                    open_time,
                    closes_at,
                    threshold_operator: None,
                    threshold_value: None,
                })
            })
            .collect::<Vec<_>>();

        info!(count = markets.len(), "fetched_polymarket_markets");
        Ok(markets)
    }

    async fn connect(&mut self) -> crate::Result<()> {
        let (stream, _) = connect_async(&self.ws_url).await?;
        let (writer, reader) = stream.split();
        self.writer = Some(writer);
        self.reader = Some(reader);
        info!("polymarket_websocket_connected");
        Ok(())
    }

    async fn subscribe(&mut self, market_ids: &[String]) -> crate::Result<()> {
        let writer = self.writer.as_mut().ok_or_else(|| Error::Ingest { venue: "polymarket".into(), message: "not connected".into() })?;

        for token_id in market_ids {
            let subscribe_msg = json!({"type": "subscribe", "channel": "book", "market": token_id});
            writer.send(Message::Text(subscribe_msg.to_string())).await?;
            debug!(token_id, "subscribed_to_market");
        }

        info!(count = market_ids.len(), "polymarket_subscriptions_complete");
        Ok(())
    }

    async fn next_event(&mut self) -> Option<IngestEvent> {
        let reader = self.reader.as_mut()?;

        loop {
            match reader.next().await {
                Some(Ok(Message::Text(text))) => {
                    let parsed: Value = match serde_json::from_str(&text) {
                        Ok(v) => v,
                        Err(err) => {
                            warn!(error = %err, "invalid_json_message");
                            continue;
                        }
                    };

                    if let Some(snapshot) = self.parse_ws_message(&parsed) {
                        if !snapshot.bids.is_empty() || !snapshot.asks.is_empty() {
                            return Some(IngestEvent::BookSnapshot(snapshot));
                        }
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame.map(|f| f.reason.to_string()).unwrap_or_default();
                    return Some(IngestEvent::Disconnected { reason });
                }
                Some(Ok(_)) => continue,
                Some(Err(err)) => return Some(IngestEvent::Disconnected { reason: err.to_string() }),
                None => return None,
            }
        }
    }

    fn venue_name(&self) -> &'static str {
        "polymarket"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> PolymarketAdapter {
        PolymarketAdapter {
            http: Client::new(),
            ws_url: "wss://example.invalid".into(),
            gamma_base_url: "https://example.invalid".into(),
            max_depth: 3,
            markets_cache: HashMap::new(),
            writer: None,
            reader: None,
        }
    }

    #[test]
    fn parses_valid_book_message() {
        let adapter = adapter();
        let message = json!({
            "event_type": "book",
            "market": "0xabc",
            "timestamp": 1_700_000_000,
            "book": {"bids": [["0.55", "100"]], "asks": [["0.56", "120"]]},
        });

        let snapshot = adapter.parse_ws_message(&message).unwrap();
        assert_eq!(snapshot.bids.len(), 1);
        assert_eq!(snapshot.asks.len(), 1);
    }

    #[test]
    fn ignores_non_book_events() {
        let adapter = adapter();
        let message = json!({"event_type": "price_change", "market": "0xabc"});
        assert!(adapter.parse_ws_message(&message).is_none());
    }

    #[test]
    fn truncates_levels_to_max_depth() {
        let mut adapter = adapter();
        adapter.max_depth = 1;
        let message = json!({
            "event_type": "book",
            "market": "0xabc",
            "book": {"bids": [["0.55", "100"], ["0.54", "50"]], "asks": []},
        });
        let snapshot = adapter.parse_ws_message(&message).unwrap();
        assert_eq!(snapshot.bids.len(), 1);
    }
}
