use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::config::KalshiConfig;
use crate::domain::{BookLevel, BookSnapshot, Market, MarketRef, Venue};
use crate::Error;

use super::traits::{IngestEvent, VenueAdapter};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const CENTS_PER_DOLLAR: i64 = 100;

/// Kalshi market-data adapter. The venue quotes YES/NO order books
/// separately in integer cents; this adapter transforms them into the
/// crate's bid/ask convention: YES bids become bids, NO bids become
/// asks at `1 - price`.
pub struct KalshiAdapter {
    http: Client,
    ws_url: String,
    base_url: String,
    max_depth: usize,
    markets_cache: HashMap<String, String>,
    writer: Option<SplitSink<WsStream, Message>>,
    reader: Option<SplitStream<WsStream>>,
}

impl KalshiAdapter {
    #[must_use]
    pub fn new(config: &KalshiConfig, http: Client) -> Self {
        let base_url = if config.use_demo { config.demo_base_url.clone() } else { config.base_url.clone() };
        Self {
            http,
            ws_url: config.ws_url.clone(),
            base_url,
            max_depth: config.max_depth,
            markets_cache: HashMap::new(),
            writer: None,
            reader: None,
        }
    }

    fn cents_to_price(cents: i64) -> Option<Decimal> {
        Decimal::try_from(cents as f64 / CENTS_PER_DOLLAR as f64).ok()
    }

    fn parse_ws_message(&self, raw: &Value) -> Option<BookSnapshot> {
        let msg_type = raw.get("type").and_then(Value::as_str)?;
        if msg_type != "orderbook_snapshot" && msg_type != "orderbook_delta" {
            return None;
        }

        let msg = raw.get("msg")?;
        let ticker = msg.get("market_ticker").and_then(Value::as_str)?;

        let mut bids: Vec<BookLevel> = msg
            .get("yes")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .take(self.max_depth)
            .filter_map(|pair| {
                let pair = pair.as_array()?;
                let price = Self::cents_to_price(pair.first()?.as_i64()?)?;
                let size = Decimal::from(pair.get(1)?.as_i64()?);
                (price > Decimal::ZERO && size > Decimal::ZERO).then_some(BookLevel { price, size })
            })
            .collect();

        let mut asks: Vec<BookLevel> = msg
            .get("no")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .take(self.max_depth)
            .filter_map(|pair| {
                let pair = pair.as_array()?;
                let no_price = Self::cents_to_price(pair.first()?.as_i64()?)?;
                let size = Decimal::from(pair.get(1)?.as_i64()?);
                let ask_price = Decimal::ONE - no_price;
                (no_price > Decimal::ZERO && size > Decimal::ZERO).then_some(BookLevel { price: ask_price, size })
            })
            .collect();

        bids.sort_by(|a, b| b.price.cmp(&a.price));
        asks.sort_by(|a, b| a.price.cmp(&b.price));

        let symbol = self.markets_cache.get(ticker).cloned().unwrap_or_else(|| ticker.to_string());

        Some(BookSnapshot {
            market: MarketRef::new(Venue::Kalshi, ticker, symbol),
            timestamp: Utc::now(),
            bids,
            asks,
        })
    }
}

#[async_trait]
impl VenueAdapter for KalshiAdapter {
    async fn fetch_markets(&self) -> crate::Result<Vec<Market>> {
        let response: Value = self
            .http
            .get(format!("{}/markets", self.base_url))
            .query(&[("status", "open"), ("limit", "200")])
            .send()
            .await?
            .json()
            .await?;

        let markets = response
            .get("markets")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter_map(|m| {
                let ticker = m.get("ticker").and_then(Value::as_str)?.to_string();
                let title = m.get("title").and_then(Value::as_str).unwrap_or(&ticker).to_string();
                let closes_at = m
                    .get("close_time")
                    .and_then(Value::as_str)
                    .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(Utc::now);
                let open_time = m
                    .get("open_time")
                    .and_then(Value::as_str)
                    .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or(closes_at);
                Some(Market {
                    market_ref: MarketRef::new(Venue::Kalshi, ticker.clone(), title.clone()),
                    title,
                    category: m.get("category").and_then(Value::as_str).unwrap_or("").to_string(),
                    resolution_source: m.get("settlement_source").and_then(Value::as_str).unwrap_or("").to_string(),
                    open_time,
                    closes_at,
                    threshold_operator: None,
                    threshold_value: None,
                })
            })
            .collect::<Vec<_>>();

        info!(count = markets.len(), "fetched_kalshi_markets");
        Ok(markets)
    }

    async fn connect(&mut self) -> crate::Result<()> {
        let (stream, _) = connect_async(&self.ws_url).await?;
        let (writer, reader) = stream.split();
        self.writer = Some(writer);
        self.reader = Some(reader);
        info!("kalshi_websocket_connected");
        Ok(())
    }

    async fn subscribe(&mut self, market_ids: &[String]) -> crate::Result<()> {
        let writer = self.writer.as_mut().ok_or_else(|| Error::Ingest { venue: "kalshi".into(), message: "not connected".into() })?;

        for (i, ticker) in market_ids.iter().enumerate() {
            let subscribe_msg = json!({
                "id": i + 1,
                "cmd": "subscribe",
                "params": {"channels": ["orderbook_delta"], "market_ticker": ticker},
            });
            writer.send(Message::Text(subscribe_msg.to_string())).await?;
            debug!(ticker, "subscribed_to_market");
        }

        info!(count = market_ids.len(), "kalshi_subscriptions_complete");
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
        "kalshi"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> KalshiAdapter {
        KalshiAdapter {
            http: Client::new(),
            ws_url: "wss://example.invalid".into(),
            base_url: "https://example.invalid".into(),
            max_depth: 3,
            markets_cache: HashMap::new(),
            writer: None,
            reader: None,
        }
    }

    #[test]
    fn transforms_no_bids_into_complement_asks() {
        let adapter = adapter();
        let message = json!({
            "type": "orderbook_snapshot",
            "msg": {"market_ticker": "KXTEST", "yes": [[55, 100]], "no": [[45, 120]]},
        });

        let snapshot = adapter.parse_ws_message(&message).unwrap();
        assert_eq!(snapshot.bids.len(), 1);
        assert_eq!(snapshot.bids[0].price, Decimal::try_from(0.55).unwrap());
        assert_eq!(snapshot.asks.len(), 1);
        assert_eq!(snapshot.asks[0].price, Decimal::ONE - Decimal::try_from(0.45).unwrap());
    }

    #[test]
    fn drops_zero_quantity_levels() {
        let adapter = adapter();
        let message = json!({
            "type": "orderbook_delta",
            "msg": {"market_ticker": "KXTEST", "yes": [[55, 0]], "no": []},
        });

        let snapshot = adapter.parse_ws_message(&message).unwrap();
        assert!(snapshot.bids.is_empty());
    }

    #[test]
    fn ignores_unknown_message_types() {
        let adapter = adapter();
        let message = json!({"type": "heartbeat"});
        assert!(adapter.parse_ws_message(&message).is_none());
    }

    #[test]
    fn full_depth_transform_matches_expected_bid_ask_ladder() {
        let adapter = adapter();
        let message = json!({
            "type": "orderbook_snapshot",
            "msg": {
                "market_ticker": "KXTEST",
                "yes": [[55, 100], [54, 200]],
                "no": [[45, 120], [46, 180]],
            },
        });

        let snapshot = adapter.parse_ws_message(&message).unwrap();

        let bids: Vec<(Decimal, Decimal)> = snapshot.bids.iter().map(|l| (l.price, l.size)).collect();
        assert_eq!(
            bids,
            vec![(Decimal::try_from(0.55).unwrap(), Decimal::from(100)), (Decimal::try_from(0.54).unwrap(), Decimal::from(200))]
        );

        let asks: Vec<(Decimal, Decimal)> = snapshot.asks.iter().map(|l| (l.price, l.size)).collect();
        assert_eq!(
            asks,
            vec![(Decimal::try_from(0.54).unwrap(), Decimal::from(180)), (Decimal::try_from(0.55).unwrap(), Decimal::from(120))]
        );
    }
}
