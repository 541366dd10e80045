//! Diesel row types for the durable sink, and the conversions between
//! them and the crate's domain types.
//!
//! Money/size columns are stored as `Text` (decimal-string), not
//! `Double`: SQLite has no fixed-point type and the bundled
//! `rust_decimal` build here isn't compiled with Diesel's numeric
//! support, so round-tripping through `Decimal::to_string`/`FromStr`
//! is what keeps a quoted price exact.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;

use crate::domain::{BookSnapshot, Market, MarketPair, MarketWindow, OrderRecord, OrderSide, Venue};
use crate::{Error, Result};

use super::schema::{configs, edges, events, fills, market_pairs, markets, orderbooks, orders, positions};

fn parse_decimal(raw: &str) -> Result<Decimal> {
    raw.parse().map_err(|_| Error::Persistence(format!("invalid decimal column value: {raw}")))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc)).map_err(|e| Error::Persistence(e.to_string()))
}

#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = events)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct EventRow {
    pub id: String,
    pub venue: String,
    pub slug_or_ticker: String,
    pub title: String,
    pub start_time: String,
    pub end_time: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = markets)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct MarketRow {
    pub id: String,
    pub venue: String,
    pub ticker_or_token: String,
    pub title: String,
    pub resolution_source: String,
    pub open_time: String,
    pub close_time: String,
    pub category: Option<String>,
    pub binary_flag: bool,
    pub event_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl MarketRow {
    #[must_use]
    pub fn from_market(market: &Market, now: DateTime<Utc>) -> Self {
        let id = format!("{}:{}", market.market_ref.venue.as_slug(), market.market_ref.market_id);
        Self {
            id,
            venue: market.market_ref.venue.as_slug().to_string(),
            ticker_or_token: market.market_ref.market_id.clone(),
            title: market.title.clone(),
            resolution_source: market.resolution_source.clone(),
            open_time: market.open_time.to_rfc3339(),
            close_time: market.closes_at.to_rfc3339(),
            category: if market.category.is_empty() { None } else { Some(market.category.clone()) },
            binary_flag: true,
            event_id: None,
            created_at: now.to_rfc3339(),
            updated_at: now.to_rfc3339(),
        }
    }

    pub fn to_market(&self) -> Result<Market> {
        let venue: Venue = self.venue.parse()?;
        Ok(Market {
            market_ref: crate::domain::MarketRef::new(venue, self.ticker_or_token.clone(), self.title.clone()),
            title: self.title.clone(),
            category: self.category.clone().unwrap_or_default(),
            resolution_source: self.resolution_source.clone(),
            open_time: parse_timestamp(&self.open_time)?,
            closes_at: parse_timestamp(&self.close_time)?,
            threshold_operator: None,
            threshold_value: None,
        })
    }
}

#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = market_pairs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct MarketPairRow {
    pub id: String,
    pub market_a_id: String,
    pub market_b_id: String,
    pub llm_score: f64,
    pub rules_passed: bool,
    pub active_flag: bool,
    pub window_open: Option<String>,
    pub window_close: Option<String>,
    pub window_resolution: Option<String>,
    pub last_validated: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl MarketPairRow {
    /// `now` is only used for `created_at`/`updated_at`; tradability
    /// fields are read straight off `pair`, which callers must have
    /// already run through [`MarketPair::mark_validated`] if they want
    /// this row to come back out as tradable.
    #[must_use]
    pub fn from_pair(pair: &MarketPair, now: DateTime<Utc>) -> Self {
        let market_a_id = format!("{}:{}", pair.market_a.venue.as_slug(), pair.market_a.market_id);
        let market_b_id = format!("{}:{}", pair.market_b.venue.as_slug(), pair.market_b.market_id);
        Self {
            id: pair.pair_id.clone(),
            market_a_id,
            market_b_id,
            llm_score: pair.similarity,
            rules_passed: pair.hard_rules_passed,
            active_flag: pair.active,
            window_open: pair.window.map(|w| w.open_time.to_rfc3339()),
            window_close: pair.window.map(|w| w.close_time.to_rfc3339()),
            window_resolution: pair.window.map(|w| w.resolution_time.to_rfc3339()),
            last_validated: Some(pair.last_validated.to_rfc3339()),
            created_at: now.to_rfc3339(),
            updated_at: now.to_rfc3339(),
        }
    }

    /// Reconstructs the tradability fields of a [`MarketPair`] from this
    /// row, given the two legs' already-resolved `MarketRef`s.
    pub fn to_pair(&self, market_a: crate::domain::MarketRef, market_b: crate::domain::MarketRef) -> Result<MarketPair> {
        let mut pair = MarketPair::new(self.id.clone(), market_a, market_b, self.llm_score);
        if let (Some(open), Some(close), Some(resolution), Some(last_validated)) =
            (&self.window_open, &self.window_close, &self.window_resolution, &self.last_validated)
        {
            let window = MarketWindow {
                open_time: parse_timestamp(open)?,
                close_time: parse_timestamp(close)?,
                resolution_time: parse_timestamp(resolution)?,
            };
            pair.mark_validated(window, self.rules_passed, parse_timestamp(last_validated)?);
            pair.active = self.active_flag;
        }
        Ok(pair)
    }
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = orderbooks)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct OrderbookRow {
    pub id: Option<i32>,
    pub market_id: String,
    pub ts: String,
    pub bid_px: String,
    pub bid_sz: String,
    pub ask_px: String,
    pub ask_sz: String,
    pub lvl2_json: String,
}

impl OrderbookRow {
    pub fn from_snapshot(snapshot: &BookSnapshot) -> Result<Self> {
        let bid = snapshot.best_bid();
        let ask = snapshot.best_ask();
        let market_id = format!("{}:{}", snapshot.market.venue.as_slug(), snapshot.market.market_id);
        let lvl2_json = serde_json::to_string(&(&snapshot.bids, &snapshot.asks))?;

        Ok(Self {
            id: None,
            market_id,
            ts: snapshot.timestamp.to_rfc3339(),
            bid_px: bid.map(|l| l.price.to_string()).unwrap_or_default(),
            bid_sz: bid.map(|l| l.size.to_string()).unwrap_or_default(),
            ask_px: ask.map(|l| l.price.to_string()).unwrap_or_default(),
            ask_sz: ask.map(|l| l.size.to_string()).unwrap_or_default(),
            lvl2_json,
        })
    }
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = edges)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct EdgeRow {
    pub id: Option<i32>,
    pub pair_id: String,
    pub ts: String,
    pub net_edge_cents: f64,
    pub leader: Option<String>,
    pub signal_conf: Option<f64>,
    pub fee_rev_hash: Option<String>,
}

impl EdgeRow {
    #[must_use]
    pub fn from_signal(signal: &crate::domain::EdgeSignal) -> Self {
        Self {
            id: None,
            pair_id: signal.pair_id.clone(),
            ts: signal.timestamp.to_rfc3339(),
            net_edge_cents: signal.net_edge_cents,
            leader: signal.leader.map(|venue| venue.as_slug().to_string()),
            signal_conf: Some(signal.confidence),
            fee_rev_hash: Some(fee_rev_hash(signal)),
        }
    }
}

/// Deterministic fingerprint of the fee/friction components behind a
/// signal's net edge, so two rows with the same pair/friction/timestamp
/// hash identically for downstream dedup without storing the full
/// friction breakdown.
fn fee_rev_hash(signal: &crate::domain::EdgeSignal) -> String {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    signal.pair_id.hash(&mut hasher);
    signal.timestamp.timestamp_nanos_opt().unwrap_or_default().hash(&mut hasher);
    signal.friction_cents.to_bits().hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct OrderRow {
    pub id: String,
    pub venue: String,
    pub market_id: String,
    pub side: String,
    pub px: String,
    pub qty: String,
    pub ts_sent: String,
    pub ts_ack: Option<String>,
    pub status: String,
}

impl OrderRow {
    #[must_use]
    pub fn from_record(record: &OrderRecord, status: &str) -> Self {
        let market_id = format!("{}:{}", record.market.venue.as_slug(), record.market.market_id);
        Self {
            id: record.order_id.clone(),
            venue: record.market.venue.as_slug().to_string(),
            market_id,
            side: match record.side {
                OrderSide::Buy => "buy".into(),
                OrderSide::Sell => "sell".into(),
            },
            px: record.limit_price.to_string(),
            qty: record.size.to_string(),
            ts_sent: record.submitted_at.to_rfc3339(),
            ts_ack: None,
            status: status.to_string(),
        }
    }
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = fills)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct FillRow {
    pub id: Option<i32>,
    pub order_id: String,
    pub px: String,
    pub qty: String,
    pub ts_fill: String,
    pub fee: Option<String>,
    pub slippage_cents: Option<f64>,
}

impl FillRow {
    #[must_use]
    pub fn from_fill(fill: &crate::domain::Fill) -> Self {
        Self {
            id: None,
            order_id: fill.order_id.clone(),
            px: fill.filled_price.to_string(),
            qty: fill.filled_size.to_string(),
            ts_fill: fill.filled_at.to_rfc3339(),
            fee: None,
            slippage_cents: None,
        }
    }

    pub fn filled_price(&self) -> Result<Decimal> {
        parse_decimal(&self.px)
    }

    pub fn filled_size(&self) -> Result<Decimal> {
        parse_decimal(&self.qty)
    }
}

#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = positions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PositionRow {
    pub id: Option<i32>,
    pub venue: String,
    pub market_id: String,
    pub qty_yes: String,
    pub qty_no: String,
    pub avg_px_yes: Option<String>,
    pub avg_px_no: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = configs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ConfigRow {
    pub key: String,
    pub version: i32,
    pub val: String,
    pub ts: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MarketRef;
    use chrono::TimeZone;

    #[test]
    fn market_row_round_trips_venue_and_times() {
        let market = Market {
            market_ref: MarketRef::new(Venue::Kalshi, "KXTEST", "Test Market"),
            title: "Test Market".into(),
            category: "politics".into(),
            resolution_source: "AP".into(),
            open_time: Utc.with_ymd_and_hms(2025, 12, 1, 0, 0, 0).unwrap(),
            closes_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            threshold_operator: None,
            threshold_value: None,
        };

        let row = MarketRow::from_market(&market, Utc::now());
        let restored = row.to_market().unwrap();
        assert_eq!(restored.market_ref.venue, Venue::Kalshi);
        assert_eq!(restored.closes_at, market.closes_at);
    }

    #[test]
    fn rejects_malformed_decimal_columns() {
        assert!(parse_decimal("not-a-number").is_err());
    }

    #[test]
    fn edge_row_carries_leader_and_fee_rev_hash() {
        let signal = crate::domain::EdgeSignal {
            pair_id: "p1".into(),
            primary: MarketRef::new(Venue::Polymarket, "1", "a"),
            hedge: MarketRef::new(Venue::Kalshi, "2", "b"),
            timestamp: Utc::now(),
            gross_edge_cents: 4.0,
            friction_cents: 0.8,
            net_edge_cents: 3.0,
            expected_slippage_cents: 0.3,
            confidence: 0.9,
            recommended_primary_side: crate::domain::OrderSide::Buy,
            hedge_probability: 0.95,
            leader: Some(Venue::Polymarket),
            leader_stable: true,
        };
        let row = EdgeRow::from_signal(&signal);
        assert_eq!(row.leader.as_deref(), Some("polymarket"));
        assert!(row.fee_rev_hash.is_some());
    }

    #[test]
    fn market_pair_row_round_trips_validated_window() {
        let mut pair = MarketPair::new("p1", MarketRef::new(Venue::Polymarket, "1", "a"), MarketRef::new(Venue::Kalshi, "2", "b"), 0.9);
        let now = Utc::now();
        let window =
            crate::domain::MarketWindow { open_time: now - chrono::Duration::hours(1), close_time: now + chrono::Duration::hours(1), resolution_time: now + chrono::Duration::hours(2) };
        pair.mark_validated(window, true, now);

        let row = MarketPairRow::from_pair(&pair, now);
        let restored = row.to_pair(MarketRef::new(Venue::Polymarket, "1", "a"), MarketRef::new(Venue::Kalshi, "2", "b")).unwrap();
        assert!(restored.is_tradable(now));
    }
}
