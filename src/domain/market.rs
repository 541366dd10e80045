use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Venue;

/// Minimal identifier for a market on a venue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarketRef {
    pub venue: Venue,
    pub market_id: String,
    pub symbol: String,
}

impl MarketRef {
    #[must_use]
    pub fn new(venue: Venue, market_id: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            venue,
            market_id: market_id.into(),
            symbol: symbol.into(),
        }
    }
}

/// A binary market tracked for arbitrage purposes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    pub market_ref: MarketRef,
    pub title: String,
    pub category: String,
    pub resolution_source: String,
    pub open_time: DateTime<Utc>,
    pub closes_at: DateTime<Utc>,
    pub threshold_operator: Option<String>,
    pub threshold_value: Option<Decimal>,
}

impl Market {
    #[must_use]
    pub fn venue(&self) -> Venue {
        self.market_ref.venue
    }

    #[must_use]
    pub fn is_closed(&self, now: DateTime<Utc>) -> bool {
        now >= self.closes_at
    }

    /// Span between a market opening and closing, used by the hard-rules
    /// validator to reject markets open for less than an hour.
    #[must_use]
    pub fn trading_window(&self) -> chrono::Duration {
        self.closes_at - self.open_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_market(closes_at: DateTime<Utc>) -> Market {
        Market {
            market_ref: MarketRef::new(Venue::Polymarket, "0xabc", "us-election-2028-yes"),
            title: "Will the incumbent party win?".into(),
            category: "politics".into(),
            resolution_source: "AP".into(),
            open_time: closes_at - chrono::Duration::days(30),
            closes_at,
            threshold_operator: None,
            threshold_value: None,
        }
    }

    #[test]
    fn is_closed_at_exact_boundary() {
        let closes_at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let market = sample_market(closes_at);
        assert!(market.is_closed(closes_at));
        assert!(!market.is_closed(closes_at - chrono::Duration::seconds(1)));
    }

    #[test]
    fn venue_reflects_market_ref() {
        let market = sample_market(Utc::now());
        assert_eq!(market.venue(), Venue::Polymarket);
    }

    #[test]
    fn trading_window_spans_open_to_close() {
        let closes_at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let market = sample_market(closes_at);
        assert_eq!(market.trading_window(), chrono::Duration::days(30));
    }
}
