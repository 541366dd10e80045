use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::MarketRef;

/// A single price level on one side of a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: Decimal,
    pub size: Decimal,
}

/// Order book snapshot limited to the top-of-book and first few levels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookSnapshot {
    pub market: MarketRef,
    pub timestamp: DateTime<Utc>,
    pub bids: Vec<BookLevel>,
    pub asks: Vec<BookLevel>,
}

impl BookSnapshot {
    #[must_use]
    pub fn best_bid(&self) -> Option<BookLevel> {
        self.bids.first().copied()
    }

    #[must_use]
    pub fn best_ask(&self) -> Option<BookLevel> {
        self.asks.first().copied()
    }

    #[must_use]
    pub fn mid_price(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid.price + ask.price) / Decimal::TWO),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Venue;
    use rust_decimal_macros::dec;

    fn snapshot(bids: Vec<BookLevel>, asks: Vec<BookLevel>) -> BookSnapshot {
        BookSnapshot {
            market: MarketRef::new(Venue::Kalshi, "KXUSAELECT", "yes"),
            timestamp: Utc::now(),
            bids,
            asks,
        }
    }

    #[test]
    fn mid_price_averages_best_levels() {
        let book = snapshot(
            vec![BookLevel { price: dec!(0.45), size: dec!(100) }],
            vec![BookLevel { price: dec!(0.47), size: dec!(80) }],
        );
        assert_eq!(book.mid_price(), Some(dec!(0.46)));
    }

    #[test]
    fn mid_price_is_none_when_one_side_empty() {
        let book = snapshot(vec![], vec![BookLevel { price: dec!(0.47), size: dec!(80) }]);
        assert_eq!(book.mid_price(), None);
    }
}
