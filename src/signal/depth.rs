use rust_decimal::prelude::ToPrimitive;
use tracing::warn;

use crate::domain::{BookSnapshot, MarketPair};

#[derive(Debug, Clone, Copy)]
pub struct DepthAnalysis {
    pub primary_bid_depth_usd: f64,
    pub primary_ask_depth_usd: f64,
    pub hedge_bid_depth_usd: f64,
    pub hedge_ask_depth_usd: f64,
    pub primary_best_bid: f64,
    pub primary_best_ask: f64,
    pub hedge_best_bid: f64,
    pub hedge_best_ask: f64,
}

/// Estimates achievable size and slippage from order book depth, walking
/// the top few levels of each side.
pub struct DepthModel {
    max_levels: usize,
}

impl Default for DepthModel {
    fn default() -> Self {
        Self { max_levels: 3 }
    }
}

fn level_price(book: &[crate::domain::BookLevel], default: f64) -> f64 {
    book.first().map(|l| l.price.to_f64().unwrap_or(default)).unwrap_or(default)
}

fn depth_usd(levels: &[crate::domain::BookLevel], max_levels: usize) -> f64 {
    levels
        .iter()
        .take(max_levels)
        .map(|l| {
            let price = l.price.to_f64().unwrap_or(0.0);
            let size = l.size.to_f64().unwrap_or(0.0);
            price * size
        })
        .sum()
}

impl DepthModel {
    #[must_use]
    pub fn new(max_levels: usize) -> Self {
        Self { max_levels }
    }

    #[must_use]
    pub fn analyze_depth(&self, primary_book: &BookSnapshot, hedge_book: &BookSnapshot) -> DepthAnalysis {
        DepthAnalysis {
            primary_bid_depth_usd: depth_usd(&primary_book.bids, self.max_levels),
            primary_ask_depth_usd: depth_usd(&primary_book.asks, self.max_levels),
            hedge_bid_depth_usd: depth_usd(&hedge_book.bids, self.max_levels),
            hedge_ask_depth_usd: depth_usd(&hedge_book.asks, self.max_levels),
            primary_best_bid: level_price(&primary_book.bids, 0.0),
            primary_best_ask: level_price(&primary_book.asks, 1.0),
            hedge_best_bid: level_price(&hedge_book.bids, 0.0),
            hedge_best_ask: level_price(&hedge_book.asks, 1.0),
        }
    }

    fn calculate_vwap(&self, levels: &[crate::domain::BookLevel], target_size_usd: f64) -> f64 {
        if levels.is_empty() {
            return 0.0;
        }

        let mut total_cost = 0.0;
        let mut total_size = 0.0;
        let mut remaining = target_size_usd;

        for level in levels.iter().take(self.max_levels) {
            if remaining <= 0.0 {
                break;
            }
            let price = level.price.to_f64().unwrap_or(0.0);
            let size = level.size.to_f64().unwrap_or(0.0);
            let level_notional = price * size;

            if level_notional <= remaining {
                total_cost += level_notional;
                total_size += size;
                remaining -= level_notional;
            } else {
                let partial_size = remaining / price;
                total_cost += remaining;
                total_size += partial_size;
                remaining = 0.0;
                break;
            }
        }

        if total_size == 0.0 {
            return 0.0;
        }
        total_cost / total_size
    }

    /// Estimated combined slippage in cents for a `size_usd` trade against
    /// both legs of `pair`, hitting the primary ask and the hedge bid.
    pub fn expected_slippage_cents(
        &self,
        pair: &MarketPair,
        size_usd: f64,
        primary_book: Option<&BookSnapshot>,
        hedge_book: Option<&BookSnapshot>,
    ) -> f64 {
        let (Some(primary_book), Some(hedge_book)) = (primary_book, hedge_book) else {
            warn!(pair = %pair.pair_id, "no_orderbook_data");
            return size_usd * 0.01 * 100.0;
        };

        let depth = self.analyze_depth(primary_book, hedge_book);

        let primary_vwap = self.calculate_vwap(&primary_book.asks, size_usd);
        if primary_vwap == 0.0 {
            warn!(size = size_usd, "insufficient_primary_liquidity");
            return size_usd * 0.02 * 100.0;
        }

        let hedge_vwap = self.calculate_vwap(&hedge_book.bids, size_usd);
        if hedge_vwap == 0.0 {
            warn!(size = size_usd, "insufficient_hedge_liquidity");
            return size_usd * 0.02 * 100.0;
        }

        let primary_slippage = (primary_vwap - depth.primary_best_ask).abs() * size_usd / depth.primary_best_ask;
        let hedge_slippage = (hedge_vwap - depth.hedge_best_bid).abs() * size_usd / depth.hedge_best_bid;

        (primary_slippage + hedge_slippage) * 100.0
    }

    #[must_use]
    pub fn max_tradeable_size(&self, primary_book: &BookSnapshot, hedge_book: &BookSnapshot) -> f64 {
        let depth = self.analyze_depth(primary_book, hedge_book);
        depth.primary_ask_depth_usd.min(depth.hedge_bid_depth_usd)
    }

    /// Estimated probability the hedge leg fills inside the latency
    /// budget, from depth sufficiency alone. Scales linearly below full
    /// coverage of `size_usd` and saturates at 0.97 once the hedge side
    /// can absorb the full trade.
    #[must_use]
    pub fn hedge_fill_probability(&self, primary_book: &BookSnapshot, hedge_book: &BookSnapshot, size_usd: f64) -> f64 {
        if size_usd <= 0.0 {
            return 0.0;
        }
        let depth = self.analyze_depth(primary_book, hedge_book);
        (depth.hedge_bid_depth_usd / size_usd).min(1.0) * 0.97
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BookLevel, MarketRef, Venue};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn book(bids: Vec<(f64, f64)>, asks: Vec<(f64, f64)>) -> BookSnapshot {
        BookSnapshot {
            market: MarketRef::new(Venue::Polymarket, "1", "a"),
            timestamp: Utc::now(),
            bids: bids
                .into_iter()
                .map(|(p, s)| BookLevel { price: rust_decimal::Decimal::try_from(p).unwrap(), size: rust_decimal::Decimal::try_from(s).unwrap() })
                .collect(),
            asks: asks
                .into_iter()
                .map(|(p, s)| BookLevel { price: rust_decimal::Decimal::try_from(p).unwrap(), size: rust_decimal::Decimal::try_from(s).unwrap() })
                .collect(),
        }
    }

    #[test]
    fn vwap_walks_multiple_levels_on_partial_fill() {
        let model = DepthModel::default();
        let levels = vec![
            BookLevel { price: dec!(0.5), size: dec!(100) },
            BookLevel { price: dec!(0.6), size: dec!(100) },
        ];
        // First level covers $50, remaining $30 spills into the second level.
        let vwap = model.calculate_vwap(&levels, 80.0);
        assert!(vwap > 0.5 && vwap < 0.6);
    }

    #[test]
    fn missing_books_fall_back_to_conservative_estimate() {
        let model = DepthModel::default();
        let pair = MarketPair::new(
            "p1",
            MarketRef::new(Venue::Polymarket, "1", "a"),
            MarketRef::new(Venue::Kalshi, "2", "b"),
            1.0,
        );
        let slippage = model.expected_slippage_cents(&pair, 100.0, None, None);
        assert_eq!(slippage, 100.0);
    }

    #[test]
    fn max_tradeable_size_is_min_of_crossing_sides() {
        let model = DepthModel::default();
        let primary = book(vec![], vec![(0.5, 10.0)]);
        let hedge = book(vec![(0.5, 100.0)], vec![]);
        assert_eq!(model.max_tradeable_size(&primary, &hedge), 5.0);
    }
}
