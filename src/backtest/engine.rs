use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use tracing::{debug, info, warn};

use crate::domain::{BookSnapshot, MarketPair};
use crate::signal::{DepthModel, FrictionModel};

#[derive(Debug, Clone)]
pub struct Trade {
    pub timestamp: DateTime<Utc>,
    pub pair_id: String,
    pub primary_market: String,
    pub hedge_market: String,
    pub entry_edge_cents: f64,
    pub realized_edge_cents: f64,
    pub slippage_cents: f64,
    pub fees_cents: f64,
    pub size_usd: f64,
    pub pnl_cents: f64,
}

#[derive(Debug, Clone, Default)]
pub struct BacktestMetrics {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub total_pnl_cents: f64,
    pub gross_pnl_cents: f64,
    pub total_fees_cents: f64,
    pub total_slippage_cents: f64,
    pub avg_entry_edge_cents: f64,
    pub avg_realized_edge_cents: f64,
    pub avg_slippage_cents: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown_cents: f64,
    pub hit_rate: f64,
    pub avg_trade_size_usd: f64,
}

#[derive(Debug, Clone, Default)]
pub struct BacktestResult {
    pub metrics: BacktestMetrics,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<f64>,
    pub timestamps: Vec<DateTime<Utc>>,
}

/// Historical simulation engine: replays time-aligned order book
/// snapshots for each pair through the live friction/depth models and
/// reports acceptance metrics (Sharpe, drawdown, hit rate).
pub struct BacktestEngine {
    friction_model: FrictionModel,
    depth_model: DepthModel,
    min_edge_cents: f64,
    default_trade_size: f64,
}

impl BacktestEngine {
    #[must_use]
    pub fn new(friction_model: FrictionModel, depth_model: DepthModel, min_edge_cents: f64, default_trade_size: f64) -> Self {
        Self { friction_model, depth_model, min_edge_cents, default_trade_size }
    }

    fn simulate_trade_execution(&self, pair: &MarketPair, primary_book: &BookSnapshot, hedge_book: &BookSnapshot, entry_edge_cents: f64, size_usd: f64) -> Trade {
        let fees_cents = self.friction_model.total_cost_cents(pair, size_usd);
        let slippage_cents = self.depth_model.expected_slippage_cents(pair, size_usd, Some(primary_book), Some(hedge_book));
        let realized_edge_cents = entry_edge_cents - fees_cents - slippage_cents;
        let pnl_cents = realized_edge_cents * (size_usd / 100.0);

        Trade {
            timestamp: primary_book.timestamp,
            pair_id: format!("{}:{}", pair.market_a.market_id, pair.market_b.market_id),
            primary_market: pair.market_a.symbol.clone(),
            hedge_market: pair.market_b.symbol.clone(),
            entry_edge_cents,
            realized_edge_cents,
            slippage_cents,
            fees_cents,
            size_usd,
            pnl_cents,
        }
    }

    fn calculate_metrics(trades: &[Trade]) -> BacktestMetrics {
        if trades.is_empty() {
            return BacktestMetrics::default();
        }

        let total_trades = trades.len();
        let winning_trades = trades.iter().filter(|t| t.pnl_cents > 0.0).count();
        let losing_trades = total_trades - winning_trades;

        let total_pnl: f64 = trades.iter().map(|t| t.pnl_cents).sum();
        let gross_pnl: f64 = trades.iter().map(|t| t.entry_edge_cents * (t.size_usd / 100.0)).sum();
        let total_fees: f64 = trades.iter().map(|t| t.fees_cents).sum();
        let total_slippage: f64 = trades.iter().map(|t| t.slippage_cents).sum();

        let n = total_trades as f64;
        let avg_entry_edge = trades.iter().map(|t| t.entry_edge_cents).sum::<f64>() / n;
        let avg_realized_edge = trades.iter().map(|t| t.realized_edge_cents).sum::<f64>() / n;
        let avg_slippage = trades.iter().map(|t| t.slippage_cents).sum::<f64>() / n;
        let avg_size = trades.iter().map(|t| t.size_usd).sum::<f64>() / n;

        let mut daily_returns: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for trade in trades {
            *daily_returns.entry(trade.timestamp.date_naive()).or_insert(0.0) += trade.pnl_cents / 100.0;
        }
        let returns: Vec<f64> = daily_returns.values().copied().collect();
        let sharpe_ratio = if returns.len() > 1 {
            let mean = returns.iter().sum::<f64>() / returns.len() as f64;
            let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / returns.len() as f64;
            let std = variance.sqrt();
            if std > 0.0 {
                mean / std * 252f64.sqrt()
            } else {
                0.0
            }
        } else {
            0.0
        };

        let mut equity_curve = Vec::with_capacity(trades.len());
        let mut running = 0.0;
        for trade in trades {
            running += trade.pnl_cents;
            equity_curve.push(running);
        }
        let mut running_max = f64::MIN;
        let mut max_drawdown = 0.0;
        for &equity in &equity_curve {
            running_max = running_max.max(equity);
            max_drawdown = max_drawdown.min(equity - running_max);
        }

        let hit_rate = winning_trades as f64 / total_trades as f64;

        BacktestMetrics {
            total_trades,
            winning_trades,
            losing_trades,
            total_pnl_cents: total_pnl,
            gross_pnl_cents: gross_pnl,
            total_fees_cents: total_fees,
            total_slippage_cents: total_slippage,
            avg_entry_edge_cents: avg_entry_edge,
            avg_realized_edge_cents: avg_realized_edge,
            avg_slippage_cents: avg_slippage,
            sharpe_ratio,
            max_drawdown_cents: max_drawdown,
            hit_rate,
            avg_trade_size_usd: avg_size,
        }
    }

    /// Replays `orderbook_snapshots` (keyed by venue market id) against
    /// each pair, index-aligning the two legs' snapshot histories.
    pub fn run(&self, pairs: &[MarketPair], orderbook_snapshots: &HashMap<String, Vec<BookSnapshot>>) -> BacktestResult {
        info!(pairs = pairs.len(), "starting_backtest");

        let mut trades = Vec::new();
        let mut equity_curve = vec![0.0];
        let mut timestamps = Vec::new();

        for pair in pairs {
            let primary_id = &pair.market_a.market_id;
            let hedge_id = &pair.market_b.market_id;

            let (Some(primary_books), Some(hedge_books)) = (orderbook_snapshots.get(primary_id), orderbook_snapshots.get(hedge_id)) else {
                warn!(pair_primary = %primary_id, "missing_orderbook_data");
                continue;
            };

            let min_length = primary_books.len().min(hedge_books.len());
            for i in 0..min_length {
                let primary_book = &primary_books[i];
                let hedge_book = &hedge_books[i];

                let (Some(primary_ask), Some(hedge_bid)) = (primary_book.asks.first(), hedge_book.bids.first()) else {
                    continue;
                };

                let gross_edge_cents = (hedge_bid.price.to_f64().unwrap_or(0.0) - primary_ask.price.to_f64().unwrap_or(0.0)) * 100.0;
                if gross_edge_cents < self.min_edge_cents {
                    continue;
                }

                let trade = self.simulate_trade_execution(pair, primary_book, hedge_book, gross_edge_cents, self.default_trade_size);
                debug!(pair = %trade.pair_id, edge = trade.entry_edge_cents, realized = trade.realized_edge_cents, "trade_executed");

                equity_curve.push(equity_curve.last().unwrap() + trade.pnl_cents / 100.0);
                timestamps.push(trade.timestamp);
                trades.push(trade);
            }
        }

        let metrics = Self::calculate_metrics(&trades);
        info!(trades = trades.len(), sharpe = metrics.sharpe_ratio, "backtest_complete");

        BacktestResult { metrics, trades, equity_curve, timestamps }
    }
}
