use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::domain::{PricePoint, Venue};

const BAR_HISTORY_CAPACITY: usize = 1000;

#[derive(Debug, Clone)]
struct PriceBar {
    timestamp: DateTime<Utc>,
    venue: Venue,
    mid_price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeadLagResult {
    pub leader: Option<Venue>,
    pub lag_seconds: f64,
    pub correlation: f64,
    pub confidence: f64,
    pub stable: bool,
}

impl LeadLagResult {
    fn insufficient_data() -> Self {
        Self { leader: None, lag_seconds: 0.0, correlation: 0.0, confidence: 0.0, stable: false }
    }
}

/// Detects price leadership between two venues using rolling
/// cross-correlation on 5-second bars over a 10-minute window, requiring
/// the same leader in at least 3 of the last 4 windows before trusting it.
pub struct LeadLagAnalyzer {
    bar_interval_seconds: i64,
    window: Duration,
    stability_window: usize,
    min_correlation: f64,
    bars: HashMap<String, VecDeque<PriceBar>>,
    leader_history: HashMap<String, VecDeque<Venue>>,
}

impl Default for LeadLagAnalyzer {
    fn default() -> Self {
        Self::new(5, 10, 4, 0.3)
    }
}

impl LeadLagAnalyzer {
    #[must_use]
    pub fn new(bar_interval_seconds: i64, window_minutes: i64, stability_window: usize, min_correlation: f64) -> Self {
        Self {
            bar_interval_seconds,
            window: Duration::minutes(window_minutes),
            stability_window,
            min_correlation,
            bars: HashMap::new(),
            leader_history: HashMap::new(),
        }
    }

    pub fn add_price_update(&mut self, pair_key: &str, venue: Venue, point: PricePoint) {
        let deque = self.bars.entry(pair_key.to_string()).or_insert_with(|| VecDeque::with_capacity(BAR_HISTORY_CAPACITY));
        if deque.len() == BAR_HISTORY_CAPACITY {
            deque.pop_front();
        }
        deque.push_back(PriceBar { timestamp: point.timestamp, venue, mid_price: point.mid_price });
    }

    fn build_price_series(bars: &[&PriceBar], venue: Venue) -> Vec<(f64, f64)> {
        bars.iter()
            .filter(|b| b.venue == venue)
            .map(|b| (b.timestamp.timestamp() as f64, b.mid_price))
            .collect()
    }

    /// Forward-fills gaps: a bar interval with no tick reuses the previous
    /// bar's price rather than being dropped.
    fn resample_to_bars(series: &[(f64, f64)], bar_interval_sec: i64) -> Vec<f64> {
        if series.is_empty() {
            return Vec::new();
        }

        let start_time = series[0].0;
        let end_time = series[series.len() - 1].0;
        let num_bars = ((end_time - start_time) / bar_interval_sec as f64) as usize + 1;

        let mut bars = Vec::with_capacity(num_bars);
        for i in 0..num_bars {
            let bar_start = start_time + (i as f64) * bar_interval_sec as f64;
            let bar_end = bar_start + bar_interval_sec as f64;

            let bar_prices: Vec<f64> = series
                .iter()
                .filter(|(ts, _)| *ts >= bar_start && *ts < bar_end)
                .map(|(_, price)| *price)
                .collect();

            if let Some(last) = bar_prices.last() {
                bars.push(*last);
            } else if let Some(prev) = bars.last().copied() {
                bars.push(prev);
            } else {
                bars.push(f64::NAN);
            }
        }
        bars
    }

    fn compute_cross_correlation(series_a: &[f64], series_b: &[f64], max_lag: i64) -> (i64, f64) {
        if series_a.len() < 10 || series_b.len() < 10 {
            return (0, 0.0);
        }

        let a_norm = zscore(series_a);
        let b_norm = zscore(series_b);

        let mut best: Option<(i64, f64)> = None;
        for lag in -max_lag..=max_lag {
            let corr = if lag < 0 {
                let l = (-lag) as usize;
                correlation(&a_norm[..a_norm.len().saturating_sub(l)], &b_norm[l..])
            } else if lag > 0 {
                let l = lag as usize;
                correlation(&a_norm[l..], &b_norm[..b_norm.len().saturating_sub(l)])
            } else {
                correlation(&a_norm, &b_norm)
            };

            if let Some(corr) = corr {
                if best.map_or(true, |(_, b)| corr.abs() > b.abs()) {
                    best = Some((lag, corr));
                }
            }
        }

        best.unwrap_or((0, 0.0))
    }

    /// Analyze lead-lag relationship between `venue_a` and `venue_b` for
    /// the bars stored under `pair_key`.
    pub fn analyze(&mut self, pair_key: &str, venue_a: Venue, venue_b: Venue) -> LeadLagResult {
        let Some(bars) = self.bars.get(pair_key) else {
            return LeadLagResult::insufficient_data();
        };
        if bars.len() < 20 {
            return LeadLagResult::insufficient_data();
        }

        let recent: Vec<&PriceBar> = bars.iter().collect();
        let cutoff = recent.last().unwrap().timestamp - self.window;
        let windowed: Vec<&PriceBar> = recent.into_iter().filter(|b| b.timestamp >= cutoff).collect();

        let series_a = Self::build_price_series(&windowed, venue_a);
        let series_b = Self::build_price_series(&windowed, venue_b);

        let bars_a = Self::resample_to_bars(&series_a, self.bar_interval_seconds);
        let bars_b = Self::resample_to_bars(&series_b, self.bar_interval_seconds);

        let (optimal_lag, correlation) = Self::compute_cross_correlation(&bars_a, &bars_b, 12);

        let mut leader = None;
        let mut lag_bars = optimal_lag;
        if correlation.abs() >= self.min_correlation {
            if optimal_lag > 0 {
                leader = Some(venue_a);
            } else if optimal_lag < 0 {
                leader = Some(venue_b);
                lag_bars = optimal_lag.abs();
            }
        }

        let history = self.leader_history.entry(pair_key.to_string()).or_insert_with(|| VecDeque::with_capacity(self.stability_window));
        if let Some(leader) = leader {
            if history.len() == self.stability_window {
                history.pop_front();
            }
            history.push_back(leader);
        }

        let stable = leader.is_some_and(|leader| history.len() >= 3 && history.iter().filter(|&&v| v == leader).count() >= 3);

        let confidence = if stable { correlation.abs().min(1.0) } else { correlation.abs() * 0.5 };

        debug!(pair = pair_key, ?leader, lag_bars, correlation, stable, "leadlag_analysis");

        LeadLagResult {
            leader,
            lag_seconds: (lag_bars as f64) * self.bar_interval_seconds as f64,
            correlation,
            confidence,
            stable,
        }
    }
}

fn zscore(series: &[f64]) -> Vec<f64> {
    let valid: Vec<f64> = series.iter().copied().filter(|v| !v.is_nan()).collect();
    let mean = valid.iter().sum::<f64>() / valid.len().max(1) as f64;
    let variance = valid.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / valid.len().max(1) as f64;
    let std = variance.sqrt();
    series.iter().map(|v| (v - mean) / (std + 1e-10)).collect()
}

fn correlation(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    let mean_a = a.iter().sum::<f64>() / a.len() as f64;
    let mean_b = b.iter().sum::<f64>() / b.len() as f64;
    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for i in 0..a.len() {
        let da = a[i] - mean_a;
        let db = b[i] - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }
    if var_a == 0.0 || var_b == 0.0 {
        return None;
    }
    let corr = cov / (var_a.sqrt() * var_b.sqrt());
    if corr.is_nan() {
        None
    } else {
        Some(corr)
    }
}
