use chrono::{DateTime, Utc};

/// A single mid-price observation used by the lead-lag bar resampler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub mid_price: f64,
}

impl PricePoint {
    #[must_use]
    pub fn new(timestamp: DateTime<Utc>, mid_price: f64) -> Self {
        Self { timestamp, mid_price }
    }
}
