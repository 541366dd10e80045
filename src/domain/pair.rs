use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::MarketRef;

/// The live-trading window shared by both legs of a pair, anchored on
/// whichever leg closes first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketWindow {
    pub open_time: DateTime<Utc>,
    pub close_time: DateTime<Utc>,
    pub resolution_time: DateTime<Utc>,
}

impl MarketWindow {
    #[must_use]
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.open_time <= now && now <= self.close_time
    }
}

/// A candidate pairing of two markets on different venues believed to
/// resolve on the same underlying event.
///
/// Freshly generated candidates carry `window: None` and
/// `hard_rules_passed: false` until [`MarketPair::mark_validated`] runs
/// them through the hard-rules/LLM pipeline; only a validated pair can
/// ever be [`tradable`](MarketPair::is_tradable).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketPair {
    pub pair_id: String,
    pub market_a: MarketRef,
    pub market_b: MarketRef,
    pub similarity: f64,
    pub window: Option<MarketWindow>,
    pub hard_rules_passed: bool,
    pub active: bool,
    pub last_validated: DateTime<Utc>,
}

impl MarketPair {
    #[must_use]
    pub fn new(pair_id: impl Into<String>, market_a: MarketRef, market_b: MarketRef, similarity: f64) -> Self {
        Self {
            pair_id: pair_id.into(),
            market_a,
            market_b,
            similarity,
            window: None,
            hard_rules_passed: false,
            active: false,
            last_validated: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    #[must_use]
    pub fn venues(&self) -> (super::Venue, super::Venue) {
        (self.market_a.venue, self.market_b.venue)
    }

    /// Records the outcome of hard-rules/LLM validation, making the pair
    /// eligible for [`is_tradable`](Self::is_tradable) while it stays live.
    pub fn mark_validated(&mut self, window: MarketWindow, hard_rules_passed: bool, now: DateTime<Utc>) {
        self.window = Some(window);
        self.hard_rules_passed = hard_rules_passed;
        self.active = hard_rules_passed;
        self.last_validated = now;
    }

    /// A pair is safe to trade only once it has passed hard-rules
    /// validation, is still flagged active, and `now` falls inside its
    /// shared trading window.
    #[must_use]
    pub fn is_tradable(&self, now: DateTime<Utc>) -> bool {
        self.hard_rules_passed && self.active && self.window.is_some_and(|w| w.is_live(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Venue;
    use chrono::Duration;

    fn pair() -> MarketPair {
        MarketPair::new(
            "p1",
            MarketRef::new(Venue::Polymarket, "1", "a"),
            MarketRef::new(Venue::Kalshi, "2", "b"),
            0.9,
        )
    }

    #[test]
    fn venues_reflect_each_market_ref() {
        let pair = pair();
        assert_eq!(pair.venues(), (Venue::Polymarket, Venue::Kalshi));
    }

    #[test]
    fn fresh_candidate_is_never_tradable() {
        let pair = pair();
        assert!(!pair.is_tradable(Utc::now()));
    }

    #[test]
    fn validated_pair_is_tradable_only_inside_its_window() {
        let mut pair = pair();
        let now = Utc::now();
        let window = MarketWindow {
            open_time: now - Duration::hours(1),
            close_time: now + Duration::hours(1),
            resolution_time: now + Duration::hours(2),
        };
        pair.mark_validated(window, true, now);
        assert!(pair.is_tradable(now));
        assert!(!pair.is_tradable(now + Duration::hours(2)));
    }

    #[test]
    fn failed_hard_rules_keep_pair_untradable_even_inside_window() {
        let mut pair = pair();
        let now = Utc::now();
        let window = MarketWindow {
            open_time: now - Duration::hours(1),
            close_time: now + Duration::hours(1),
            resolution_time: now + Duration::hours(2),
        };
        pair.mark_validated(window, false, now);
        assert!(!pair.is_tradable(now));
    }
}
