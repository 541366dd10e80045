use std::collections::HashMap;

use parking_lot::Mutex;
use rust_decimal::Decimal;

use crate::config::RiskConfig;
use crate::domain::{ExecutionIntent, Venue};

/// Persists and retrieves exposure metrics. A real implementation backs
/// this with the durable sink; tests use an in-memory store.
pub trait RiskStore: Send + Sync {
    fn total_notional(&self, venue: Venue) -> Decimal;
    fn increment_notional(&self, venue: Venue, amount: Decimal);
    fn open_pair_count(&self, venue: Venue) -> usize;
    fn is_pair_open(&self, venue: Venue, pair_id: &str) -> bool;
    fn mark_pair_open(&self, venue: Venue, pair_id: &str);
    fn mark_pair_closed(&self, venue: Venue, pair_id: &str);
}

/// In-process exposure tracker protected by a mutex, mirroring the
/// teacher's approach to shared mutable counters.
#[derive(Default)]
pub struct InMemoryRiskStore {
    notional: Mutex<HashMap<Venue, Decimal>>,
    open_pairs: Mutex<HashMap<Venue, Vec<String>>>,
}

impl RiskStore for InMemoryRiskStore {
    fn total_notional(&self, venue: Venue) -> Decimal {
        *self.notional.lock().get(&venue).unwrap_or(&Decimal::ZERO)
    }

    fn increment_notional(&self, venue: Venue, amount: Decimal) {
        *self.notional.lock().entry(venue).or_insert(Decimal::ZERO) += amount;
    }

    fn open_pair_count(&self, venue: Venue) -> usize {
        self.open_pairs.lock().get(&venue).map_or(0, Vec::len)
    }

    fn is_pair_open(&self, venue: Venue, pair_id: &str) -> bool {
        self.open_pairs.lock().get(&venue).is_some_and(|pairs| pairs.iter().any(|p| p == pair_id))
    }

    fn mark_pair_open(&self, venue: Venue, pair_id: &str) {
        let mut pairs = self.open_pairs.lock();
        let entry = pairs.entry(venue).or_default();
        if !entry.iter().any(|p| p == pair_id) {
            entry.push(pair_id.to_string());
        }
    }

    fn mark_pair_closed(&self, venue: Venue, pair_id: &str) {
        if let Some(entry) = self.open_pairs.lock().get_mut(&venue) {
            entry.retain(|p| p != pair_id);
        }
    }
}

/// Enforces risk limits before intents reach the execution engine:
/// per-venue notional cap, per-contract notional cap, and a cap on the
/// number of concurrently open pairs per venue.
pub struct RiskManager<S: RiskStore> {
    store: S,
    limits: RiskConfig,
}

impl<S: RiskStore> RiskManager<S> {
    #[must_use]
    pub fn new(store: S, limits: RiskConfig) -> Self {
        Self { store, limits }
    }

    /// Exposes the underlying exposure store, e.g. for reporting current
    /// notional usage alongside an approve/reject decision.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns `true` and records the intent's notional/pair exposure
    /// when the intent stays within limits; `false` otherwise, with no
    /// side effects.
    pub fn approve(&self, intent: &ExecutionIntent) -> bool {
        let venue = intent.edge.primary.venue;

        if intent.max_notional > self.limits.per_contract_limit_usd {
            return false;
        }

        let current_notional = self.store.total_notional(venue);
        if current_notional + intent.max_notional > self.limits.venue_cap_usd {
            return false;
        }

        if !self.store.is_pair_open(venue, &intent.edge.pair_id) && self.store.open_pair_count(venue) >= self.limits.concurrent_pairs {
            return false;
        }

        self.store.increment_notional(venue, intent.max_notional);
        self.store.mark_pair_open(venue, &intent.edge.pair_id);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EdgeSignal, MarketRef, OrderSide};
    use rust_decimal_macros::dec;

    fn intent(pair_id: &str, max_notional: Decimal) -> ExecutionIntent {
        let edge = EdgeSignal {
            pair_id: pair_id.into(),
            primary: MarketRef::new(Venue::Polymarket, "1", "a"),
            hedge: MarketRef::new(Venue::Kalshi, "2", "b"),
            timestamp: chrono::Utc::now(),
            gross_edge_cents: 3.5,
            friction_cents: 0.5,
            net_edge_cents: 3.0,
            expected_slippage_cents: 0.2,
            confidence: 0.9,
            recommended_primary_side: OrderSide::Buy,
            hedge_probability: 0.9,
            leader: None,
            leader_stable: false,
        };
        ExecutionIntent::new(edge, max_notional)
    }

    #[test]
    fn rejects_intent_above_per_contract_limit() {
        let manager = RiskManager::new(InMemoryRiskStore::default(), RiskConfig::default());
        assert!(!manager.approve(&intent("p1", dec!(300))));
    }

    #[test]
    fn rejects_intent_that_would_exceed_venue_cap() {
        let manager = RiskManager::new(InMemoryRiskStore::default(), RiskConfig::default());
        for i in 0..20 {
            manager.approve(&intent(&format!("p{i}"), dec!(250)));
        }
        assert!(!manager.approve(&intent("overflow", dec!(250))));
    }

    #[test]
    fn rejects_intent_that_would_push_exposure_past_venue_cap() {
        let store = InMemoryRiskStore::default();
        store.increment_notional(Venue::Polymarket, dec!(4900));
        let manager = RiskManager::new(store, RiskConfig::default());

        assert!(!manager.approve(&intent("p1", dec!(200))));
        assert_eq!(manager.store.total_notional(Venue::Polymarket), dec!(4900));
    }

    #[test]
    fn enforces_concurrent_pair_cap() {
        let manager = RiskManager::new(InMemoryRiskStore::default(), RiskConfig { concurrent_pairs: 2, ..RiskConfig::default() });
        assert!(manager.approve(&intent("p1", dec!(10))));
        assert!(manager.approve(&intent("p2", dec!(10))));
        assert!(!manager.approve(&intent("p3", dec!(10))));
    }
}
