//! Read-only query functions backing the out-of-scope HTTP dashboard's
//! `/edges`, `/fills`, `/exposure`, and `/health` endpoints. This module
//! implements the projections themselves, not the transport.

use diesel::prelude::*;
use serde::Serialize;

use crate::Result;

use super::schema::{fills, orders, positions};
use super::store::Store;

#[derive(Debug, Clone, Serialize)]
pub struct EdgeProjection {
    pub pair_id: String,
    pub ts: String,
    pub net_edge_cents: f64,
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FillProjection {
    pub order_id: String,
    pub price: String,
    pub size: String,
    pub ts_fill: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExposureProjection {
    pub venue: String,
    pub market_id: String,
    pub qty_yes: String,
    pub qty_no: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthProjection {
    pub open_order_count: i64,
    pub open_position_count: i64,
}

/// Most recent edge observations for a pair, newest first.
pub fn edges(store: &Store, pair_id: &str, limit: i64) -> Result<Vec<EdgeProjection>> {
    Ok(store
        .recent_edges(pair_id, limit)?
        .into_iter()
        .map(|row| EdgeProjection { pair_id: row.pair_id, ts: row.ts, net_edge_cents: row.net_edge_cents, confidence: row.signal_conf })
        .collect())
}

/// Fills recorded against a given order, in execution order.
pub fn fills(store: &Store, order_id: &str) -> Result<Vec<FillProjection>> {
    Ok(store
        .fills_for_order(order_id)?
        .into_iter()
        .map(|row| FillProjection { order_id: row.order_id, price: row.px, size: row.qty, ts_fill: row.ts_fill })
        .collect())
}

/// Current net exposure per venue/market, for the risk dashboard.
pub fn exposure(store: &Store) -> Result<Vec<ExposureProjection>> {
    let mut conn = store.pool().get().map_err(|e| crate::Error::Connection(e.to_string()))?;
    let rows: Vec<(String, String, String, String)> = positions::table
        .select((positions::venue, positions::market_id, positions::qty_yes, positions::qty_no))
        .load(&mut conn)
        .map_err(|e| crate::Error::Persistence(e.to_string()))?;

    Ok(rows.into_iter().map(|(venue, market_id, qty_yes, qty_no)| ExposureProjection { venue, market_id, qty_yes, qty_no }).collect())
}

/// Lightweight liveness check: counts open orders and non-flat positions.
pub fn health(store: &Store) -> Result<HealthProjection> {
    let mut conn = store.pool().get().map_err(|e| crate::Error::Connection(e.to_string()))?;

    let open_order_count = orders::table
        .filter(orders::status.ne("filled").and(orders::status.ne("cancelled")))
        .count()
        .get_result(&mut conn)
        .map_err(|e| crate::Error::Persistence(e.to_string()))?;

    let open_position_count = positions::table
        .filter(positions::qty_yes.ne("0").or(positions::qty_no.ne("0")))
        .count()
        .get_result(&mut conn)
        .map_err(|e| crate::Error::Persistence(e.to_string()))?;

    let _ = fills::table;

    Ok(HealthProjection { open_order_count, open_position_count })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EdgeSignal, MarketRef, OrderSide, Venue};
    use crate::persistence::store::create_pool;

    fn sample_signal() -> EdgeSignal {
        EdgeSignal {
            pair_id: "p1".into(),
            primary: MarketRef::new(Venue::Polymarket, "1", "a"),
            hedge: MarketRef::new(Venue::Kalshi, "2", "b"),
            timestamp: chrono::Utc::now(),
            gross_edge_cents: 4.0,
            friction_cents: 0.5,
            net_edge_cents: 3.5,
            expected_slippage_cents: 0.2,
            confidence: 0.81,
            recommended_primary_side: OrderSide::Buy,
            hedge_probability: 0.9,
            leader: Some(Venue::Polymarket),
            leader_stable: true,
        }
    }

    #[test]
    fn edges_projection_reflects_inserted_signal() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let pool = create_pool(file.path().to_str().unwrap()).unwrap();
        let store = Store::new(pool);

        store.insert_edge(&sample_signal()).unwrap();
        let rows = edges(&store, "p1", 10).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].net_edge_cents, 3.5);
    }

    #[test]
    fn health_reports_zero_on_empty_database() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let pool = create_pool(file.path().to_str().unwrap()).unwrap();
        let store = Store::new(pool);

        let report = health(&store).unwrap();
        assert_eq!(report.open_order_count, 0);
        assert_eq!(report.open_position_count, 0);
    }
}
