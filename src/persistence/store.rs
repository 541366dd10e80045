//! Connection pooling, migrations, and CRUD/upsert operations over the
//! durable sink.

use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use crate::domain::{BookSnapshot, EdgeSignal, Fill, Market, MarketPair, MarketRef, OrderRecord};
use crate::{Error, Result};

use super::models::{EdgeRow, FillRow, MarketPairRow, MarketRow, OrderRow, OrderbookRow};
use super::schema::{edges, fills, market_pairs, markets, orderbooks, orders};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

/// Creates a pooled connection to the SQLite database at `database_url`,
/// applying pending migrations before returning.
pub fn create_pool(database_url: &str) -> Result<DbPool> {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    let pool = Pool::builder().max_size(5).build(manager).map_err(|e| Error::Connection(e.to_string()))?;

    let mut conn = pool.get().map_err(|e| Error::Connection(e.to_string()))?;
    conn.run_pending_migrations(MIGRATIONS).map_err(|e| Error::Connection(e.to_string()))?;

    Ok(pool)
}

/// Durable sink for everything the pipeline observes: markets, pairs,
/// book snapshots, signals, orders, and fills. Writes are
/// upsert-idempotent on each table's documented unique key so replaying
/// an ingest snapshot or re-running matching never duplicates rows.
pub struct Store {
    pool: DbPool,
}

impl Store {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    fn conn(&self) -> Result<diesel::r2d2::PooledConnection<ConnectionManager<SqliteConnection>>> {
        self.pool.get().map_err(|e| Error::Connection(e.to_string()))
    }

    pub fn upsert_market(&self, market: &Market) -> Result<()> {
        let row = MarketRow::from_market(market, chrono::Utc::now());
        let mut conn = self.conn()?;
        diesel::insert_into(markets::table)
            .values(&row)
            .on_conflict(markets::id)
            .do_update()
            .set(&row)
            .execute(&mut conn)
            .map_err(|e| Error::Persistence(e.to_string()))?;
        Ok(())
    }

    pub fn upsert_market_pair(&self, pair: &MarketPair) -> Result<()> {
        let row = MarketPairRow::from_pair(pair, chrono::Utc::now());
        let mut conn = self.conn()?;
        diesel::insert_into(market_pairs::table)
            .values(&row)
            .on_conflict(market_pairs::id)
            .do_update()
            .set(&row)
            .execute(&mut conn)
            .map_err(|e| Error::Persistence(e.to_string()))?;
        Ok(())
    }

    pub fn insert_orderbook_snapshot(&self, snapshot: &BookSnapshot) -> Result<()> {
        let row = OrderbookRow::from_snapshot(snapshot)?;
        let mut conn = self.conn()?;
        diesel::insert_into(orderbooks::table).values(&row).execute(&mut conn).map_err(|e| Error::Persistence(e.to_string()))?;
        Ok(())
    }

    pub fn insert_edge(&self, signal: &EdgeSignal) -> Result<()> {
        let row = EdgeRow::from_signal(signal);
        let mut conn = self.conn()?;
        diesel::insert_into(edges::table).values(&row).execute(&mut conn).map_err(|e| Error::Persistence(e.to_string()))?;
        Ok(())
    }

    pub fn upsert_order(&self, record: &OrderRecord, status: &str) -> Result<()> {
        let row = OrderRow::from_record(record, status);
        let mut conn = self.conn()?;
        diesel::insert_into(orders::table)
            .values(&row)
            .on_conflict(orders::id)
            .do_update()
            .set(&row)
            .execute(&mut conn)
            .map_err(|e| Error::Persistence(e.to_string()))?;
        Ok(())
    }

    pub fn insert_fill(&self, fill: &Fill) -> Result<()> {
        let row = FillRow::from_fill(fill);
        let mut conn = self.conn()?;
        diesel::insert_into(fills::table).values(&row).execute(&mut conn).map_err(|e| Error::Persistence(e.to_string()))?;
        Ok(())
    }

    pub fn recent_edges(&self, pair_id: &str, limit: i64) -> Result<Vec<EdgeRow>> {
        let mut conn = self.conn()?;
        edges::table
            .filter(edges::pair_id.eq(pair_id))
            .order(edges::ts.desc())
            .limit(limit)
            .select(EdgeRow::as_select())
            .load(&mut conn)
            .map_err(|e| Error::Persistence(e.to_string()))
    }

    pub fn fills_for_order(&self, order_id: &str) -> Result<Vec<FillRow>> {
        let mut conn = self.conn()?;
        fills::table
            .filter(fills::order_id.eq(order_id))
            .order(fills::ts_fill.asc())
            .select(FillRow::as_select())
            .load(&mut conn)
            .map_err(|e| Error::Persistence(e.to_string()))
    }

    fn market_ref_by_row_id(&self, conn: &mut diesel::r2d2::PooledConnection<ConnectionManager<SqliteConnection>>, row_id: &str) -> Result<MarketRef> {
        let row: MarketRow = markets::table
            .filter(markets::id.eq(row_id))
            .select(MarketRow::as_select())
            .first(conn)
            .map_err(|e| Error::Persistence(e.to_string()))?;
        let market = row.to_market()?;
        Ok(market.market_ref)
    }

    /// Every active market pair, with both legs resolved to `MarketRef`s,
    /// for the backtest and live run loops to replay/watch.
    pub fn active_market_pairs(&self) -> Result<Vec<MarketPair>> {
        let mut conn = self.conn()?;
        let rows: Vec<MarketPairRow> = market_pairs::table
            .filter(market_pairs::active_flag.eq(true))
            .select(MarketPairRow::as_select())
            .load(&mut conn)
            .map_err(|e| Error::Persistence(e.to_string()))?;

        let mut pairs = Vec::with_capacity(rows.len());
        for row in rows {
            let market_a = self.market_ref_by_row_id(&mut conn, &row.market_a_id)?;
            let market_b = self.market_ref_by_row_id(&mut conn, &row.market_b_id)?;
            pairs.push(row.to_pair(market_a, market_b)?);
        }
        Ok(pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MarketRef, Venue};

    fn store() -> (Store, tempfile::NamedTempFile) {
        let file = tempfile::NamedTempFile::new().unwrap();
        let pool = create_pool(file.path().to_str().unwrap()).unwrap();
        (Store::new(pool), file)
    }

    fn sample_market() -> Market {
        Market {
            market_ref: MarketRef::new(Venue::Polymarket, "0xabc", "Will X happen?"),
            title: "Will X happen?".into(),
            category: "politics".into(),
            resolution_source: "AP".into(),
            open_time: chrono::Utc::now() - chrono::Duration::days(7),
            closes_at: chrono::Utc::now(),
            threshold_operator: None,
            threshold_value: None,
        }
    }

    #[test]
    fn upserting_a_market_twice_does_not_duplicate() {
        let (store, _guard) = store();
        store.upsert_market(&sample_market()).unwrap();
        store.upsert_market(&sample_market()).unwrap();

        let mut conn = store.conn().unwrap();
        let count: i64 = markets::table.count().get_result(&mut conn).unwrap();
        assert_eq!(count, 1);
    }
}
