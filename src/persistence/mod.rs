//! Durable sink for everything the pipeline observes, plus the read
//! projections a dashboard layer would query.

pub mod models;
pub mod projections;
pub mod schema;
pub mod store;

pub use store::{create_pool, DbPool, Store, MIGRATIONS};
