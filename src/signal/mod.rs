//! Friction, depth, and lead-lag models feeding the edge aggregator.

mod aggregator;
mod depth;
mod friction;
mod leadlag;

pub use aggregator::SignalAggregator;
pub use depth::{DepthAnalysis, DepthModel};
pub use friction::{FrictionModel, FrictionPack, KalshiFeeCalculator, PolymarketFeeCalculator, VenueFeeCalculator, VenueFees};
pub use leadlag::{LeadLagAnalyzer, LeadLagResult};
