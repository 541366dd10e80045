//! Handler for the `run` command: wires ingestion, matching, the signal
//! engine, risk, and execution into the live pipeline.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::cli::output;
use crate::cli::RunArgs;
use crate::config::Config;
use crate::domain::{BookSnapshot, ExecutionIntent, Market, MarketPair, MarketWindow, OrderIntent, OrderSide, PricePoint, Venue};
use crate::execution::{CompositeExecutionClient, ExecutionClient, ExecutionContext, ExecutionStateMachine, KalshiExecutor, PolymarketExecutor};
use crate::ingest::{IngestEvent, IngestOrchestrator, KalshiAdapter, PolymarketAdapter, ReconnectingAdapter, ReconnectionConfig, VenueAdapter};
use crate::matching::llm::{LlmClient, LlmValidator};
use crate::matching::{CandidateGenerator, HardRulesValidator};
use crate::persistence::{create_pool, Store};
use crate::risk::{InMemoryRiskStore, RiskManager};
use crate::signal::{DepthModel, FrictionModel, LeadLagAnalyzer, SignalAggregator};
use crate::Result;

/// Stand-in execution client for `--dry-run`: always "succeeds" without
/// ever reaching a venue, so the full pipeline can be exercised safely.
struct DryRunExecutionClient;

#[async_trait]
impl ExecutionClient for DryRunExecutionClient {
    async fn place_primary(&self, intent: &ExecutionIntent) -> Result<bool> {
        info!(intent_id = %intent.intent_id, pair = %intent.edge.pair_id, "dry_run_primary_skipped");
        Ok(true)
    }

    async fn hedge(&self, intent: &ExecutionIntent) -> Result<bool> {
        info!(intent_id = %intent.intent_id, pair = %intent.edge.pair_id, "dry_run_hedge_skipped");
        Ok(true)
    }

    async fn cancel(&self, _intent: &ExecutionIntent) -> Result<()> {
        Ok(())
    }
}

fn market_key(venue: Venue, market_id: &str) -> String {
    format!("{}:{}", venue.as_slug(), market_id)
}

/// Matches and validates candidate pairs across the two venues' current
/// catalogs, persisting each accepted pair.
async fn build_pairs(config: &Config, store: &Store, http: Client, poly_markets: &[Market], kalshi_markets: &[Market]) -> Result<Vec<MarketPair>> {
    let candidate_gen = CandidateGenerator::new(config.matching.min_jaccard);
    let hard_rules = HardRulesValidator::new(config.matching.time_window_tolerance_hours, config.matching.allowed_resolution_mismatches.clone());

    let anthropic_key = std::env::var("ANTHROPIC_API_KEY").ok();
    let openai_key = std::env::var("OPENAI_API_KEY").ok();
    let llm_client = LlmClient::new(http, anthropic_key, openai_key, config.llm.anthropic_model.clone(), config.llm.openai_model.clone(), config.llm.primary, config.llm.fallback != config.llm.primary);
    let llm_validator = LlmValidator::new(llm_client, config.matching.min_llm_score);

    let by_id: HashMap<(Venue, &str), &Market> =
        poly_markets.iter().chain(kalshi_markets.iter()).map(|m| ((m.market_ref.venue, m.market_ref.market_id.as_str()), m)).collect();

    let candidates = candidate_gen.generate(poly_markets, kalshi_markets);
    info!(candidates = candidates.len(), "matching_candidates_generated");

    let mut accepted = Vec::new();
    for mut pair in candidates {
        let (Some(market_a), Some(market_b)) =
            (by_id.get(&(pair.market_a.venue, pair.market_a.market_id.as_str())), by_id.get(&(pair.market_b.venue, pair.market_b.market_id.as_str())))
        else {
            continue;
        };

        let hard_result = hard_rules.validate(market_a, market_b);
        if !hard_result.passed {
            continue;
        }

        let (_similarity, passed) = llm_validator.validate(market_a, market_b).await;
        if !passed {
            continue;
        }

        let window = MarketWindow {
            open_time: market_a.open_time.max(market_b.open_time),
            close_time: market_a.closes_at.min(market_b.closes_at),
            resolution_time: market_a.closes_at.min(market_b.closes_at),
        };
        pair.mark_validated(window, true, chrono::Utc::now());

        store.upsert_market(market_a)?;
        store.upsert_market(market_b)?;
        store.upsert_market_pair(&pair)?;
        accepted.push(pair);
    }

    info!(accepted = accepted.len(), "matching_pairs_accepted");
    Ok(accepted)
}

/// Computes the gross edge in cents for both trade directions and
/// returns whichever is larger, along with the side that direction
/// recommends taking on the primary leg.
fn gross_edge(primary_book: &BookSnapshot, hedge_book: &BookSnapshot) -> Option<(f64, OrderSide)> {
    let primary_ask = primary_book.best_ask()?;
    let primary_bid = primary_book.best_bid()?;
    let hedge_ask = hedge_book.best_ask()?;
    let hedge_bid = hedge_book.best_bid()?;

    let buy_primary_edge = (to_f64(hedge_bid.price) - to_f64(primary_ask.price)) * 100.0;
    let sell_primary_edge = (to_f64(primary_bid.price) - to_f64(hedge_ask.price)) * 100.0;

    if buy_primary_edge >= sell_primary_edge {
        Some((buy_primary_edge, OrderSide::Buy))
    } else {
        Some((sell_primary_edge, OrderSide::Sell))
    }
}

fn to_f64(value: Decimal) -> f64 {
    use rust_decimal::prelude::ToPrimitive;
    value.to_f64().unwrap_or(0.0)
}

pub async fn execute(args: &RunArgs, config_path: impl AsRef<Path>, log_level_override: Option<&str>) -> Result<()> {
    let mut config = Config::load(&config_path)?;
    if let Some(database) = &args.database {
        config.database = database.clone();
    }
    if let Some(level) = log_level_override {
        config.logging.level = level.to_string();
    }
    config.logging.init();

    let pool = create_pool(&config.database)?;
    let store = Store::new(pool);
    let http = Client::new();

    let poly_enabled = config.enabled_services.iter().any(|s| s == "polymarket");
    let kalshi_enabled = config.enabled_services.iter().any(|s| s == "kalshi");

    let poly_adapter = PolymarketAdapter::new(&config.polymarket, http.clone());
    let kalshi_adapter = KalshiAdapter::new(&config.kalshi, http.clone());

    let poly_markets = if poly_enabled { poly_adapter.fetch_markets().await? } else { Vec::new() };
    let kalshi_markets = if kalshi_enabled { kalshi_adapter.fetch_markets().await? } else { Vec::new() };
    output::key_value("polymarket_markets", poly_markets.len());
    output::key_value("kalshi_markets", kalshi_markets.len());

    let pairs = build_pairs(&config, &store, http.clone(), &poly_markets, &kalshi_markets).await?;
    output::key_value("matched_pairs", pairs.len());

    let mut pair_index: HashMap<String, Vec<usize>> = HashMap::new();
    for (idx, pair) in pairs.iter().enumerate() {
        pair_index.entry(market_key(pair.market_a.venue, &pair.market_a.market_id)).or_default().push(idx);
        pair_index.entry(market_key(pair.market_b.venue, &pair.market_b.market_id)).or_default().push(idx);
    }

    let mut adapters: Vec<Box<dyn VenueAdapter>> = Vec::new();
    if poly_enabled {
        adapters.push(Box::new(ReconnectingAdapter::new(poly_adapter, ReconnectionConfig::default())));
    }
    if kalshi_enabled {
        adapters.push(Box::new(ReconnectingAdapter::new(kalshi_adapter, ReconnectionConfig::default())));
    }

    let execution_client: Arc<dyn ExecutionClient> = if args.dry_run {
        Arc::new(DryRunExecutionClient)
    } else {
        let poly_private_key = std::env::var("POLYMARKET_PRIVATE_KEY").unwrap_or_default();
        let poly_exec = Arc::new(PolymarketExecutor::new(&config.polymarket, &poly_private_key, http.clone())?);
        let kalshi_email = std::env::var("KALSHI_EMAIL").unwrap_or_default();
        let kalshi_password = std::env::var("KALSHI_PASSWORD").unwrap_or_default();
        let kalshi_exec = Arc::new(KalshiExecutor::new(&config.kalshi, kalshi_email, kalshi_password, http.clone()));
        Arc::new(CompositeExecutionClient::new(poly_exec, kalshi_exec))
    };
    let state_machine = ExecutionStateMachine::with_hedge_budget(execution_client, config.execution.max_attempts, config.execution.hedge_completion_ms);

    let aggregator = SignalAggregator::new(FrictionModel::default(), DepthModel::new(config.signal.depth_levels), config.signal.min_hedge_probability);
    let depth_model = DepthModel::new(config.signal.depth_levels);
    let risk_manager = RiskManager::new(InMemoryRiskStore::default(), config.risk.clone());
    let mut leadlag = LeadLagAnalyzer::default();
    let mut books: HashMap<String, BookSnapshot> = HashMap::new();

    let orchestrator = IngestOrchestrator::new(config.execution.ingest_channel_capacity);
    let mut rx = orchestrator.run(adapters).await?;

    info!("edgelord_arb_pipeline_started");

    while let Some(message) = rx.recv().await {
        let (venue_name, event) = match message {
            crate::ingest::IngestMessage::Event(tagged) => tagged,
            crate::ingest::IngestMessage::AdapterTerminated { venue, reason } => {
                warn!(venue, reason, "ingest_adapter_terminated");
                continue;
            }
        };

        let IngestEvent::BookSnapshot(snapshot) = event else {
            continue;
        };

        if let Err(err) = store.insert_orderbook_snapshot(&snapshot) {
            warn!(venue = venue_name, error = %err, "snapshot_persist_failed");
        }

        let key = market_key(snapshot.market.venue, &snapshot.market.market_id);
        books.insert(key.clone(), snapshot.clone());

        let Some(touched_pairs) = pair_index.get(&key).cloned() else {
            continue;
        };

        for pair_idx in touched_pairs {
            let pair = &pairs[pair_idx];

            if !pair.is_tradable(chrono::Utc::now()) {
                continue;
            }

            if let Some(mid) = snapshot.mid_price() {
                leadlag.add_price_update(&pair.pair_id, snapshot.market.venue, PricePoint::new(snapshot.timestamp, to_f64(mid)));
            }
            let primary_key = market_key(pair.market_a.venue, &pair.market_a.market_id);
            let hedge_key = market_key(pair.market_b.venue, &pair.market_b.market_id);

            let (Some(primary_book), Some(hedge_book)) = (books.get(&primary_key), books.get(&hedge_key)) else {
                continue;
            };

            let Some((edge_cents, side)) = gross_edge(primary_book, hedge_book) else {
                continue;
            };
            if edge_cents <= 0.0 {
                continue;
            }

            let size_usd = config.signal.trade_size_usd;
            let leadlag_result = leadlag.analyze(&pair.pair_id, pair.market_a.venue, pair.market_b.venue);
            let depth_probability = depth_model.hedge_fill_probability(primary_book, hedge_book, size_usd);
            let hedge_probability = if leadlag_result.stable { depth_probability } else { depth_probability * 0.9 };

            let Some(signal) = aggregator.compute(
                pair,
                edge_cents,
                size_usd,
                primary_book,
                hedge_book,
                hedge_probability,
                side,
                leadlag_result.leader,
                leadlag_result.stable,
            ) else {
                continue;
            };

            if !signal.is_actionable(config.signal.min_edge_cents, 0.0) {
                continue;
            }

            if let Err(err) = store.insert_edge(&signal) {
                warn!(pair = %pair.pair_id, error = %err, "edge_persist_failed");
            }
            info!(pair = %pair.pair_id, net_edge_cents = signal.net_edge_cents, confidence = signal.confidence, "edge_signal_emitted");

            let max_notional = Decimal::try_from(size_usd).unwrap_or(rust_decimal_macros::dec!(100));
            let hedge_side = side.opposite();
            let primary_price = match side {
                OrderSide::Buy => primary_book.best_ask(),
                OrderSide::Sell => primary_book.best_bid(),
            }
            .map(|level| level.price);
            let hedge_price = match hedge_side {
                OrderSide::Buy => hedge_book.best_ask(),
                OrderSide::Sell => hedge_book.best_bid(),
            }
            .map(|level| level.price);
            let (Some(primary_price), Some(hedge_price)) = (primary_price, hedge_price) else {
                continue;
            };

            let primary_order = OrderIntent { market: pair.market_a.clone(), side, limit_price: primary_price, size: max_notional };
            let hedge_order = OrderIntent { market: pair.market_b.clone(), side: hedge_side, limit_price: hedge_price, size: max_notional };
            let intent = ExecutionIntent::with_orders(signal, max_notional, primary_order, hedge_order);

            if !risk_manager.approve(&intent) {
                warn!(pair = %pair.pair_id, "intent_rejected_by_risk_manager");
                continue;
            }

            let mut ctx = ExecutionContext::new(intent);
            match state_machine.execute(&mut ctx).await {
                Ok(result) => info!(pair = %pair.pair_id, success = result.success, message = %result.message, "execution_complete"),
                Err(err) => warn!(pair = %pair.pair_id, error = %err, "execution_error"),
            }
        }
    }

    info!("edgelord_arb_pipeline_stopped");
    Ok(())
}
