//! Handler for the `backtest` command: replays recorded order book
//! snapshots through the live friction/depth signal stack.

use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use tracing::{info, warn};

use crate::backtest::BacktestEngine;
use crate::cli::output;
use crate::config::Config;
use crate::domain::{BookSnapshot, MarketPair};
use crate::persistence::{create_pool, Store};
use crate::signal::{DepthModel, FrictionModel};
use crate::Result;

use super::BacktestArgs;

fn load_snapshots(dir: &Path) -> Result<HashMap<String, Vec<BookSnapshot>>> {
    let mut snapshots = HashMap::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("jsonl") {
            continue;
        }
        let market_id = match path.file_stem().and_then(|s| s.to_str()) {
            Some(stem) => stem.to_string(),
            None => continue,
        };

        let file = std::fs::File::open(&path)?;
        let reader = std::io::BufReader::new(file);
        let mut books = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<BookSnapshot>(&line) {
                Ok(snapshot) => books.push(snapshot),
                Err(err) => warn!(file = %path.display(), error = %err, "skipping_unparseable_snapshot_line"),
            }
        }
        info!(market_id, snapshots = books.len(), "loaded_snapshot_file");
        snapshots.insert(market_id, books);
    }

    Ok(snapshots)
}

fn load_pairs(args: &BacktestArgs, config: &Config) -> Result<Vec<MarketPair>> {
    if let Some(pairs_file) = &args.pairs_file {
        let content = std::fs::read_to_string(pairs_file)?;
        let pairs: Vec<MarketPair> = serde_json::from_str(&content)?;
        return Ok(pairs);
    }

    let pool = create_pool(&config.database)?;
    let store = Store::new(pool);
    store.active_market_pairs()
}

pub async fn execute(args: &BacktestArgs, config_path: impl AsRef<Path>, log_level_override: Option<&str>) -> Result<()> {
    let mut config = Config::load(&config_path)?;
    if let Some(level) = log_level_override {
        config.logging.level = level.to_string();
    }
    config.logging.init();

    let pairs = load_pairs(args, &config)?;
    output::section("Backtest");
    output::key_value("pairs", pairs.len());

    let snapshots = load_snapshots(&args.snapshots_dir)?;
    output::key_value("markets_with_snapshots", snapshots.len());

    let engine = BacktestEngine::new(
        FrictionModel::default(),
        DepthModel::new(config.signal.depth_levels),
        config.signal.min_edge_cents,
        config.signal.trade_size_usd,
    );
    let result = engine.run(&pairs, &snapshots);

    output::section("Results");
    output::key_value("total_trades", result.metrics.total_trades);
    output::key_value("hit_rate", format!("{:.1}%", result.metrics.hit_rate * 100.0));
    output::key_value("total_pnl_cents", format!("{:.2}", result.metrics.total_pnl_cents));
    output::key_value("avg_realized_edge_cents", format!("{:.2}", result.metrics.avg_realized_edge_cents));
    output::key_value("sharpe_ratio", format!("{:.2}", result.metrics.sharpe_ratio));
    output::key_value("max_drawdown_cents", format!("{:.2}", result.metrics.max_drawdown_cents));

    Ok(())
}
