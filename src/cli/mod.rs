//! Command-line interface definitions.

mod backtest;
mod check;
pub mod output;
mod run;

pub use backtest::execute as run_backtest;
pub use check::execute as run_check;
pub use run::execute as run_live;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// edgelord-arb - cross-venue arbitrage engine for binary prediction markets.
#[derive(Parser, Debug)]
#[command(name = "edgelord-arb")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file.
    #[arg(short, long, global = true, default_value = "config.toml")]
    pub config: PathBuf,

    /// Override the configured log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the live ingestion -> matching -> signal -> risk -> execution pipeline.
    Run(RunArgs),

    /// Replay recorded order book snapshots through the signal/friction stack.
    Backtest(BacktestArgs),

    /// Validate configuration and exercise venue connectivity.
    Check,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Detect edges and log intents but never submit orders.
    #[arg(long)]
    pub dry_run: bool,

    /// Override the configured database path.
    #[arg(long)]
    pub database: Option<String>,
}

/// Arguments for the `backtest` subcommand.
#[derive(Parser, Debug)]
pub struct BacktestArgs {
    /// Directory of recorded order book snapshots, one JSON-lines file
    /// per market id (each line a serialized `BookSnapshot`).
    #[arg(long)]
    pub snapshots_dir: PathBuf,

    /// Path to a JSON file listing the `MarketPair`s to replay. When
    /// omitted, pairs are read from the configured database instead.
    #[arg(long)]
    pub pairs_file: Option<PathBuf>,
}
