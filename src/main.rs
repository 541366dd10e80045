use clap::Parser;
use edgelord_arb::cli::{run_backtest, run_check, run_live, Cli, Commands};
use tracing::error;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    let log_level = cli.log_level.as_deref();

    let result = match &cli.command {
        Commands::Run(args) => run_live(args, &cli.config, log_level).await,
        Commands::Backtest(args) => run_backtest(args, &cli.config, log_level).await,
        Commands::Check => run_check(&cli.config, log_level).await,
    };

    if let Err(err) = result {
        error!(error = %err, "fatal error");
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
