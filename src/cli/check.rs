//! Handler for the `check` command: configuration validity plus a live
//! REST/websocket connectivity probe against both venues.

use std::path::Path;

use reqwest::Client;

use crate::cli::output;
use crate::config::Config;
use crate::Result;

/// Runs configuration and connectivity checks. Returns `Err` on the
/// first failed check; each check still prints its own status line.
pub async fn execute(config_path: impl AsRef<Path>, log_level_override: Option<&str>) -> Result<()> {
    output::section("Configuration");
    let mut config = Config::load(&config_path)?;
    if let Some(level) = log_level_override {
        config.logging.level = level.to_string();
    }
    config.logging.init();
    output::success("config parsed and validated");
    output::key_value("database", &config.database);
    output::key_value("enabled_services", config.enabled_services.join(", "));

    let client = Client::new();

    if config.enabled_services.iter().any(|s| s == "polymarket") {
        output::section("Polymarket");
        check_rest(&client, &format!("{}/sampling-markets", config.polymarket.base_url)).await?;
        check_ws(&config.polymarket.ws_url).await?;
    }

    if config.enabled_services.iter().any(|s| s == "kalshi") {
        output::section("Kalshi");
        let base = if config.kalshi.use_demo { &config.kalshi.demo_base_url } else { &config.kalshi.base_url };
        check_rest(&client, &format!("{base}/markets?limit=1")).await?;
        check_ws(&config.kalshi.ws_url).await?;
    }

    output::section("Result");
    output::success("all checks passed");
    Ok(())
}

async fn check_rest(client: &Client, url: &str) -> Result<()> {
    print!("  REST API connectivity... ");
    match client.get(url).send().await {
        Ok(response) if response.status().is_success() => {
            println!("ok");
            Ok(())
        }
        Ok(response) => {
            println!("failed");
            Err(crate::Error::Connection(format!("{url} returned {}", response.status())))
        }
        Err(err) => {
            println!("failed");
            Err(crate::Error::Connection(err.to_string()))
        }
    }
}

async fn check_ws(ws_url: &str) -> Result<()> {
    print!("  WebSocket connectivity... ");
    match tokio_tungstenite::connect_async(ws_url).await {
        Ok(_) => {
            println!("ok");
            Ok(())
        }
        Err(err) => {
            println!("failed");
            Err(crate::Error::Connection(err.to_string()))
        }
    }
}
