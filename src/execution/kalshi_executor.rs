use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use rust_decimal::prelude::ToPrimitive;
use tracing::{info, warn};

use crate::config::KalshiConfig;
use crate::domain::{ExecutionIntent, OrderSide, Venue};
use crate::error::Error;

use super::ExecutionClient;

struct SessionToken {
    access_token: String,
    expires_at: Instant,
}

/// Execution client for Kalshi's session-token-authenticated REST API.
/// Refreshes the JWT ahead of expiry by `token_refresh_slack_seconds`,
/// and forces one refresh-and-retry on a 401.
pub struct KalshiExecutor {
    client: Client,
    base_url: String,
    email: String,
    password: String,
    token_refresh_slack: Duration,
    token: Mutex<Option<SessionToken>>,
    open_orders: Mutex<HashMap<uuid::Uuid, HashMap<&'static str, String>>>,
}

impl KalshiExecutor {
    #[must_use]
    pub fn new(config: &KalshiConfig, email: String, password: String, client: Client) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            email,
            password,
            token_refresh_slack: Duration::from_secs(config.token_refresh_slack_seconds),
            token: Mutex::new(None),
            open_orders: Mutex::new(HashMap::new()),
        }
    }

    async fn login(&self) -> crate::Result<SessionToken> {
        let payload = serde_json::json!({ "email": self.email, "password": self.password });
        let response = self.client.post(format!("{}/login", self.base_url)).json(&payload).send().await?;
        if !response.status().is_success() {
            return Err(Error::Execution(format!("kalshi login failed: {}", response.status())));
        }
        let body: serde_json::Value = response.json().await?;
        let access_token = body
            .get("token")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::Execution("kalshi login response missing token".into()))?
            .to_string();
        let expires_in = body.get("expires_in_seconds").and_then(|v| v.as_u64()).unwrap_or(3600);
        Ok(SessionToken { access_token, expires_at: Instant::now() + Duration::from_secs(expires_in) })
    }

    async fn access_token(&self) -> crate::Result<String> {
        {
            let guard = self.token.lock();
            if let Some(token) = guard.as_ref() {
                if Instant::now() + self.token_refresh_slack < token.expires_at {
                    return Ok(token.access_token.clone());
                }
            }
        }
        let fresh = self.login().await?;
        let access_token = fresh.access_token.clone();
        *self.token.lock() = Some(fresh);
        Ok(access_token)
    }

    async fn force_refresh(&self) -> crate::Result<String> {
        let fresh = self.login().await?;
        let access_token = fresh.access_token.clone();
        *self.token.lock() = Some(fresh);
        Ok(access_token)
    }

    async fn submit_order(&self, market_id: &str, side: OrderSide, limit_price_cents: i64, size: i64, leg: &'static str, intent_id: uuid::Uuid) -> crate::Result<Option<String>> {
        let payload = serde_json::json!({
            "ticker": market_id,
            "side": if matches!(side, OrderSide::Buy) { "yes" } else { "no" },
            "type": "limit",
            "time_in_force": "ioc",
            "price": limit_price_cents,
            "count": size,
        });

        info!(intent_id = %intent_id, leg, market_id, ?side, limit_price_cents, size, "kalshi_submitting_order");

        let token = self.access_token().await?;
        let mut response = self.client.post(format!("{}/orders", self.base_url)).bearer_auth(&token).json(&payload).send().await?;

        if response.status().as_u16() == 401 {
            let token = self.force_refresh().await?;
            response = self.client.post(format!("{}/orders", self.base_url)).bearer_auth(&token).json(&payload).send().await?;
        }

        if !response.status().is_success() {
            warn!(status = %response.status(), intent_id = %intent_id, leg, "kalshi_order_rejected");
            return Ok(None);
        }
        let body: serde_json::Value = response.json().await?;
        let order_id = body.get("order_id").or_else(|| body.get("id")).and_then(|v| v.as_str()).map(str::to_string);
        Ok(order_id)
    }

    async fn cancel_order(&self, order_id: &str) -> crate::Result<()> {
        let token = self.access_token().await?;
        let response = self.client.delete(format!("{}/orders/{order_id}", self.base_url)).bearer_auth(&token).send().await?;
        if !response.status().is_success() {
            warn!(order_id, status = %response.status(), "kalshi_cancel_failed");
        }
        Ok(())
    }
}

fn best_effort_price_cents(net_edge_cents: f64) -> i64 {
    ((50.0 - net_edge_cents).clamp(1.0, 99.0)) as i64
}

#[async_trait]
impl ExecutionClient for KalshiExecutor {
    async fn place_primary(&self, intent: &ExecutionIntent) -> crate::Result<bool> {
        let edge = &intent.edge;
        let price_cents = best_effort_price_cents(edge.net_edge_cents);
        let size = intent.max_notional.to_f64().unwrap_or(0.0).round() as i64;

        let order_id = self
            .submit_order(&edge.primary.market_id, edge.recommended_primary_side, price_cents, size, "primary", intent.intent_id)
            .await?;
        match order_id {
            Some(id) => {
                self.open_orders.lock().entry(intent.intent_id).or_default().insert("primary", id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn hedge(&self, intent: &ExecutionIntent) -> crate::Result<bool> {
        let edge = &intent.edge;
        if edge.hedge.venue != Venue::Kalshi {
            info!(intent_id = %intent.intent_id, "kalshi_skip_non_kalshi_hedge");
            return Ok(true);
        }
        let price_cents = best_effort_price_cents(edge.net_edge_cents);
        let size = intent.max_notional.to_f64().unwrap_or(0.0).round() as i64;
        let order_id = self
            .submit_order(&edge.hedge.market_id, edge.recommended_primary_side.opposite(), price_cents, size, "hedge", intent.intent_id)
            .await?;
        match order_id {
            Some(id) => {
                self.open_orders.lock().entry(intent.intent_id).or_default().insert("hedge", id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn cancel(&self, intent: &ExecutionIntent) -> crate::Result<()> {
        let open_orders = self.open_orders.lock().remove(&intent.intent_id).unwrap_or_default();
        for (leg, order_id) in open_orders {
            self.cancel_order(&order_id).await?;
            info!(intent_id = %intent.intent_id, leg, order_id, "kalshi_order_cancelled");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_effort_price_stays_within_cent_bounds() {
        assert_eq!(best_effort_price_cents(0.0), 50);
        assert!(best_effort_price_cents(1000.0) >= 1);
        assert!(best_effort_price_cents(-1000.0) <= 99);
    }
}
