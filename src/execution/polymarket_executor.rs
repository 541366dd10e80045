use std::collections::HashMap;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use alloy_primitives::{keccak256, Address, U256};
use alloy_signer::Signer as _;
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::{sol, Eip712Domain, SolStruct};
use async_trait::async_trait;
use parking_lot::Mutex;
use rand::Rng;
use reqwest::Client;
use rust_decimal::prelude::ToPrimitive;
use tracing::{info, warn};

use crate::config::PolymarketConfig;
use crate::domain::{ExecutionIntent, OrderIntent, OrderSide};
use crate::error::Error;

use super::ExecutionClient;

/// Fixed-point scale the CLOB expects prices and sizes to be represented
/// in: prices as micro-dollar ticks, sizes as USDC base units (6 decimals).
const FIXED_POINT_SCALE: f64 = 1_000_000.0;

/// Transient-transport retry budget for `submit_order`.
const MAX_SUBMIT_ATTEMPTS: u32 = 3;

sol! {
    #[derive(Debug)]
    struct Order {
        bytes32 market;
        address maker;
        uint8 outcome;
        uint256 makerAmount;
        uint256 price;
        uint256 nonce;
        uint256 expiry;
        uint256 salt;
        bool isBuy;
    }
}

fn price_to_ticks(price: f64) -> crate::Result<u64> {
    if !(0.0 < price && price < 1.0) {
        return Err(Error::Execution(format!("price must be between 0 and 1 for polymarket, received {price}")));
    }
    Ok((price * FIXED_POINT_SCALE).floor() as u64)
}

fn size_to_base_units(size: f64) -> crate::Result<u64> {
    if size <= 0.0 {
        return Err(Error::Execution(format!("size must be positive, received {size}")));
    }
    Ok((size * FIXED_POINT_SCALE).floor() as u64)
}

fn current_epoch_seconds() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs()
}

/// Which of the binary outcome's two legs an order trades. Our domain
/// model doesn't carry a separate outcome index, so it's derived from
/// the order side: a `Buy` takes outcome 0, a `Sell` takes outcome 1.
fn outcome_index(side: OrderSide) -> u8 {
    match side {
        OrderSide::Buy => 0,
        OrderSide::Sell => 1,
    }
}

fn is_transient(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

/// Execution client wrapping the Polymarket CLOB REST API. Orders are
/// EIP-712 signed off-chain and submitted over HTTPS; no on-chain
/// transaction is sent directly by this process.
pub struct PolymarketExecutor {
    client: Client,
    base_url: String,
    expiry_seconds: u64,
    nonce: Mutex<u64>,
    signer: PrivateKeySigner,
    domain: Eip712Domain,
    open_orders: Mutex<HashMap<uuid::Uuid, HashMap<&'static str, String>>>,
}

impl PolymarketExecutor {
    pub fn new(config: &PolymarketConfig, private_key: &str, client: Client) -> crate::Result<Self> {
        let signer = PrivateKeySigner::from_str(private_key)
            .map_err(|err| Error::Config(format!("invalid polymarket private key: {err}")))?
            .with_chain_id(Some(config.chain_id));

        let verifying_contract = Address::from_str(&config.verifying_contract)
            .map_err(|err| Error::Config(format!("invalid polymarket verifying_contract: {err}")))?;

        let domain = Eip712Domain {
            name: Some("Polymarket CTF Exchange".into()),
            version: Some("1".into()),
            chain_id: Some(U256::from(config.chain_id)),
            verifying_contract: Some(verifying_contract),
            salt: None,
        };

        info!(address = %signer.address(), chain_id = config.chain_id, "polymarket_signer_loaded");

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            expiry_seconds: config.max_order_expiry_seconds,
            nonce: Mutex::new(current_epoch_seconds() * 1000),
            signer,
            domain,
            open_orders: Mutex::new(HashMap::new()),
        })
    }

    fn next_nonce(&self) -> u64 {
        let mut nonce = self.nonce.lock();
        let candidate = current_epoch_seconds() * 1000;
        *nonce = candidate.max(*nonce + 1);
        *nonce
    }

    async fn sign_order(&self, market_id: &str, side: OrderSide, price_ticks: u64, maker_amount: u64, nonce: u64, expiry: u64) -> crate::Result<(Order, String)> {
        let salt: u128 = rand::thread_rng().gen();
        let order = Order {
            market: keccak256(market_id.as_bytes()),
            maker: self.signer.address(),
            outcome: outcome_index(side),
            makerAmount: U256::from(maker_amount),
            price: U256::from(price_ticks),
            nonce: U256::from(nonce),
            expiry: U256::from(expiry),
            salt: U256::from(salt),
            isBuy: matches!(side, OrderSide::Buy),
        };

        let signing_hash = order.eip712_signing_hash(&self.domain);
        let signature = self.signer.sign_hash(&signing_hash).await.map_err(|err| Error::Execution(format!("failed to sign order: {err}")))?;

        Ok((order, alloy_primitives::hex::encode_prefixed(signature.as_bytes())))
    }

    async fn post_with_retries(&self, path: &str, payload: &serde_json::Value) -> crate::Result<reqwest::Response> {
        let url = format!("{}{path}", self.base_url);
        let mut attempt = 1;
        loop {
            match self.client.post(&url).json(payload).send().await {
                Ok(response) => return Ok(response),
                Err(err) if attempt < MAX_SUBMIT_ATTEMPTS && is_transient(&err) => {
                    warn!(attempt, error = %err, "polymarket_transient_transport_error_retrying");
                    tokio::time::sleep(Duration::from_millis(150 * u64::from(attempt))).await;
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    async fn submit_order(&self, order_intent: &OrderIntent, leg: &'static str, intent_id: uuid::Uuid) -> crate::Result<Option<String>> {
        let market_id = &order_intent.market.market_id;
        let side = order_intent.side;
        let price = order_intent.limit_price.to_f64().unwrap_or(0.0);
        let size = order_intent.size.to_f64().unwrap_or(0.0);

        let expiry = current_epoch_seconds() + self.expiry_seconds;
        let nonce = self.next_nonce();
        let price_ticks = price_to_ticks(price)?;
        let maker_amount = size_to_base_units(size)?;

        let (order, signature) = self.sign_order(market_id, side, price_ticks, maker_amount, nonce, expiry).await?;

        info!(intent_id = %intent_id, leg, market_id, ?side, price, size, nonce, "polymarket_submitting_order");

        let payload = serde_json::json!({
            "market": market_id,
            "maker": order.maker.to_string(),
            "outcome": order.outcome,
            "makerAmount": maker_amount,
            "price": price_ticks,
            "nonce": nonce,
            "expiry": expiry,
            "salt": order.salt.to_string(),
            "isBuy": order.isBuy,
            "signature": signature,
        });

        let response = self.post_with_retries("/orders", &payload).await?;
        if !response.status().is_success() {
            warn!(status = %response.status(), intent_id = %intent_id, leg, "polymarket_order_rejected");
            return Ok(None);
        }
        let body: serde_json::Value = response.json().await?;
        let order_id = body.get("order_id").or_else(|| body.get("id")).and_then(|v| v.as_str()).map(str::to_string);
        Ok(order_id)
    }

    async fn cancel_order(&self, order_id: &str) -> crate::Result<()> {
        let response = self.client.delete(format!("{}/orders/{order_id}", self.base_url)).send().await?;
        if !response.status().is_success() {
            warn!(order_id, status = %response.status(), "polymarket_cancel_failed");
        }
        Ok(())
    }
}

#[async_trait]
impl ExecutionClient for PolymarketExecutor {
    async fn place_primary(&self, intent: &ExecutionIntent) -> crate::Result<bool> {
        let order_intent = intent
            .primary_order
            .as_ref()
            .ok_or_else(|| Error::Execution("execution intent missing primary_order".into()))?;

        let order_id = self.submit_order(order_intent, "primary", intent.intent_id).await?;
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
        if edge.hedge.venue != crate::domain::Venue::Polymarket {
            info!(intent_id = %intent.intent_id, "polymarket_skip_non_polymarket_hedge");
            return Ok(true);
        }

        let order_intent = intent
            .hedge_order
            .as_ref()
            .ok_or_else(|| Error::Execution("execution intent missing hedge_order".into()))?;

        let order_id = self.submit_order(order_intent, "hedge", intent.intent_id).await?;
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
            info!(intent_id = %intent.intent_id, leg, order_id, "polymarket_order_cancelled");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_to_ticks_rejects_out_of_range() {
        assert!(price_to_ticks(0.0).is_err());
        assert!(price_to_ticks(1.0).is_err());
        assert!(price_to_ticks(0.5).is_ok());
    }

    #[test]
    fn size_to_base_units_rejects_non_positive() {
        assert!(size_to_base_units(0.0).is_err());
        assert!(size_to_base_units(-1.0).is_err());
        assert_eq!(size_to_base_units(1.0).unwrap(), 1_000_000);
    }

    #[test]
    fn outcome_index_is_stable_per_side() {
        assert_eq!(outcome_index(OrderSide::Buy), 0);
        assert_eq!(outcome_index(OrderSide::Sell), 1);
    }

    #[test]
    fn new_rejects_malformed_private_key() {
        let config = PolymarketConfig::default();
        let client = Client::new();
        assert!(PolymarketExecutor::new(&config, "not-a-key", client).is_err());
    }
}
