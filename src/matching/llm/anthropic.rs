use reqwest::Client;
use serde_json::{json, Value};

use crate::{Error, Result};

use super::client::ChatMessage;

const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Calls the Anthropic Messages API, returning the parsed JSON content of
/// the first text block plus prompt/completion token counts.
pub async fn call(http: &Client, api_key: &str, model: &str, messages: &[ChatMessage], max_tokens: u32) -> Result<(Value, u32, u32)> {
    let payload = json!({
        "model": model,
        "max_tokens": max_tokens,
        "temperature": 0.0,
        "messages": messages.iter().map(|m| json!({"role": m.role, "content": m.content})).collect::<Vec<_>>(),
    });

    let response = http
        .post(ANTHROPIC_URL)
        .header("x-api-key", api_key)
        .header("anthropic-version", ANTHROPIC_VERSION)
        .json(&payload)
        .send()
        .await?
        .error_for_status()?;

    let body: Value = response.json().await?;

    let text = body["content"]
        .get(0)
        .and_then(|block| block["text"].as_str())
        .ok_or_else(|| Error::Matching("anthropic response missing content[0].text".into()))?;

    let content: Value = serde_json::from_str(text)?;

    let prompt_tokens = body["usage"]["input_tokens"].as_u64().unwrap_or(0) as u32;
    let completion_tokens = body["usage"]["output_tokens"].as_u64().unwrap_or(0) as u32;

    Ok((content, prompt_tokens, completion_tokens))
}
