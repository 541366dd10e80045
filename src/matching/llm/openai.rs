use reqwest::Client;
use serde_json::{json, Value};

use crate::{Error, Result};

use super::client::ChatMessage;

const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Calls the OpenAI chat completions API with forced JSON-object output,
/// returning the parsed content plus prompt/completion token counts.
pub async fn call(http: &Client, api_key: &str, model: &str, messages: &[ChatMessage], max_tokens: u32) -> Result<(Value, u32, u32)> {
    let payload = json!({
        "model": model,
        "max_tokens": max_tokens,
        "temperature": 0.0,
        "response_format": {"type": "json_object"},
        "messages": messages.iter().map(|m| json!({"role": m.role, "content": m.content})).collect::<Vec<_>>(),
    });

    let response = http
        .post(OPENAI_URL)
        .bearer_auth(api_key)
        .json(&payload)
        .send()
        .await?
        .error_for_status()?;

    let body: Value = response.json().await?;

    let text = body["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| Error::Matching("openai response missing choices[0].message.content".into()))?;

    let content: Value = serde_json::from_str(text)?;

    let prompt_tokens = body["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32;
    let completion_tokens = body["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32;

    Ok((content, prompt_tokens, completion_tokens))
}
