//! Anthropic (Claude) Messages API provider

use serde::{Deserialize, Serialize};

use super::{ProviderConfig, http_client, http_error};
use crate::infrastructure::llm::{Context, Error, MessageRole, Response, TokenUsage};

const API_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-3-5-haiku-20241022";

/// Anthropic API request format
#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

/// Anthropic API response format
#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    model: String,
    content: Vec<AnthropicResponseContent>,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponseContent {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

fn build_request(model: String, context: Context) -> AnthropicRequest {
    let mut system = None;
    let mut messages = Vec::new();
    for msg in context.messages {
        match msg.role {
            MessageRole::System => system = Some(msg.content),
            role => messages.push(AnthropicMessage {
                role: role.as_str().to_string(),
                content: msg.content,
            }),
        }
    }

    AnthropicRequest {
        model,
        max_tokens: context.max_tokens.unwrap_or(4096),
        messages,
        system,
        temperature: context.temperature,
    }
}

/// Execute a chat request using Anthropic's API
pub async fn chat(config: ProviderConfig, context: Context) -> Result<Response, Error> {
    let base_url = config
        .base_url
        .unwrap_or_else(|| "https://api.anthropic.com".to_string());
    let model = context.model.clone().unwrap_or_else(|| {
        if config.default_model.is_empty() {
            DEFAULT_MODEL.to_string()
        } else {
            config.default_model.clone()
        }
    });

    let url = format!("{}/v1/messages", base_url);
    let request = build_request(model, context);

    let mut request_builder = http_client()
        .post(&url)
        .header("x-api-key", config.api_key)
        .header("anthropic-version", API_VERSION)
        .header("Content-Type", "application/json")
        .json(&request);

    if let Some(timeout_secs) = config.timeout {
        request_builder = request_builder.timeout(std::time::Duration::from_secs(timeout_secs));
    }

    let response = request_builder
        .send()
        .await
        .map_err(|e| Error::new("anthropic", format!("HTTP request failed: {}", e)))?;

    if !response.status().is_success() {
        return Err(http_error("anthropic", response).await);
    }

    let anthropic_response: AnthropicResponse = response
        .json()
        .await
        .map_err(|e| Error::new("anthropic", format!("Failed to parse response: {}", e)))?;

    let content: String = anthropic_response
        .content
        .into_iter()
        .filter(|block| block.content_type == "text")
        .map(|block| block.text)
        .collect();

    let usage = anthropic_response.usage;
    Ok(Response {
        content,
        model: anthropic_response.model,
        usage: TokenUsage {
            prompt_tokens: usage.input_tokens,
            completion_tokens: usage.output_tokens,
            total_tokens: usage.input_tokens + usage.output_tokens,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_message_is_lifted_out() {
        let context = Context::prompt("classify this").add_system_message("You are terse.");
        let request = build_request("m".to_string(), context);
        assert_eq!(request.system.as_deref(), Some("You are terse."));
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.messages[0].role, "user");
        assert_eq!(request.max_tokens, 4096);
    }

    #[test]
    fn test_response_text_blocks_are_joined() {
        let raw = r#"{"id":"msg_1","model":"claude","role":"assistant","content":[
            {"type":"text","text":"{\"a\":"},{"type":"text","text":"1}"}],
            "stop_reason":"end_turn","usage":{"input_tokens":10,"output_tokens":3}}"#;
        let parsed: AnthropicResponse = serde_json::from_str(raw).unwrap();
        let text: String = parsed.content.into_iter().map(|b| b.text).collect();
        assert_eq!(text, "{\"a\":1}");
        assert_eq!(parsed.usage.output_tokens, 3);
    }
}
