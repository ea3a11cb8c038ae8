//! OpenAI-compatible API provider
//!
//! Supports OpenAI, Groq, xAI and self-hosted OpenAI-compatible servers.

use serde::{Deserialize, Serialize};

use super::{ProviderConfig, http_client, http_error};
use crate::infrastructure::llm::{Context, Error, Provider, Response, TokenUsage};

/// OpenAI API request format
#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

/// OpenAI API response format
#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    model: String,
    choices: Vec<OpenAIChoice>,
    #[serde(default)]
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

/// Execute a chat request using an OpenAI-compatible API
pub async fn chat(provider: Provider, config: ProviderConfig, context: Context) -> Result<Response, Error> {
    let name = provider.as_str();
    let base_url = config
        .base_url
        .unwrap_or_else(|| "https://api.openai.com/v1".to_string());
    let model = context.model.unwrap_or_else(|| {
        if config.default_model.is_empty() {
            "gpt-4o-mini".to_string()
        } else {
            config.default_model.clone()
        }
    });

    let url = format!("{}/chat/completions", base_url.trim_end_matches('/'));
    let request = OpenAIRequest {
        model,
        messages: context
            .messages
            .into_iter()
            .map(|msg| OpenAIMessage {
                role: msg.role.as_str().to_string(),
                content: msg.content,
            })
            .collect(),
        temperature: context.temperature,
        max_tokens: context.max_tokens,
    };

    let mut request_builder = http_client()
        .post(&url)
        .header("Content-Type", "application/json")
        .json(&request);
    if !config.api_key.is_empty() {
        request_builder = request_builder.bearer_auth(&config.api_key);
    }
    if let Some(timeout_secs) = config.timeout {
        request_builder = request_builder.timeout(std::time::Duration::from_secs(timeout_secs));
    }

    let response = request_builder
        .send()
        .await
        .map_err(|e| Error::new(name, format!("HTTP request failed: {}", e)))?;

    if !response.status().is_success() {
        return Err(http_error(name, response).await);
    }

    let openai_response: OpenAIResponse = response
        .json()
        .await
        .map_err(|e| Error::new(name, format!("Failed to parse response: {}", e)))?;

    let content = openai_response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| Error::new(name, "No choices in response"))?;

    let usage = openai_response
        .usage
        .map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        })
        .unwrap_or_default();

    Ok(Response {
        content,
        model: openai_response.model,
        usage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_without_usage_parses() {
        let raw = r#"{"id":"x","model":"llama3","choices":[{"index":0,"message":{"role":"assistant","content":"hi"},"finish_reason":"stop"}]}"#;
        let parsed: OpenAIResponse = serde_json::from_str(raw).unwrap();
        assert!(parsed.usage.is_none());
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("hi"));
    }
}
