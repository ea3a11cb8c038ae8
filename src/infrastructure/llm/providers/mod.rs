//! # LLM Providers
//!
//! Implementations for the supported APIs:
//! - OpenAI-compatible (OpenAI, Groq, xAI, local servers)
//! - Anthropic (Claude)

mod anthropic;
mod openai;

use reqwest::Client;
use std::sync::OnceLock;

use crate::domain::config::AgentConfig;
use crate::infrastructure::llm::{Context, Error, Provider, Response};

/// HTTP client reused across requests
fn http_client() -> &'static Client {
    static CLIENT: OnceLock<Client> = OnceLock::new();
    CLIENT.get_or_init(|| {
        Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .unwrap_or_else(|_| Client::new())
    })
}

/// Configuration for a provider
#[derive(Clone)]
pub struct ProviderConfig {
    /// API key (empty for keyless local servers)
    pub api_key: String,
    /// Base URL (for non-default endpoints)
    pub base_url: Option<String>,
    /// Default model
    pub default_model: String,
    /// Timeout in seconds
    pub timeout: Option<u64>,
}

impl ProviderConfig {
    pub fn from_agent_config(config: &AgentConfig, provider: Provider) -> Result<Self, Error> {
        let api_key = if let Some(key) = &config.api_key {
            key.clone()
        } else if let Some(env_var) = &config.api_key_env {
            std::env::var(env_var).map_err(|e| {
                Error::new(
                    &config.provider,
                    format!("API key env var {} not set: {}", env_var, e),
                )
            })?
        } else if provider.requires_api_key() {
            return Err(Error::new(
                &config.provider,
                "No API key provided - set api_key or api_key_env",
            ));
        } else {
            String::new()
        };

        Ok(Self {
            api_key,
            base_url: config.endpoint.clone(),
            default_model: config.model.clone(),
            timeout: config.timeout,
        })
    }

    fn with_base_url(self, url: &str) -> Self {
        Self {
            base_url: Some(self.base_url.unwrap_or_else(|| url.to_string())),
            ..self
        }
    }
}

/// Execute a chat request with the specified provider
pub async fn chat(
    provider: Provider,
    config: ProviderConfig,
    context: Context,
) -> Result<Response, Error> {
    match provider {
        Provider::OpenAI => openai::chat(provider, config, context).await,
        Provider::Groq => {
            openai::chat(provider, config.with_base_url("https://api.groq.com/openai/v1"), context).await
        }
        Provider::XAI => openai::chat(provider, config.with_base_url("https://api.x.ai/v1"), context).await,
        Provider::Local => {
            if config.base_url.is_none() {
                return Err(Error::new("local", "Local provider needs an endpoint"));
            }
            openai::chat(provider, config, context).await
        }
        Provider::Anthropic => anthropic::chat(config, context).await,
    }
}

/// Builds an error from a non-success HTTP response. The status code is kept in
/// the message so callers can spot rate limits (429).
async fn http_error(provider: &str, response: reqwest::Response) -> Error {
    let status = response.status();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read error response".to_string());

    let detail = serde_json::from_str::<serde_json::Value>(&error_text)
        .ok()
        .and_then(|json| {
            let error = json.get("error")?;
            let message = error.get("message")?.as_str()?.to_string();
            Some(match error.get("type").and_then(|t| t.as_str()) {
                Some(kind) => format!("{}: {}", kind, message),
                None => message,
            })
        })
        .unwrap_or(error_text);

    Error::new(provider, format!("HTTP {}: {}", status, detail))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_provider_needs_no_key() {
        let agent = AgentConfig {
            provider: "ollama".to_string(),
            endpoint: Some("http://localhost:11434/v1".to_string()),
            ..AgentConfig::default()
        };
        let config = ProviderConfig::from_agent_config(&agent, Provider::Local).unwrap();
        assert!(config.api_key.is_empty());

        let hosted = AgentConfig {
            provider: "openai".to_string(),
            ..AgentConfig::default()
        };
        assert!(ProviderConfig::from_agent_config(&hosted, Provider::OpenAI).is_err());
    }

    #[test]
    fn test_configured_endpoint_wins_over_default() {
        let config = ProviderConfig {
            api_key: "k".to_string(),
            base_url: Some("http://proxy".to_string()),
            default_model: String::new(),
            timeout: None,
        };
        assert_eq!(
            config.with_base_url("https://api.groq.com/openai/v1").base_url.as_deref(),
            Some("http://proxy")
        );
    }
}
