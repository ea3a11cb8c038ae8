//! # LLM Client
//!
//! Provides the `Client` struct, the entry point for model calls.
//! It routes requests to the provider named in the agent's configuration and
//! turns token usage into an estimated cost.

use async_trait::async_trait;

use crate::domain::config::{AgentConfig, AgentsConfig};
use crate::domain::traits::{Completion, LlmProvider};
use crate::infrastructure::llm::providers;
use crate::infrastructure::llm::{Context, Error, Provider, Response};

pub struct Client {
    agents: AgentsConfig,
}

impl Client {
    pub fn new(agents: AgentsConfig) -> Self {
        Self { agents }
    }

    fn agent(&self, agent_name: &str) -> Result<(&AgentConfig, Provider), Error> {
        let agent_config = self
            .agents
            .get(agent_name)
            .ok_or_else(|| Error::new(agent_name, "Agent not found"))?;
        let provider = Provider::from_str(&agent_config.provider)
            .ok_or_else(|| Error::new(&agent_config.provider, "Unknown provider"))?;
        Ok((agent_config, provider))
    }

    /// Send a prompt to a configured agent.
    ///
    /// # Arguments
    /// * `agent_name` - The agent name (e.g., "classifier", "parser")
    /// * `prompt` - The prompt text
    pub async fn prompt(&self, agent_name: &str, prompt: &str) -> Result<Response, Error> {
        let (agent_config, provider) = self.agent(agent_name)?;
        let provider_config = providers::ProviderConfig::from_agent_config(agent_config, provider)?;

        let context = Context::prompt(prompt).with_max_tokens(agent_config.max_tokens);
        tracing::debug!("Prompting agent '{}' ({})", agent_name, provider.as_str());
        providers::chat(provider, provider_config, context).await
    }

    /// Estimated cost of a response under the agent's configured prices.
    pub fn cost_of(&self, agent_name: &str, response: &Response) -> f64 {
        self.agents
            .get(agent_name)
            .map(|a| response.usage.cost(a.input_price, a.output_price))
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmProvider for Client {
    async fn completion(&self, prompt: &str, agent_name: &str) -> Result<Completion, String> {
        let response = self
            .prompt(agent_name, prompt)
            .await
            .map_err(|e| e.to_string())?;
        let cost = self.cost_of(agent_name, &response);
        tracing::debug!(
            "Agent '{}' used {} tokens (${:.5})",
            agent_name,
            response.usage.total_tokens,
            cost
        );
        Ok(Completion {
            content: response.content,
            cost,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::llm::TokenUsage;

    fn agents() -> AgentsConfig {
        let mut agents = AgentsConfig::new();
        agents.insert(
            "classifier".to_string(),
            AgentConfig {
                provider: "anthropic".to_string(),
                model: "claude-3-5-haiku-20241022".to_string(),
                api_key: Some("test".to_string()),
                input_price: 0.8,
                output_price: 4.0,
                ..AgentConfig::default()
            },
        );
        agents.insert(
            "broken".to_string(),
            AgentConfig {
                provider: "carrier-pigeon".to_string(),
                ..AgentConfig::default()
            },
        );
        agents
    }

    #[test]
    fn test_provider_from_str() {
        assert_eq!(Provider::from_str("openai"), Some(Provider::OpenAI));
        assert_eq!(Provider::from_str("anthropic"), Some(Provider::Anthropic));
        assert_eq!(Provider::from_str("claude"), Some(Provider::Anthropic));
        assert_eq!(Provider::from_str("groq"), Some(Provider::Groq));
        assert_eq!(Provider::from_str("ollama"), Some(Provider::Local));
        assert_eq!(Provider::from_str("unknown"), None);
    }

    #[test]
    fn test_cost_uses_agent_prices() {
        let client = Client::new(agents());
        let response = Response {
            content: String::new(),
            model: "m".to_string(),
            usage: TokenUsage {
                prompt_tokens: 1_000,
                completion_tokens: 500,
                total_tokens: 1_500,
            },
        };
        let cost = client.cost_of("classifier", &response);
        assert!((cost - 0.0028).abs() < 1e-9);
        assert_eq!(client.cost_of("missing", &response), 0.0);
    }

    #[tokio::test]
    async fn test_unknown_agent_and_provider_are_errors() {
        let client = Client::new(agents());
        let err = client.completion("hi", "missing").await.unwrap_err();
        assert!(err.contains("Agent not found"));
        let err = client.completion("hi", "broken").await.unwrap_err();
        assert!(err.contains("Unknown provider"));
    }
}
