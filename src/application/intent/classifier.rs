//! # Remote Classifier
//!
//! The paid tiers of the cascade. [`LlmClassifier`] asks a cheap model for a
//! [`ClassifiedIntent`]; [`LlmParser`] asks an expensive model for a full
//! vocabulary action and is the unconditional last resort.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use crate::application::utils::extract_json;
use crate::domain::traits::{IntentClassifier, LlmProvider};
use crate::domain::types::{Action, ClassifiedIntent, ParsedIntent};
use crate::strings::prompts;

pub struct LlmClassifier {
    llm: Arc<dyn LlmProvider>,
    agent: String,
}

impl LlmClassifier {
    pub fn new(llm: Arc<dyn LlmProvider>, agent: impl Into<String>) -> Self {
        Self {
            llm,
            agent: agent.into(),
        }
    }
}

#[async_trait]
impl IntentClassifier for LlmClassifier {
    async fn classify(&self, text: &str) -> Result<(ClassifiedIntent, f64), String> {
        let completion = self
            .llm
            .completion(&prompts::classify_prompt(text), &self.agent)
            .await?;

        let json = extract_json(&completion.content)
            .ok_or_else(|| "Classifier returned no JSON".to_string())?;
        let mut intent: ClassifiedIntent =
            serde_json::from_str(json).map_err(|e| format!("Classifier returned invalid JSON: {}", e))?;
        intent.confidence = intent.confidence.clamp(0.0, 1.0);

        Ok((intent, completion.cost))
    }
}

#[derive(Debug, Deserialize)]
struct RawParse {
    action: String,
    #[serde(default)]
    target: Option<String>,
    #[serde(default)]
    prompt: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    message: Option<String>,
}

/// A failed full parse still cost whatever the call consumed.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseFailure {
    pub message: String,
    pub cost: f64,
}

pub struct LlmParser {
    llm: Arc<dyn LlmProvider>,
    agent: String,
}

impl LlmParser {
    pub fn new(llm: Arc<dyn LlmProvider>, agent: impl Into<String>) -> Self {
        Self {
            llm,
            agent: agent.into(),
        }
    }

    pub async fn parse(&self, text: &str, context: &str) -> Result<ParsedIntent, ParseFailure> {
        let actions: Vec<&str> = Action::ALL
            .iter()
            .filter(|a| !matches!(a, Action::Denied))
            .map(|a| a.as_str())
            .collect();
        let prompt = prompts::parse_prompt(text, context, &actions);

        let completion = self
            .llm
            .completion(&prompt, &self.agent)
            .await
            .map_err(|e| ParseFailure {
                message: format!("Could not understand the request: {}", e),
                cost: 0.0,
            })?;
        let cost = completion.cost;

        let raw: RawParse = extract_json(&completion.content)
            .ok_or_else(|| "no JSON in response".to_string())
            .and_then(|json| serde_json::from_str(json).map_err(|e| e.to_string()))
            .map_err(|e| ParseFailure {
                message: format!("Could not understand the request: {}", e),
                cost,
            })?;

        let confidence = raw.confidence.unwrap_or(0.8);
        let intent = match Action::from_str(&raw.action) {
            // The model may not grant itself a denial
            Some(action) if action != Action::Denied => ParsedIntent::llm(action, confidence, cost),
            _ => {
                tracing::warn!("Parser returned action outside the vocabulary: {}", raw.action);
                return Ok(ParsedIntent::llm(Action::Unknown, 0.0, cost)
                    .with_message(format!("Unrecognized action '{}'", raw.action)));
            }
        };

        let intent = intent.with_target(raw.target).with_prompt(raw.prompt);
        Ok(match raw.message {
            Some(message) => intent.with_message(message),
            None => intent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{IntentCategory, ResolutionMethod};
    use crate::test_support::MockLlm;

    #[tokio::test]
    async fn test_classifier_parses_fenced_json() {
        let llm = Arc::new(MockLlm::new(Ok(
            "```json\n{\"category\":\"command\",\"action\":\"restart\",\"target\":\"plex\",\"confidence\":0.92}\n```",
        )));
        let classifier = LlmClassifier::new(llm.clone(), "classifier");
        let (intent, cost) = classifier.classify("bounce plex for me").await.unwrap();
        assert_eq!(intent.category, IntentCategory::Command);
        assert_eq!(intent.target.as_deref(), Some("plex"));
        assert!(!intent.is_negation);
        assert_eq!(cost, 0.01);
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_classifier_rejects_prose() {
        let llm = Arc::new(MockLlm::new(Ok("I think this is a command.")));
        let classifier = LlmClassifier::new(llm, "classifier");
        assert!(classifier.classify("bounce plex").await.is_err());
    }

    #[tokio::test]
    async fn test_parser_maps_vocabulary_action() {
        let llm = Arc::new(MockLlm::new(Ok(
            r#"{"action":"homelab_logs","target":"sonarr","confidence":0.8,"message":"tail logs"}"#,
        )));
        let parser = LlmParser::new(llm, "parser");
        let intent = parser.parse("what has sonarr been saying", "").await.unwrap();
        assert_eq!(intent.action, Action::HomelabLogs);
        assert_eq!(intent.target.as_deref(), Some("sonarr"));
        assert_eq!(intent.resolution_method, ResolutionMethod::Llm);
        assert_eq!(intent.estimated_cost, 0.01);
    }

    #[tokio::test]
    async fn test_parser_unknown_action_becomes_unknown() {
        let llm = Arc::new(MockLlm::new(Ok(r#"{"action":"format_disk","confidence":0.99}"#)));
        let intent = LlmParser::new(llm, "parser").parse("wipe it", "").await.unwrap();
        assert_eq!(intent.action, Action::Unknown);
        assert_eq!(intent.confidence, 0.0);

        let llm = Arc::new(MockLlm::new(Ok(r#"{"action":"denied","confidence":0.99}"#)));
        let intent = LlmParser::new(llm, "parser").parse("x", "").await.unwrap();
        assert_eq!(intent.action, Action::Unknown);
    }

    #[tokio::test]
    async fn test_parser_failure_keeps_cost() {
        let llm = Arc::new(MockLlm::new(Ok("sorry, no idea")));
        let failure = LlmParser::new(llm, "parser").parse("x", "").await.unwrap_err();
        assert_eq!(failure.cost, 0.01);

        let llm = Arc::new(MockLlm::new(Err("connection refused")));
        let failure = LlmParser::new(llm, "parser").parse("x", "").await.unwrap_err();
        assert_eq!(failure.cost, 0.0);
        assert!(failure.message.contains("connection refused"));
    }
}
