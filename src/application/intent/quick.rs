//! # Quick Classifier
//!
//! Free keyword heuristics sharing the [`IntentClassifier`] interface with the
//! paid remote classifier. Also decides whether a message is worth a paid call at all.

use async_trait::async_trait;

use crate::domain::traits::IntentClassifier;
use crate::domain::types::{ClassifiedIntent, IntentCategory};

const QUESTION_WORDS: [&str; 14] = [
    "what", "why", "how", "when", "where", "who", "which", "is", "are", "does", "do", "can",
    "should", "will",
];

const GREETINGS: [&str; 7] = ["hi", "hello", "hey", "yo", "morning", "good morning", "evening"];

const ACKNOWLEDGEMENTS: [&str; 8] = [
    "thanks",
    "thank you",
    "great",
    "perfect",
    "nice",
    "good job",
    "that worked",
    "awesome",
];

const CODE_VERBS: [&str; 13] = [
    "fix", "refactor", "implement", "add", "write", "update", "debug", "test", "review",
    "rename", "delete", "remove", "deploy",
];

fn starts_with_phrase(text: &str, phrase: &str) -> bool {
    text == phrase
        || text
            .strip_prefix(phrase)
            .is_some_and(|rest| rest.starts_with([' ', ',', '!', '.']))
}

#[derive(Debug, Default, Clone)]
pub struct QuickClassifier;

impl QuickClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify_text(&self, text: &str) -> ClassifiedIntent {
        let lower = text.trim().to_lowercase();
        let first_word = lower.split_whitespace().next().unwrap_or("");

        if GREETINGS.iter().any(|g| starts_with_phrase(&lower, g)) && lower.split_whitespace().count() <= 3 {
            return ClassifiedIntent::new(IntentCategory::Question, "greet", 0.9);
        }

        if ACKNOWLEDGEMENTS.iter().any(|a| starts_with_phrase(&lower, a)) {
            return ClassifiedIntent::new(IntentCategory::Feedback, "acknowledge", 0.9)
                .with_target(text.trim());
        }

        let asks = QUESTION_WORDS.contains(&first_word);
        let question_mark = lower.ends_with('?');
        if asks || question_mark {
            let confidence = if asks && question_mark { 0.9 } else { 0.75 };
            return ClassifiedIntent::new(IntentCategory::Question, "ask", confidence)
                .with_target(text.trim());
        }

        if CODE_VERBS.contains(&first_word) && lower.split_whitespace().count() >= 2 {
            let rest = text
                .trim()
                .split_once(char::is_whitespace)
                .map(|(_, rest)| rest.trim().to_string())
                .unwrap_or_default();
            return ClassifiedIntent::new(IntentCategory::Command, first_word, 0.88).with_target(rest);
        }

        ClassifiedIntent::new(IntentCategory::Unclear, "unknown", 0.3)
    }
}

#[async_trait]
impl IntentClassifier for QuickClassifier {
    async fn classify(&self, text: &str) -> Result<(ClassifiedIntent, f64), String> {
        Ok((self.classify_text(text), 0.0))
    }
}

/// Cheap gate for the paid classifier: very short or purely social messages
/// are not worth a model call, and go straight to the full parse fallback.
pub fn needs_classification(text: &str) -> bool {
    let lower = text.trim().to_lowercase();
    let words = lower.split_whitespace().count();
    if words < 3 {
        return false;
    }
    !GREETINGS.iter().any(|g| lower == *g) && !ACKNOWLEDGEMENTS.iter().any(|a| lower == *a)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wh_question_with_mark_is_confident() {
        let intent = QuickClassifier::new().classify_text("Why is plex buffering?");
        assert_eq!(intent.category, IntentCategory::Question);
        assert!(intent.confidence >= 0.85);
    }

    #[test]
    fn test_question_without_mark_is_not_confident() {
        let intent = QuickClassifier::new().classify_text("how do I rotate the logs");
        assert_eq!(intent.category, IntentCategory::Question);
        assert!(intent.confidence < 0.85);
    }

    #[test]
    fn test_code_verb_is_command() {
        let intent = QuickClassifier::new().classify_text("fix the login redirect");
        assert_eq!(intent.category, IntentCategory::Command);
        assert_eq!(intent.action, "fix");
        assert_eq!(intent.target.as_deref(), Some("the login redirect"));
    }

    #[test]
    fn test_greeting_and_thanks() {
        let quick = QuickClassifier::new();
        assert_eq!(quick.classify_text("hey").action, "greet");
        assert_eq!(quick.classify_text("thanks, that worked").category, IntentCategory::Feedback);
        assert_ne!(quick.classify_text("hello there friend, deploy").action, "acknowledge");
    }

    #[test]
    fn test_unclear_fallback() {
        let intent = QuickClassifier::new().classify_text("sonarr radarr lidarr");
        assert_eq!(intent.category, IntentCategory::Unclear);
        assert!(intent.confidence < 0.5);
    }

    #[test]
    fn test_needs_classification() {
        assert!(!needs_classification("hi"));
        assert!(!needs_classification("plex?"));
        assert!(needs_classification("the backup job looks stuck again"));
    }

    #[tokio::test]
    async fn test_trait_classification_is_free() {
        let (_, cost) = QuickClassifier::new().classify("what time is it?").await.unwrap();
        assert_eq!(cost, 0.0);
    }
}
