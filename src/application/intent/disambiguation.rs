//! # Disambiguation Engine
//!
//! Priority-ordered rewrite rules for phrasings that generic classification gets wrong:
//! polite requests, negations, corrections, comparisons and build requests.
//! The highest-priority matching rule wins and its output is used verbatim.

use regex::{Captures, Regex};

use crate::domain::types::{ClassifiedIntent, IntentCategory};

pub type Transform = fn(&Captures, &str) -> ClassifiedIntent;

pub struct DisambiguationRule {
    pub name: &'static str,
    pub priority: u32,
    pub pattern: Regex,
    /// A match is ignored when this also matches.
    pub exclude: Option<Regex>,
    pub transform: Transform,
}

impl DisambiguationRule {
    pub fn new(name: &'static str, priority: u32, pattern: &str, transform: Transform) -> Self {
        Self {
            name,
            priority,
            pattern: Regex::new(&format!("(?i){}", pattern))
                .unwrap_or_else(|e| panic!("invalid disambiguation rule {}: {}", name, e)),
            exclude: None,
            transform,
        }
    }

    pub fn excluding(mut self, pattern: &str) -> Self {
        self.exclude = Some(
            Regex::new(&format!("(?i){}", pattern))
                .unwrap_or_else(|e| panic!("invalid exclusion for {}: {}", self.name, e)),
        );
        self
    }

    fn apply(&self, text: &str) -> Option<ClassifiedIntent> {
        if self.exclude.as_ref().is_some_and(|ex| ex.is_match(text)) {
            return None;
        }
        self.pattern
            .captures(text)
            .map(|caps| (self.transform)(&caps, text))
    }
}

/// A rule hit: which rule fired and what it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Disambiguation {
    pub rule: &'static str,
    pub intent: ClassifiedIntent,
}

pub struct DisambiguationEngine {
    rules: Vec<DisambiguationRule>,
}

impl DisambiguationEngine {
    /// Rules are kept in descending priority; equal priorities keep declaration order.
    pub fn new(mut rules: Vec<DisambiguationRule>) -> Self {
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        Self { rules }
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name).collect()
    }

    /// First matching rule in priority order, if any.
    pub fn disambiguate(&self, text: &str) -> Option<Disambiguation> {
        let text = text.trim();
        self.rules.iter().find_map(|rule| {
            rule.apply(text).map(|intent| {
                tracing::debug!("Disambiguation rule '{}' matched: {:?}", rule.name, intent);
                Disambiguation {
                    rule: rule.name,
                    intent,
                }
            })
        })
    }
}

impl Default for DisambiguationEngine {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

fn group(caps: &Captures, name: &str) -> String {
    caps.name(name)
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

const QUESTION_VERBS: [&str; 7] = [
    "tell", "explain", "describe", "summarize", "summarise", "clarify", "show",
];

fn command_or_question(verb: &str, rest: &str, confidence: f64) -> ClassifiedIntent {
    let verb = verb.to_lowercase();
    let category = if QUESTION_VERBS.contains(&verb.as_str()) {
        IntentCategory::Question
    } else {
        IntentCategory::Command
    };
    ClassifiedIntent::new(category, verb, confidence).with_target(rest)
}

/// The built-in rule set.
pub fn default_rules() -> Vec<DisambiguationRule> {
    vec![
        DisambiguationRule::new(
            "negation_command",
            100,
            r"^(?:please\s+)?(?:don'?t|do\s+not|never)\s+(?P<rest>.+?)[.!]*$",
            |caps, _| {
                ClassifiedIntent::new(IntentCategory::Command, "stop", 0.95)
                    .with_target(group(caps, "rest"))
                    .negated()
            },
        ),
        DisambiguationRule::new(
            "stop_command",
            95,
            r"^(?:please\s+)?(?:stop|halt|abort|cancel)(?:\s+(?:everything|now|all|that))?[.!]*$",
            |_, _| ClassifiedIntent::new(IntentCategory::Command, "stop", 0.9).negated(),
        ),
        DisambiguationRule::new(
            "feedback_marker",
            90,
            r"^(?:no,?\s+actually|actually,?\s+no|this\s+is\s+(?:wrong|incorrect|not\s+right)|that'?s\s+(?:wrong|incorrect|not\s+(?:right|what\s+i\s+(?:meant|asked))))[,.!:\s]*(?P<rest>.*)$",
            |caps, _| {
                ClassifiedIntent::new(IntentCategory::Feedback, "correct", 0.9)
                    .with_target(group(caps, "rest"))
            },
        ),
        DisambiguationRule::new(
            "prd_build_request",
            85,
            r"^(?:(?:can|could|would)\s+you\s+)?(?:please\s+)?(?:build\s+me\s+(?P<what>.+)|(?:build|make|create)\s+(?:me\s+)?an?\s+(?P<kind>(?:app|application|website|site|tool|service|api|bot|dashboard|cli|game)\b.*))$",
            |caps, _| {
                let what = caps
                    .name("what")
                    .or_else(|| caps.name("kind"))
                    .map(|m| m.as_str().trim_end_matches(['?', '.', '!']).to_string())
                    .unwrap_or_default();
                ClassifiedIntent::new(IntentCategory::Prd, "build", 0.9).with_target(what)
            },
        )
        .excluding(r"\bcreate\s+project\b"),
        DisambiguationRule::new(
            "polite_command",
            80,
            r"^(?:can|could|would|will)\s+you\s+(?:please\s+)?(?P<verb>[a-z]+)\s*(?P<rest>.*?)[?.!]*$",
            |caps, _| command_or_question(&group(caps, "verb"), &group(caps, "rest"), 0.85),
        ),
        DisambiguationRule::new(
            "please_imperative",
            75,
            r"^(?:please\s+(?P<verb>[a-z]+)\s*(?P<rest>.*?)|(?P<verb2>[a-z]+)\s+(?P<rest2>.*?),?\s+please)[.!]*$",
            |caps, _| {
                let verb = caps
                    .name("verb")
                    .or_else(|| caps.name("verb2"))
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default();
                let rest = caps
                    .name("rest")
                    .or_else(|| caps.name("rest2"))
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default();
                command_or_question(&verb, &rest, 0.85)
            },
        ),
        DisambiguationRule::new(
            "reference_marker",
            70,
            r"\b(?:just\s+|similar\s+to\s+|looks?\s+)?like\s+(?P<reference>[^,.?!]+)",
            |caps, _| {
                ClassifiedIntent::new(IntentCategory::Question, "compare", 0.85)
                    .with_target(group(caps, "reference"))
            },
        )
        .excluding(r"\b(?:would|'d|i|you|we|they)\s+like\b|\blike\s+to\b"),
        DisambiguationRule::new(
            "what_about",
            60,
            r"^(?:what|how)\s+about\s+(?P<what>.+?)\??$",
            |caps, _| {
                ClassifiedIntent::new(IntentCategory::Question, "inquire", 0.7)
                    .with_target(group(caps, "what"))
            },
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> DisambiguationEngine {
        DisambiguationEngine::default()
    }

    #[test]
    fn test_negation_beats_everything() {
        let hit = engine().disambiguate("don't restart sonarr").unwrap();
        assert_eq!(hit.rule, "negation_command");
        assert_eq!(
            hit.intent,
            ClassifiedIntent {
                category: IntentCategory::Command,
                action: "stop".into(),
                target: Some("restart sonarr".into()),
                confidence: 0.95,
                is_negation: true,
            }
        );
    }

    #[test]
    fn test_rules_sorted_by_priority() {
        let names = engine().rule_names();
        assert_eq!(names.first(), Some(&"negation_command"));
        assert_eq!(names.last(), Some(&"what_about"));
    }

    #[test]
    fn test_selection_is_deterministic() {
        let engine = engine();
        let first = engine.disambiguate("could you build me a habit tracker?");
        for _ in 0..5 {
            assert_eq!(engine.disambiguate("could you build me a habit tracker?"), first);
        }
        let hit = first.unwrap();
        assert_eq!(hit.rule, "prd_build_request");
        assert_eq!(hit.intent.category, IntentCategory::Prd);
        assert_eq!(hit.intent.target.as_deref(), Some("a habit tracker"));
    }

    #[test]
    fn test_create_project_is_not_a_build_request() {
        let hit = engine().disambiguate("please create project blog");
        assert_ne!(hit.map(|h| h.rule), Some("prd_build_request"));
    }

    #[test]
    fn test_polite_command_strips_politeness() {
        let hit = engine().disambiguate("Can you restart plex?").unwrap();
        assert_eq!(hit.rule, "polite_command");
        assert_eq!(hit.intent.category, IntentCategory::Command);
        assert_eq!(hit.intent.action, "restart");
        assert_eq!(hit.intent.target.as_deref(), Some("plex"));
        assert_eq!(hit.intent.confidence, 0.85);
    }

    #[test]
    fn test_polite_explain_is_a_question() {
        let hit = engine().disambiguate("could you explain the build failure").unwrap();
        assert_eq!(hit.intent.category, IntentCategory::Question);
    }

    #[test]
    fn test_please_suffix_imperative() {
        let hit = engine().disambiguate("restart radarr, please").unwrap();
        assert_eq!(hit.rule, "please_imperative");
        assert_eq!(hit.intent.action, "restart");
        assert_eq!(hit.intent.target.as_deref(), Some("radarr"));
    }

    #[test]
    fn test_feedback_marker() {
        let hit = engine().disambiguate("no, actually use postgres").unwrap();
        assert_eq!(hit.rule, "feedback_marker");
        assert_eq!(hit.intent.category, IntentCategory::Feedback);
        assert_eq!(hit.intent.target.as_deref(), Some("use postgres"));
    }

    #[test]
    fn test_like_is_comparison_not_action() {
        let hit = engine().disambiguate("make the header look like the dashboard").unwrap();
        assert_eq!(hit.rule, "reference_marker");
        assert_eq!(hit.intent.category, IntentCategory::Question);
        assert_eq!(hit.intent.target.as_deref(), Some("the dashboard"));
        assert!(engine().disambiguate("I would like to see logs").is_none());
    }

    #[test]
    fn test_what_about_is_low_confidence() {
        let hit = engine().disambiguate("what about jellyfin?").unwrap();
        assert_eq!(hit.rule, "what_about");
        assert!(hit.intent.confidence < 0.85);
    }

    #[test]
    fn test_plain_status_has_no_rule() {
        assert!(engine().disambiguate("status").is_none());
    }
}
