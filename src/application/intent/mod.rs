//! # Intent Resolution
//!
//! The cost-ordered cascade that turns a chat message into a [`ParsedIntent`]:
//!
//! 0. safety overrides on the raw text (apply last, build to completion, yes/no)
//! 1. reference resolution and entity extraction
//! 2. disambiguation rules
//! 3. pattern table
//! 4. quick classifier
//! 5. remote cheap classifier (only when the message needs it)
//! 6. remote full parse
//!
//! Stages run strictly in order and the first result wins. Stages 0-4 are free.

pub mod classifier;
pub mod disambiguation;
pub mod patterns;
pub mod quick;
pub mod resolver;

use regex::Regex;
use std::collections::VecDeque;
use std::sync::{Arc, LazyLock};

use crate::domain::config::IntentConfig;
use crate::domain::traits::{IntentClassifier, TrustLedger};
use crate::domain::types::{Action, ClassifiedIntent, IntentCategory, ParsedIntent, ResolutionMethod};

use self::classifier::LlmParser;
use self::disambiguation::DisambiguationEngine;
use self::patterns::{PatternRuleTable, normalize};
use self::quick::{QuickClassifier, needs_classification};
use self::resolver::{EntityKind, ReferenceResolver, extract_entities};

/// Conversation facts the router knows and the cascade needs for yes/no answers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolutionContext {
    pub has_pending_plan: bool,
    pub prd_awaiting_approval: bool,
}

static APPLY_LAST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:please\s+)?(?:(?:apply|use|implement)\s+(?:the\s+)?(?:last|previous)\s+(?:response|answer|suggestion|reply)|apply\s+(?:it|that|this))$",
    )
    .expect("apply regex")
});

static AUTONOMOUS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:please\s+)?(?:(?:build|finish|complete|implement)\s+(?:it|this|that|everything)\s+(?:to|until)\s+(?:completion|the\s+end|done|finished)|keep\s+going\s+until\s+(?:it'?s\s+)?(?:done|finished))$",
    )
    .expect("autonomous regex")
});

static YES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:y|yes|yep|yeah|sure|ok|okay|go|go ahead|do it|confirm|proceed|lgtm)$")
        .expect("yes regex")
});

static NO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:n|no|nope|nah|reject|never mind|nevermind|forget it)$").expect("no regex")
});

const RECENT_LIMIT: usize = 5;

pub struct IntentResolver {
    references: ReferenceResolver,
    disambiguation: DisambiguationEngine,
    patterns: PatternRuleTable,
    quick: Arc<dyn IntentClassifier>,
    remote: Option<Arc<dyn IntentClassifier>>,
    parser: Option<LlmParser>,
    trust: Option<Arc<dyn TrustLedger>>,
    config: IntentConfig,
    recent: VecDeque<String>,
}

impl IntentResolver {
    pub fn new(config: IntentConfig) -> Self {
        Self {
            references: ReferenceResolver::new(),
            disambiguation: DisambiguationEngine::default(),
            patterns: PatternRuleTable::default(),
            quick: Arc::new(QuickClassifier::new()),
            remote: None,
            parser: None,
            trust: None,
            config,
            recent: VecDeque::new(),
        }
    }

    pub fn with_remote(mut self, classifier: Arc<dyn IntentClassifier>, parser: LlmParser) -> Self {
        self.remote = Some(classifier);
        self.parser = Some(parser);
        self
    }

    pub fn with_trust(mut self, trust: Arc<dyn TrustLedger>) -> Self {
        self.trust = Some(trust);
        self
    }

    pub fn references(&self) -> &ReferenceResolver {
        &self.references
    }

    /// Runs the cascade. Never fails: a broken final stage yields `unknown`.
    pub async fn resolve(&mut self, text: &str, ctx: &ResolutionContext) -> ParsedIntent {
        let intent = self.run_stages(text, ctx).await;
        let intent = self.gate(intent);

        tracing::info!(
            "Resolved '{}' -> {} ({:?}, confidence {:.2}, cost ${:.4})",
            text.trim(),
            intent.action,
            intent.resolution_method,
            intent.confidence,
            intent.estimated_cost
        );

        self.references.update(&intent);
        self.recent.push_back(format!("{} -> {}", text.trim(), intent.action));
        while self.recent.len() > RECENT_LIMIT {
            self.recent.pop_front();
        }
        intent
    }

    async fn run_stages(&self, text: &str, ctx: &ResolutionContext) -> ParsedIntent {
        // Stage 0: raw text, before "it" is rewritten to a file name
        if let Some(intent) = self.safety_override(text, ctx) {
            tracing::debug!("Stage 0 override: {}", intent.action);
            return intent;
        }

        // Stage 1
        let resolution = self.references.resolve(text);
        if resolution.had_pronouns {
            tracing::debug!("Resolved references: {:?}", resolution.resolutions);
        }
        let resolved = resolution.resolved;
        let path = extract_entities(&resolved)
            .into_iter()
            .find(|e| e.kind == EntityKind::File)
            .map(|e| e.value);
        let with_path = |intent: ParsedIntent| {
            if intent.resolved_path.is_none() {
                let path = path.clone();
                intent.with_path(path)
            } else {
                intent
            }
        };

        // Stage 2
        if let Some(hit) = self.disambiguation.disambiguate(&resolved) {
            if hit.intent.confidence >= self.config.disambiguation_threshold {
                tracing::debug!("Stage 2 rule '{}' is authoritative", hit.rule);
                if let Some(intent) = self.map_classified(&hit.intent, &resolved, None) {
                    return with_path(intent);
                }
            } else {
                tracing::debug!("Stage 2 rule '{}' below threshold, discarded", hit.rule);
            }
        }

        // Stage 3
        if let Some(intent) = self.patterns.match_text(&resolved) {
            return with_path(intent);
        }

        // Stage 4
        match self.quick.classify(&resolved).await {
            Ok((classified, cost)) if classified.confidence >= self.config.quick_threshold => {
                let cost = (cost > 0.0).then_some(cost);
                if let Some(intent) = self.map_classified(&classified, &resolved, cost) {
                    return with_path(intent);
                }
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("Quick classifier failed: {}", e),
        }

        // Stage 5
        let mut spent = 0.0;
        if let Some(remote) = &self.remote
            && needs_classification(&resolved)
        {
            match remote.classify(&resolved).await {
                Ok((classified, cost)) => {
                    spent += cost;
                    if classified.confidence >= self.config.classifier_threshold
                        && let Some(intent) = self.map_classified(&classified, &resolved, Some(cost))
                    {
                        return with_path(intent);
                    }
                }
                Err(e) => tracing::warn!("Remote classifier failed: {}", e),
            }
        }

        // Stage 6
        let Some(parser) = &self.parser else {
            return ParsedIntent::pattern(Action::Unknown)
                .with_confidence(0.0)
                .with_message("No language model is configured to interpret this.");
        };
        let context = self.recent.iter().cloned().collect::<Vec<_>>().join("\n");
        match parser.parse(&resolved, &context).await {
            Ok(intent) => {
                let cost = intent.estimated_cost + spent;
                let mut intent = with_path(intent);
                intent.estimated_cost = cost;
                intent
            }
            Err(failure) => {
                tracing::warn!("Full parse failed: {}", failure.message);
                ParsedIntent::llm(Action::Unknown, 0.0, failure.cost + spent)
                    .with_message(failure.message)
            }
        }
    }

    fn safety_override(&self, text: &str, ctx: &ResolutionContext) -> Option<ParsedIntent> {
        let raw = normalize(text);

        if APPLY_LAST_RE.is_match(&raw) {
            return Some(ParsedIntent::pattern(Action::ApplyLast));
        }

        if AUTONOMOUS_RE.is_match(&raw) {
            let task = self.references.last_task().map(str::to_string);
            return Some(ParsedIntent::pattern(Action::AutonomousBuild).with_prompt(task));
        }

        let yes = YES_RE.is_match(&raw);
        let no = NO_RE.is_match(&raw);
        if !yes && !no {
            return None;
        }
        let action = match (ctx.has_pending_plan, ctx.prd_awaiting_approval, yes) {
            (true, _, true) => Action::PlanConfirm,
            (true, _, false) => Action::PlanReject,
            (false, true, true) => Action::PrdApprove,
            (false, true, false) => Action::PrdAbort,
            _ => return None,
        };
        Some(ParsedIntent::pattern(action))
    }

    /// Maps a classified intent onto the closed vocabulary. `None` lets the cascade continue.
    fn map_classified(
        &self,
        classified: &ClassifiedIntent,
        text: &str,
        cost: Option<f64>,
    ) -> Option<ParsedIntent> {
        let build = |action: Action| match cost {
            Some(cost) => ParsedIntent::llm(action, classified.confidence, cost),
            None => ParsedIntent::pattern(action).with_confidence(classified.confidence),
        };
        let target = classified.target.clone();

        if classified.is_negation {
            return Some(build(Action::Cancel).with_target(target));
        }

        let intent = match classified.category {
            IntentCategory::Command => {
                let phrase = match &target {
                    Some(t) => format!("{} {}", classified.action, t),
                    None => classified.action.clone(),
                };
                if let Some(matched) = self.patterns.match_text(&phrase) {
                    build(matched.action)
                        .with_target(matched.target)
                        .with_prompt(matched.prompt)
                        .with_path(matched.resolved_path)
                } else if let Some(action) = Action::from_str(&classified.action)
                    .filter(|a| !matches!(a, Action::Denied | Action::Unknown))
                {
                    build(action).with_target(target)
                } else {
                    build(Action::AgentAsk).with_prompt(Some(text.to_string()))
                }
            }
            IntentCategory::Question if classified.action == "greet" => build(Action::Help),
            IntentCategory::Question => build(Action::AgentAsk).with_prompt(Some(text.to_string())),
            IntentCategory::Feedback => {
                build(Action::Feedback).with_prompt(target.or_else(|| Some(text.to_string())))
            }
            IntentCategory::Prd => build(Action::PrdSubmit).with_prompt(Some(text.to_string())),
            IntentCategory::Unclear => return None,
        };
        Some(intent)
    }

    fn gate(&self, intent: ParsedIntent) -> ParsedIntent {
        let Some(trust) = &self.trust else {
            return intent;
        };
        let required = intent.action.required_trust();
        let level = trust.trust_level();
        if required <= level {
            return intent;
        }

        tracing::warn!("Denied {}: requires trust {}, have {}", intent.action, required, level);
        let denied = match intent.resolution_method {
            ResolutionMethod::Pattern => ParsedIntent::pattern(Action::Denied),
            ResolutionMethod::Llm => {
                ParsedIntent::llm(Action::Denied, intent.confidence, intent.estimated_cost)
            }
        };
        denied
            .with_confidence(intent.confidence)
            .with_target(intent.target)
            .with_prompt(intent.prompt)
            .with_message(format!(
                "'{}' needs trust level {} (current level {}).",
                intent.action, required, level
            ))
    }
}
