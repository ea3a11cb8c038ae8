//! # Pattern Rule Table
//!
//! Ordered, data-driven table of `(patterns, action, extractor)` rules.
//! Zero cost and deterministic: the first rule with a matching pattern is authoritative
//! at confidence 1.0, unless its extractor vetoes the match.

use regex::{Captures, Regex};

use crate::domain::types::{Action, ParsedIntent};

/// Fields an extractor pulls out of a match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields {
    pub target: Option<String>,
    pub prompt: Option<String>,
    pub resolved_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Fields(Fields),
    /// Veto: this rule must not claim the message.
    Skip,
}

pub type Extractor = fn(&Captures, &str) -> Extraction;

pub struct PatternRule {
    pub action: Action,
    pub patterns: Vec<Regex>,
    pub extractor: Option<Extractor>,
}

impl PatternRule {
    pub fn new(action: Action, patterns: &[&str]) -> Self {
        Self {
            action,
            patterns: patterns
                .iter()
                .map(|p| {
                    Regex::new(&format!("(?is){}", p))
                        .unwrap_or_else(|e| panic!("invalid pattern for {}: {}", action, e))
                })
                .collect(),
            extractor: None,
        }
    }

    pub fn extract(mut self, extractor: Extractor) -> Self {
        self.extractor = Some(extractor);
        self
    }
}

/// Trims, collapses whitespace and drops trailing punctuation.
pub fn normalize(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_end_matches(['.', '!', '?'])
        .trim()
        .to_string()
}

pub struct PatternRuleTable {
    rules: Vec<PatternRule>,
}

impl PatternRuleTable {
    pub fn new(rules: Vec<PatternRule>) -> Self {
        Self { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Runs the table against `text`. Vetoed rules fall through to later ones.
    pub fn match_text(&self, text: &str) -> Option<ParsedIntent> {
        let normalized = normalize(text);
        if normalized.is_empty() {
            return None;
        }

        for rule in &self.rules {
            let Some(caps) = rule.patterns.iter().find_map(|p| p.captures(&normalized)) else {
                continue;
            };

            let fields = match rule.extractor {
                Some(extractor) => match extractor(&caps, &normalized) {
                    Extraction::Fields(fields) => fields,
                    Extraction::Skip => {
                        tracing::debug!("Pattern rule {} vetoed '{}'", rule.action, normalized);
                        continue;
                    }
                },
                None => Fields::default(),
            };

            return Some(
                ParsedIntent::pattern(rule.action)
                    .with_target(fields.target)
                    .with_prompt(fields.prompt)
                    .with_path(fields.resolved_path),
            );
        }
        None
    }
}

impl Default for PatternRuleTable {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

fn capture(caps: &Captures, name: &str) -> Option<String> {
    caps.name(name).map(|m| m.as_str().trim().to_string())
}

/// Words that name the assistant's own subsystems rather than homelab services.
const RESERVED_TARGETS: [&str; 14] = [
    "agent", "claude", "dev", "build", "plan", "prd", "session", "it", "that", "this",
    "everything", "all", "now", "execution",
];

fn service_target(caps: &Captures, _: &str) -> Extraction {
    match capture(caps, "service") {
        Some(service) if RESERVED_TARGETS.contains(&service.to_lowercase().as_str()) => {
            Extraction::Skip
        }
        service => Extraction::Fields(Fields {
            target: service,
            ..Default::default()
        }),
    }
}

fn target_from(caps: &Captures, name: &str) -> Extraction {
    Extraction::Fields(Fields {
        target: capture(caps, name),
        ..Default::default()
    })
}

/// The built-in table. Order matters: earlier rules win.
pub fn default_rules() -> Vec<PatternRule> {
    vec![
        PatternRule::new(
            Action::Status,
            &[
                r"^status$",
                r"^(?:system\s+)?status\s+report$",
                r"^what'?s\s+(?:the\s+)?status$",
                r"^how\s+are\s+things$",
            ],
        ),
        PatternRule::new(
            Action::Help,
            &[r"^help$", r"^commands$", r"^what\s+can\s+you\s+do$"],
        ),
        PatternRule::new(
            Action::PrdStatus,
            &[
                r"^(?:prd|plan|build)\s+(?:status|progress)$",
                r"^how'?s\s+the\s+build(?:\s+going)?$",
                r"^progress$",
            ],
        ),
        PatternRule::new(
            Action::PrdApprove,
            &[r"^(?:approve|accept)(?:\s+(?:the\s+)?(?:plan|prd))?$"],
        ),
        PatternRule::new(
            Action::PrdPause,
            &[r"^pause(?:\s+(?:the\s+)?(?:build|plan|prd|execution))?$"],
        ),
        PatternRule::new(
            Action::PrdResume,
            &[r"^(?:resume|continue)(?:\s+(?:the\s+)?(?:build|plan|prd|execution))?$"],
        ),
        PatternRule::new(
            Action::PrdAbort,
            &[r"^(?:abort|cancel|kill)\s+(?:the\s+)?(?:build|plan|prd|execution)$"],
        ),
        PatternRule::new(Action::PrdSubmit, &[r"^prd[:\s]+(?P<content>.+)$"]).extract(|caps, _| {
            Extraction::Fields(Fields {
                prompt: capture(caps, "content"),
                ..Default::default()
            })
        }),
        PatternRule::new(
            Action::CreateProject,
            &[r"^(?:create|new|init)\s+(?:a\s+)?(?:new\s+)?project\s+(?:called\s+|named\s+)?(?P<name>[\w.-]+)$"],
        )
        .extract(|caps, _| target_from(caps, "name")),
        PatternRule::new(
            Action::AgentStart,
            &[r"^(?:start|open|launch)\s+(?:an?\s+)?(?:agent|claude|coding\s+session)(?:\s+(?:in|on|for)\s+(?P<project>\S+))?$"],
        )
        .extract(|caps, _| target_from(caps, "project")),
        PatternRule::new(
            Action::AgentStop,
            &[r"^(?:stop|end|close|kill)\s+(?:the\s+)?(?:agent|claude|coding\s+session|session)$"],
        ),
        PatternRule::new(
            Action::AgentStatus,
            &[r"^(?:agent|claude|session)\s+status$"],
        ),
        PatternRule::new(
            Action::AgentAsk,
            &[r"^(?:ask\s+(?:claude|the\s+agent|agent)|claude)[,:]?\s+(?P<prompt>.+)$"],
        )
        .extract(|caps, _| {
            Extraction::Fields(Fields {
                prompt: capture(caps, "prompt"),
                ..Default::default()
            })
        }),
        PatternRule::new(
            Action::SessionList,
            &[r"^(?:list\s+)?(?:sessions|states)$", r"^list\s+tasks$"],
        ),
        PatternRule::new(
            Action::SessionCheckpoint,
            &[r"^(?:save\s+(?:a\s+)?)?checkpoint(?:\s+(?P<name>.+))?$"],
        )
        .extract(|caps, _| target_from(caps, "name")),
        PatternRule::new(Action::HomelabServiceRestart, &[r"^restart\s+(?P<service>[\w.-]+)$"])
            .extract(service_target),
        PatternRule::new(Action::HomelabServiceStop, &[r"^stop\s+(?P<service>[\w.-]+)$"])
            .extract(service_target),
        PatternRule::new(Action::HomelabServiceStart, &[r"^start\s+(?P<service>[\w.-]+)$"])
            .extract(service_target),
        PatternRule::new(
            Action::DevStart,
            &[r"^(?:start|run|launch)\s+(?:the\s+)?dev(?:\s+server)?(?:\s+(?:in|for)\s+(?P<project>\S+))?$"],
        )
        .extract(|caps, _| target_from(caps, "project")),
        PatternRule::new(
            Action::DevStop,
            &[r"^(?:stop|kill)\s+(?:the\s+)?dev(?:\s+server)?$"],
        ),
        PatternRule::new(
            Action::HomelabLogs,
            &[
                r"^(?:show\s+)?(?:logs?|tail)\s+(?:for\s+|of\s+)?(?P<service>[\w.-]+)$",
                r"^(?P<service>[\w.-]+)\s+logs$",
            ],
        )
        .extract(service_target),
        PatternRule::new(
            Action::HomelabContainers,
            &[r"^(?:list\s+|show\s+)?(?:running\s+)?containers$", r"^docker\s+ps$"],
        ),
        PatternRule::new(
            Action::HomelabVpnStatus,
            &[r"^(?:vpn|wireguard|tailscale)(?:\s+status)?$"],
        ),
        PatternRule::new(
            Action::HomelabDnsStats,
            &[r"^(?:dns|pihole|adguard)(?:\s+(?:stats|status))?$"],
        ),
        PatternRule::new(
            Action::HomelabStatus,
            &[r"^(?:homelab|server|servers|lab)(?:\s+status)?$"],
        ),
        PatternRule::new(
            Action::MediaSearch,
            &[r"^(?:search|find|look\s+up)\s+(?:for\s+)?(?:the\s+)?(?:movie|show|series|film)\s+(?P<title>.+)$"],
        )
        .extract(|caps, _| target_from(caps, "title")),
        PatternRule::new(
            Action::MediaAdd,
            &[r"^(?:add|download|grab)\s+(?:the\s+)?(?:movie|show|series|film)\s+(?P<title>.+)$"],
        )
        .extract(|caps, _| target_from(caps, "title")),
        PatternRule::new(
            Action::MediaQueue,
            &[r"^(?:download\s+queue|queue|what'?s\s+downloading)$"],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::ResolutionMethod;

    fn table() -> PatternRuleTable {
        PatternRuleTable::default()
    }

    #[test]
    fn test_status_is_free_and_certain() {
        let intent = table().match_text("status").unwrap();
        assert_eq!(intent.action, Action::Status);
        assert_eq!(intent.confidence, 1.0);
        assert_eq!(intent.resolution_method, ResolutionMethod::Pattern);
        assert_eq!(intent.estimated_cost, 0.0);
    }

    #[test]
    fn test_matching_is_case_insensitive_and_normalized() {
        let intent = table().match_text("  RESTART   Sonarr! ").unwrap();
        assert_eq!(intent.action, Action::HomelabServiceRestart);
        assert_eq!(intent.target.as_deref(), Some("Sonarr"));
    }

    #[test]
    fn test_skip_vetoes_service_stop_for_dev() {
        let intent = table().match_text("stop dev").unwrap();
        assert_eq!(intent.action, Action::DevStop);
    }

    #[test]
    fn test_agent_words_never_become_services() {
        assert_eq!(table().match_text("stop agent").unwrap().action, Action::AgentStop);
        assert_eq!(table().match_text("stop plex").unwrap().action, Action::HomelabServiceStop);
    }

    #[test]
    fn test_vetoed_match_with_no_fallback_is_none() {
        assert!(table().match_text("restart it").is_none());
    }

    #[test]
    fn test_extractors_fill_fields() {
        let intent = table().match_text("ask claude why the tests fail").unwrap();
        assert_eq!(intent.action, Action::AgentAsk);
        assert_eq!(intent.prompt.as_deref(), Some("why the tests fail"));

        let intent = table().match_text("create project homepage").unwrap();
        assert_eq!(intent.action, Action::CreateProject);
        assert_eq!(intent.target.as_deref(), Some("homepage"));

        let intent = table().match_text("add movie The Matrix").unwrap();
        assert_eq!(intent.action, Action::MediaAdd);
        assert_eq!(intent.target.as_deref(), Some("The Matrix"));
    }

    #[test]
    fn test_first_rule_in_table_order_wins() {
        // "kill the build" is a PRD abort, not a service named "the"
        let intent = table().match_text("kill the build").unwrap();
        assert_eq!(intent.action, Action::PrdAbort);
    }

    #[test]
    fn test_free_text_does_not_match() {
        assert!(table().match_text("why is my disk filling up so fast").is_none());
        assert!(table().match_text("").is_none());
    }
}
