//! # Domain Types
//!
//! Common data structures and enums used across the application logic:
//! the classified/parsed intent shapes and the closed action vocabulary.

use serde::{Deserialize, Serialize};

/// Coarse category a classifier assigns to a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentCategory {
    Command,
    Question,
    Feedback,
    Prd,
    Unclear,
}

impl IntentCategory {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "command" => Some(IntentCategory::Command),
            "question" => Some(IntentCategory::Question),
            "feedback" => Some(IntentCategory::Feedback),
            "prd" => Some(IntentCategory::Prd),
            "unclear" => Some(IntentCategory::Unclear),
            _ => None,
        }
    }
}

/// Output of any classifier tier (disambiguation, quick, remote).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedIntent {
    pub category: IntentCategory,
    pub action: String,
    #[serde(default)]
    pub target: Option<String>,
    pub confidence: f64,
    #[serde(default, rename = "isNegation", alias = "is_negation")]
    pub is_negation: bool,
}

impl ClassifiedIntent {
    pub fn new(category: IntentCategory, action: impl Into<String>, confidence: f64) -> Self {
        Self {
            category,
            action: action.into(),
            target: None,
            confidence,
            is_negation: false,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        let target = target.into();
        let trimmed = target.trim();
        self.target = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
        self
    }

    pub fn negated(mut self) -> Self {
        self.is_negation = true;
        self
    }
}

/// How an intent was produced: for free, or by a paid remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMethod {
    Pattern,
    Llm,
}

/// The closed action vocabulary consumed by downstream handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Status,
    Help,
    AgentAsk,
    AgentStart,
    AgentStop,
    AgentStatus,
    PrdSubmit,
    PrdApprove,
    PrdPause,
    PrdResume,
    PrdAbort,
    PrdStatus,
    AutonomousBuild,
    CreateProject,
    ApplyLast,
    PlanConfirm,
    PlanReject,
    Feedback,
    Cancel,
    DevStart,
    DevStop,
    SessionList,
    SessionCheckpoint,
    HomelabStatus,
    HomelabServiceRestart,
    HomelabServiceStart,
    HomelabServiceStop,
    HomelabLogs,
    HomelabContainers,
    HomelabVpnStatus,
    HomelabDnsStats,
    MediaSearch,
    MediaAdd,
    MediaQueue,
    Unknown,
    Denied,
}

impl Action {
    pub const ALL: [Action; 36] = [
        Action::Status,
        Action::Help,
        Action::AgentAsk,
        Action::AgentStart,
        Action::AgentStop,
        Action::AgentStatus,
        Action::PrdSubmit,
        Action::PrdApprove,
        Action::PrdPause,
        Action::PrdResume,
        Action::PrdAbort,
        Action::PrdStatus,
        Action::AutonomousBuild,
        Action::CreateProject,
        Action::ApplyLast,
        Action::PlanConfirm,
        Action::PlanReject,
        Action::Feedback,
        Action::Cancel,
        Action::DevStart,
        Action::DevStop,
        Action::SessionList,
        Action::SessionCheckpoint,
        Action::HomelabStatus,
        Action::HomelabServiceRestart,
        Action::HomelabServiceStart,
        Action::HomelabServiceStop,
        Action::HomelabLogs,
        Action::HomelabContainers,
        Action::HomelabVpnStatus,
        Action::HomelabDnsStats,
        Action::MediaSearch,
        Action::MediaAdd,
        Action::MediaQueue,
        Action::Unknown,
        Action::Denied,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Status => "status",
            Action::Help => "help",
            Action::AgentAsk => "agent_ask",
            Action::AgentStart => "agent_start",
            Action::AgentStop => "agent_stop",
            Action::AgentStatus => "agent_status",
            Action::PrdSubmit => "prd_submit",
            Action::PrdApprove => "prd_approve",
            Action::PrdPause => "prd_pause",
            Action::PrdResume => "prd_resume",
            Action::PrdAbort => "prd_abort",
            Action::PrdStatus => "prd_status",
            Action::AutonomousBuild => "autonomous_build",
            Action::CreateProject => "create_project",
            Action::ApplyLast => "apply_last",
            Action::PlanConfirm => "plan_confirm",
            Action::PlanReject => "plan_reject",
            Action::Feedback => "feedback",
            Action::Cancel => "cancel",
            Action::DevStart => "dev_start",
            Action::DevStop => "dev_stop",
            Action::SessionList => "session_list",
            Action::SessionCheckpoint => "session_checkpoint",
            Action::HomelabStatus => "homelab_status",
            Action::HomelabServiceRestart => "homelab_service_restart",
            Action::HomelabServiceStart => "homelab_service_start",
            Action::HomelabServiceStop => "homelab_service_stop",
            Action::HomelabLogs => "homelab_logs",
            Action::HomelabContainers => "homelab_containers",
            Action::HomelabVpnStatus => "homelab_vpn_status",
            Action::HomelabDnsStats => "homelab_dns_stats",
            Action::MediaSearch => "media_search",
            Action::MediaAdd => "media_add",
            Action::MediaQueue => "media_queue",
            Action::Unknown => "unknown",
            Action::Denied => "denied",
        }
    }

    /// Looks up a vocabulary member by its wire name. Anything else is `None`.
    pub fn from_str(s: &str) -> Option<Self> {
        let needle = s.trim().to_lowercase();
        Self::ALL.iter().copied().find(|a| a.as_str() == needle)
    }

    /// Minimum trust level a caller needs before this action is executed.
    /// Approving or resuming a plan the caller has already seen stays open at
    /// level 0, so a rollback never locks a paused build.
    pub fn required_trust(&self) -> i32 {
        match self {
            Action::AutonomousBuild
            | Action::ApplyLast
            | Action::HomelabServiceRestart
            | Action::HomelabServiceStart
            | Action::HomelabServiceStop
            | Action::AgentStart
            | Action::DevStart
            | Action::CreateProject
            | Action::PlanConfirm
            | Action::MediaAdd => 1,
            _ => 0,
        }
    }

    /// Actions whose handlers run long enough to reply asynchronously.
    pub fn requires_async(&self) -> bool {
        matches!(
            self,
            Action::AgentAsk
                | Action::AgentStart
                | Action::PrdSubmit
                | Action::PrdApprove
                | Action::PrdResume
                | Action::AutonomousBuild
                | Action::ApplyLast
                | Action::Feedback
        )
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical output of the intent resolution cascade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedIntent {
    pub action: Action,
    pub target: Option<String>,
    pub prompt: Option<String>,
    pub resolved_path: Option<String>,
    pub confidence: f64,
    pub resolution_method: ResolutionMethod,
    pub estimated_cost: f64,
    pub requires_async: bool,
    pub message: Option<String>,
}

impl ParsedIntent {
    /// A free, deterministic resolution. Cost is always zero.
    pub fn pattern(action: Action) -> Self {
        Self {
            action,
            target: None,
            prompt: None,
            resolved_path: None,
            confidence: 1.0,
            resolution_method: ResolutionMethod::Pattern,
            estimated_cost: 0.0,
            requires_async: action.requires_async(),
            message: None,
        }
    }

    /// A resolution that paid for one or more model calls.
    pub fn llm(action: Action, confidence: f64, estimated_cost: f64) -> Self {
        Self {
            action,
            target: None,
            prompt: None,
            resolved_path: None,
            confidence: confidence.clamp(0.0, 1.0),
            resolution_method: ResolutionMethod::Llm,
            estimated_cost: estimated_cost.max(0.0),
            requires_async: action.requires_async(),
            message: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn with_target(mut self, target: Option<String>) -> Self {
        self.target = target.filter(|t| !t.trim().is_empty());
        self
    }

    pub fn with_prompt(mut self, prompt: Option<String>) -> Self {
        self.prompt = prompt.filter(|p| !p.trim().is_empty());
        self
    }

    pub fn with_path(mut self, path: Option<String>) -> Self {
        self.resolved_path = path;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_round_trips_through_wire_name() {
        for action in Action::ALL {
            assert_eq!(Action::from_str(action.as_str()), Some(action));
        }
        assert_eq!(Action::from_str("HOMELAB_STATUS"), Some(Action::HomelabStatus));
        assert_eq!(Action::from_str("rm -rf"), None);
    }

    #[test]
    fn test_action_serde_matches_as_str() {
        let json = serde_json::to_string(&Action::HomelabServiceRestart).unwrap();
        assert_eq!(json, "\"homelab_service_restart\"");
    }

    #[test]
    fn test_pattern_intent_is_free() {
        let intent = ParsedIntent::pattern(Action::Status);
        assert_eq!(intent.resolution_method, ResolutionMethod::Pattern);
        assert_eq!(intent.estimated_cost, 0.0);
        assert_eq!(intent.confidence, 1.0);
    }

    #[test]
    fn test_classified_intent_accepts_camel_case_negation() {
        let raw = r#"{"category":"command","action":"stop","target":"x","confidence":0.9,"isNegation":true}"#;
        let intent: ClassifiedIntent = serde_json::from_str(raw).unwrap();
        assert!(intent.is_negation);
        assert_eq!(intent.category, IntentCategory::Command);
    }
}
