//! # Domain Traits
//!
//! Abstract interfaces for the collaborators the core consumes (chat, LLM,
//! classifiers, coding agent, trust ledger, cost tracking).
//! Allows for pluggable implementations in the Infrastructure layer and mocks in tests.

use async_trait::async_trait;
use std::path::Path;

use crate::domain::types::ClassifiedIntent;

/// Abstract interface for a Chat Provider (e.g., Console, Matrix, Slack)
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Send a message to the conversation
    async fn send_message(&self, content: &str) -> Result<String, String>;

    /// Send a notification (not tracked/editable)
    async fn send_notification(&self, content: &str) -> Result<(), String>;

    /// Send a typing indicator
    async fn typing(&self, active: bool) -> Result<(), String>;

    /// Get the current conversation ID
    fn room_id(&self) -> String;
}

/// Text returned by a model together with what it cost.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    pub content: String,
    pub cost: f64,
}

/// Abstract interface for an LLM Provider
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a completion. `agent` names a configured agent entry.
    async fn completion(&self, prompt: &str, agent: &str) -> Result<Completion, String>;
}

/// A classifier tier: free (keyword) or paid (remote model).
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    /// Returns the classified intent and the cost of producing it.
    async fn classify(&self, text: &str) -> Result<(ClassifiedIntent, f64), String>;
}

/// Result of one coding-agent session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentOutcome {
    pub output: String,
    pub files_modified: Vec<String>,
    pub cost: f64,
}

/// The coding agent that executes phase prompts and ad-hoc questions.
#[async_trait]
pub trait AgentRunner: Send + Sync {
    async fn run(&self, prompt: &str, workdir: &Path) -> Result<AgentOutcome, String>;
}

/// A completed unit of autonomous work, reported to the trust ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRecord {
    pub description: String,
    pub files_modified: Vec<String>,
    pub success: bool,
}

/// External trust gate. Raised by successful tasks, lowered by rollbacks.
pub trait TrustLedger: Send + Sync {
    fn trust_level(&self) -> i32;
    fn record_task(&self, record: TaskRecord);
    fn record_rollback(&self, reason: &str);
}

/// What the cost/learning system reports for a phase.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseRecord {
    pub plan_id: String,
    pub phase_id: String,
    pub phase_name: String,
    pub cost: f64,
    pub files_modified: Vec<String>,
}

/// Verdict from the learning system after recording a phase.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LearningVerdict {
    pub should_stop: bool,
    pub reason: Option<String>,
}

impl LearningVerdict {
    pub fn proceed() -> Self {
        Self::default()
    }

    pub fn stop(reason: impl Into<String>) -> Self {
        Self {
            should_stop: true,
            reason: Some(reason.into()),
        }
    }
}

/// Cost tracking and anti-pattern detection consulted by the phase loop.
pub trait LearningSystem: Send + Sync {
    fn start_tracking(&self, plan_id: &str);
    fn record_phase(&self, record: &PhaseRecord) -> LearningVerdict;
    fn record_failure(&self, record: &PhaseRecord, error: &str) -> LearningVerdict;
    fn persist_costs(&self);
}

