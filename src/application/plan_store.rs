//! # Plan State Store
//!
//! Holds the single command plan awaiting a yes/no answer, and the results of
//! the most recently executed plan for conversational follow-ups.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Results older than this are no longer offered as context.
pub const RESULT_FRESHNESS_SECS: i64 = 5 * 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingPlan {
    pub commands: Vec<String>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub command: String,
    pub success: bool,
    pub output: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct PlanStateStore {
    pending: Option<PendingPlan>,
    last_results: Vec<ExecutionResult>,
}

impl PlanStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a new plan, replacing any plan still awaiting an answer.
    pub fn propose(&mut self, commands: Vec<String>, description: impl Into<String>) -> &PendingPlan {
        if let Some(old) = &self.pending {
            tracing::info!("Superseding pending plan: {}", old.description);
        }
        self.pending.insert(PendingPlan {
            commands,
            description: description.into(),
            created_at: Utc::now(),
        })
    }

    pub fn pending(&self) -> Option<&PendingPlan> {
        self.pending.as_ref()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Takes the plan for execution.
    pub fn accept(&mut self) -> Option<PendingPlan> {
        self.pending.take()
    }

    pub fn reject(&mut self) -> Option<PendingPlan> {
        self.pending.take()
    }

    pub fn record_results(&mut self, results: Vec<ExecutionResult>) {
        self.last_results = results;
    }

    /// The latest batch, if it finished within the freshness window.
    pub fn recent_results(&self, now: DateTime<Utc>) -> Option<&[ExecutionResult]> {
        let newest = self.last_results.iter().map(|r| r.recorded_at).max()?;
        if now - newest <= Duration::seconds(RESULT_FRESHNESS_SECS) {
            Some(&self.last_results)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(command: &str, at: DateTime<Utc>) -> ExecutionResult {
        ExecutionResult {
            command: command.to_string(),
            success: true,
            output: String::new(),
            recorded_at: at,
        }
    }

    #[test]
    fn test_proposal_supersedes_previous() {
        let mut store = PlanStateStore::new();
        store.propose(vec!["ls".into()], "first");
        store.propose(vec!["pwd".into()], "second");
        assert_eq!(store.pending().unwrap().description, "second");
        assert_eq!(store.accept().unwrap().commands, vec!["pwd".to_string()]);
        assert!(!store.has_pending());
    }

    #[test]
    fn test_reject_clears() {
        let mut store = PlanStateStore::new();
        store.propose(vec!["rm -rf build".into()], "clean");
        assert!(store.reject().is_some());
        assert!(store.reject().is_none());
    }

    #[test]
    fn test_results_expire_after_five_minutes() {
        let mut store = PlanStateStore::new();
        let at = Utc::now();
        store.record_results(vec![result("ls", at)]);
        assert_eq!(store.recent_results(at + Duration::seconds(299)).map(|r| r.len()), Some(1));
        assert!(store.recent_results(at + Duration::seconds(301)).is_none());
    }

    #[test]
    fn test_no_results_is_none() {
        assert!(PlanStateStore::new().recent_results(Utc::now()).is_none());
    }
}
