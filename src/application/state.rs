//! # Execution State
//!
//! Long-running work (tasks, debugging sessions, explorations) tracked as
//! [`ExecutionState`]s with pause/resume, context switching, bounded checkpoint
//! history and rollback. Everything is persisted as one JSON document,
//! `data/execution_state.json`, owned by a single [`ExecutionStateManager`].

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::application::utils::write_atomic;

pub const MAX_CHECKPOINTS_PER_STATE: usize = 10;
pub const MAX_TRANSITIONS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateKind {
    Task,
    Debug,
    Exploration,
    Maintenance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateStatus {
    Active,
    Paused,
    Interrupted,
    Completed,
    Failed,
}

impl StateStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StateStatus::Completed | StateStatus::Failed)
    }
}

impl std::fmt::Display for StateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StateStatus::Active => "active",
            StateStatus::Paused => "paused",
            StateStatus::Interrupted => "interrupted",
            StateStatus::Completed => "completed",
            StateStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub current: u32,
    pub total: u32,
    pub completed_steps: Vec<String>,
    pub pending_steps: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub decision: String,
    pub rationale: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateMemory {
    pub context: HashMap<String, serde_json::Value>,
    pub reasoning: Vec<String>,
    pub decisions: Vec<Decision>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionState {
    pub id: String,
    pub kind: StateKind,
    pub description: String,
    pub status: StateStatus,
    pub progress: Progress,
    pub memory: StateMemory,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointReason {
    Manual,
    Auto,
    Interruption,
}

/// Immutable snapshot of a state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub id: String,
    pub state_id: String,
    pub name: String,
    pub snapshot: ExecutionState,
    pub created_at: DateTime<Utc>,
    pub reason: CheckpointReason,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub state_id: String,
    pub from: StateStatus,
    pub to: StateStatus,
    pub reason: String,
    pub at: DateTime<Utc>,
}

/// The on-disk document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub states: HashMap<String, ExecutionState>,
    #[serde(default)]
    pub checkpoints: HashMap<String, Vec<Checkpoint>>,
    #[serde(default)]
    pub current_state_id: Option<String>,
    #[serde(default)]
    pub transitions: Vec<Transition>,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum StateError {
    #[error("No state with id {0}.")]
    NotFound(String),
    #[error("No checkpoint with id {0}.")]
    CheckpointNotFound(String),
    #[error("Cannot {action} state {id}: it is {status}.")]
    InvalidTransition {
        id: String,
        action: &'static str,
        status: StateStatus,
    },
}

pub struct ExecutionStateManager {
    path: PathBuf,
    doc: PersistedState,
}

impl ExecutionStateManager {
    /// Loads the document at `path`. Missing or corrupt files start empty.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let doc = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Execution state at {:?} is corrupt, starting fresh: {}", path, e);
                PersistedState::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => PersistedState::default(),
            Err(e) => {
                tracing::warn!("Cannot read execution state at {:?}, starting fresh: {}", path, e);
                PersistedState::default()
            }
        };
        Self { path, doc }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn document(&self) -> &PersistedState {
        &self.doc
    }

    /// Writes the document. Failures are logged, never returned.
    pub fn persist(&self) {
        let result = serde_json::to_vec_pretty(&self.doc)
            .map_err(std::io::Error::other)
            .and_then(|bytes| write_atomic(&self.path, &bytes));
        if let Err(e) = result {
            tracing::warn!("Failed to persist execution state to {:?}: {}", self.path, e);
        }
    }

    fn state_mut(&mut self, id: &str) -> Result<&mut ExecutionState, StateError> {
        self.doc
            .states
            .get_mut(id)
            .ok_or_else(|| StateError::NotFound(id.to_string()))
    }

    fn active_state_id(&self) -> Option<String> {
        self.doc
            .states
            .values()
            .find(|s| s.status == StateStatus::Active)
            .map(|s| s.id.clone())
    }

    fn log_transition(&mut self, state_id: &str, from: StateStatus, to: StateStatus, reason: &str) {
        tracing::info!("State {} {} -> {}: {}", state_id, from, to, reason);
        self.doc.transitions.push(Transition {
            state_id: state_id.to_string(),
            from,
            to,
            reason: reason.to_string(),
            at: Utc::now(),
        });
        let overflow = self.doc.transitions.len().saturating_sub(MAX_TRANSITIONS);
        if overflow > 0 {
            self.doc.transitions.drain(..overflow);
        }
    }

    fn set_status(&mut self, id: &str, to: StateStatus, reason: &str) -> Result<(), StateError> {
        let state = self.state_mut(id)?;
        let from = state.status;
        state.status = to;
        state.updated_at = Utc::now();
        self.log_transition(id, from, to, reason);
        Ok(())
    }

    fn invalid(id: &str, action: &'static str, status: StateStatus) -> StateError {
        StateError::InvalidTransition {
            id: id.to_string(),
            action,
            status,
        }
    }

    /// Always succeeds. The new state is active and current only if nothing else is active.
    pub fn create_state(&mut self, kind: StateKind, description: &str) -> ExecutionState {
        let now = Utc::now();
        let becomes_current = self.active_state_id().is_none();
        let state = ExecutionState {
            id: Uuid::new_v4().to_string(),
            kind,
            description: description.to_string(),
            status: if becomes_current {
                StateStatus::Active
            } else {
                StateStatus::Paused
            },
            progress: Progress::default(),
            memory: StateMemory::default(),
            created_at: now,
            updated_at: now,
        };
        if becomes_current {
            self.doc.current_state_id = Some(state.id.clone());
        }
        tracing::info!("Created {:?} state {} ({})", kind, state.id, state.status);
        self.doc.states.insert(state.id.clone(), state.clone());
        self.persist();
        state
    }

    pub fn get_state(&self, id: &str) -> Option<&ExecutionState> {
        self.doc.states.get(id)
    }

    pub fn current_state(&self) -> Option<&ExecutionState> {
        self.doc
            .current_state_id
            .as_deref()
            .and_then(|id| self.doc.states.get(id))
    }

    /// Most recently updated first.
    pub fn list_states(&self) -> Vec<&ExecutionState> {
        let mut states: Vec<_> = self.doc.states.values().collect();
        states.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        states
    }

    /// Applies `update` to the state. Id and status are owned by the transition operations.
    pub fn update_state(
        &mut self,
        id: &str,
        update: impl FnOnce(&mut ExecutionState),
    ) -> Result<ExecutionState, StateError> {
        let state = self.state_mut(id)?;
        let (id, status, created_at) = (state.id.clone(), state.status, state.created_at);
        update(state);
        state.id = id;
        state.status = status;
        state.created_at = created_at;
        state.updated_at = Utc::now();
        let updated = state.clone();
        self.persist();
        Ok(updated)
    }

    pub fn add_memory(&mut self, id: &str, key: &str, value: serde_json::Value) -> Result<(), StateError> {
        self.update_state(id, |s| {
            s.memory.context.insert(key.to_string(), value);
        })
        .map(|_| ())
    }

    pub fn add_reasoning(&mut self, id: &str, reasoning: &str) -> Result<(), StateError> {
        self.update_state(id, |s| s.memory.reasoning.push(reasoning.to_string()))
            .map(|_| ())
    }

    pub fn record_decision(&mut self, id: &str, decision: &str, rationale: &str) -> Result<(), StateError> {
        self.update_state(id, |s| {
            s.memory.decisions.push(Decision {
                decision: decision.to_string(),
                rationale: rationale.to_string(),
                at: Utc::now(),
            })
        })
        .map(|_| ())
    }

    /// Sets counters; a finished step moves from pending to completed.
    pub fn update_progress(
        &mut self,
        id: &str,
        current: u32,
        total: u32,
        finished_step: Option<&str>,
    ) -> Result<(), StateError> {
        self.update_state(id, |s| {
            s.progress.current = current;
            s.progress.total = total;
            if let Some(step) = finished_step {
                s.progress.pending_steps.retain(|p| p != step);
                s.progress.completed_steps.push(step.to_string());
            }
        })
        .map(|_| ())
    }

    /// Only from `active`. Takes an automatic checkpoint first.
    pub fn pause_state(&mut self, id: &str, reason: &str) -> Result<(), StateError> {
        let status = self.get_state(id).ok_or_else(|| StateError::NotFound(id.to_string()))?.status;
        if status != StateStatus::Active {
            return Err(Self::invalid(id, "pause", status));
        }
        self.push_checkpoint(id, &format!("Auto: {}", reason), CheckpointReason::Auto)?;
        self.set_status(id, StateStatus::Paused, reason)?;
        self.persist();
        Ok(())
    }

    /// From `paused` or `interrupted`. Any other active state is paused first.
    pub fn resume_state(&mut self, id: &str) -> Result<(), StateError> {
        let status = self.get_state(id).ok_or_else(|| StateError::NotFound(id.to_string()))?.status;
        if !matches!(status, StateStatus::Paused | StateStatus::Interrupted) {
            return Err(Self::invalid(id, "resume", status));
        }
        if let Some(other) = self.active_state_id().filter(|other| other != id) {
            self.pause_state(&other, "Context switch")?;
        }
        self.set_status(id, StateStatus::Active, "Resumed")?;
        self.doc.current_state_id = Some(id.to_string());
        self.persist();
        Ok(())
    }

    pub fn complete_state(&mut self, id: &str, summary: &str) -> Result<(), StateError> {
        self.finish(id, StateStatus::Completed, &format!("Completed: {}", summary))
    }

    pub fn fail_state(&mut self, id: &str, error: &str) -> Result<(), StateError> {
        self.finish(id, StateStatus::Failed, &format!("Failed: {}", error))
    }

    fn finish(&mut self, id: &str, to: StateStatus, note: &str) -> Result<(), StateError> {
        let state = self.state_mut(id)?;
        if state.status.is_terminal() {
            let status = state.status;
            return Err(Self::invalid(id, "finish", status));
        }
        state.memory.reasoning.push(note.to_string());
        self.set_status(id, to, note)?;
        if self.doc.current_state_id.as_deref() == Some(id) {
            self.doc.current_state_id = None;
        }
        self.persist();
        Ok(())
    }

    /// Marks live work as interrupted, e.g. on shutdown, with a checkpoint to resume from.
    pub fn interrupt_state(&mut self, id: &str, reason: &str) -> Result<(), StateError> {
        let status = self.get_state(id).ok_or_else(|| StateError::NotFound(id.to_string()))?.status;
        if !matches!(status, StateStatus::Active | StateStatus::Paused) {
            return Err(Self::invalid(id, "interrupt", status));
        }
        self.push_checkpoint(id, &format!("Interrupted: {}", reason), CheckpointReason::Interruption)?;
        self.set_status(id, StateStatus::Interrupted, reason)?;
        self.persist();
        Ok(())
    }

    /// Pauses whatever is active, then activates `id`. Never leaves two states active.
    pub fn switch_to_state(&mut self, id: &str) -> Result<ExecutionState, StateError> {
        let status = self.get_state(id).ok_or_else(|| StateError::NotFound(id.to_string()))?.status;
        if status.is_terminal() {
            return Err(Self::invalid(id, "switch to", status));
        }

        if let Some(other) = self.active_state_id().filter(|other| other != id) {
            self.pause_state(&other, "Context switch")?;
        }
        if matches!(status, StateStatus::Paused | StateStatus::Interrupted) {
            self.set_status(id, StateStatus::Active, "Context switch")?;
        }
        self.doc.current_state_id = Some(id.to_string());
        self.persist();
        self.get_state(id)
            .cloned()
            .ok_or_else(|| StateError::NotFound(id.to_string()))
    }

    fn push_checkpoint(
        &mut self,
        state_id: &str,
        name: &str,
        reason: CheckpointReason,
    ) -> Result<Checkpoint, StateError> {
        let snapshot = self
            .get_state(state_id)
            .cloned()
            .ok_or_else(|| StateError::NotFound(state_id.to_string()))?;
        let checkpoint = Checkpoint {
            id: Uuid::new_v4().to_string(),
            state_id: state_id.to_string(),
            name: name.to_string(),
            snapshot,
            created_at: Utc::now(),
            reason,
        };

        let list = self.doc.checkpoints.entry(state_id.to_string()).or_default();
        list.push(checkpoint.clone());
        let overflow = list.len().saturating_sub(MAX_CHECKPOINTS_PER_STATE);
        if overflow > 0 {
            list.drain(..overflow);
        }
        tracing::debug!("Checkpoint '{}' for state {}", name, state_id);
        Ok(checkpoint)
    }

    pub fn create_checkpoint(
        &mut self,
        state_id: &str,
        name: &str,
        reason: CheckpointReason,
    ) -> Result<Checkpoint, StateError> {
        let checkpoint = self.push_checkpoint(state_id, name, reason)?;
        self.persist();
        Ok(checkpoint)
    }

    /// Oldest first.
    pub fn list_checkpoints(&self, state_id: &str) -> &[Checkpoint] {
        self.doc
            .checkpoints
            .get(state_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Restores a snapshot in place. The state stays active only if it is current.
    pub fn rollback_to_checkpoint(&mut self, checkpoint_id: &str) -> Result<ExecutionState, StateError> {
        let checkpoint = self
            .doc
            .checkpoints
            .values()
            .flatten()
            .find(|c| c.id == checkpoint_id)
            .cloned()
            .ok_or_else(|| StateError::CheckpointNotFound(checkpoint_id.to_string()))?;

        let is_current = self.doc.current_state_id.as_deref() == Some(checkpoint.state_id.as_str());
        let state = self.state_mut(&checkpoint.state_id)?;
        let from = state.status;
        let to = if is_current {
            StateStatus::Active
        } else {
            StateStatus::Paused
        };
        *state = checkpoint.snapshot.clone();
        state.status = to;
        state.updated_at = Utc::now();
        let restored = state.clone();

        self.log_transition(
            &checkpoint.state_id,
            from,
            to,
            &format!("Rollback to checkpoint '{}'", checkpoint.name),
        );
        self.persist();
        Ok(restored)
    }

    /// Drops terminal states not touched within `max_age`, with their checkpoints.
    pub fn cleanup(&mut self, max_age: Duration) -> usize {
        let cutoff = Utc::now() - max_age;
        let stale: Vec<String> = self
            .doc
            .states
            .values()
            .filter(|s| s.status.is_terminal() && s.updated_at < cutoff)
            .map(|s| s.id.clone())
            .collect();

        for id in &stale {
            self.doc.states.remove(id);
            self.doc.checkpoints.remove(id);
        }
        if !stale.is_empty() {
            tracing::info!("Cleaned up {} finished states", stale.len());
            self.persist();
        }
        stale.len()
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.doc.transitions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manager(dir: &TempDir) -> ExecutionStateManager {
        ExecutionStateManager::load(dir.path().join("execution_state.json"))
    }

    fn active_count(m: &ExecutionStateManager) -> usize {
        m.list_states()
            .iter()
            .filter(|s| s.status == StateStatus::Active)
            .count()
    }

    #[test]
    fn test_unreadable_state_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let m = ExecutionStateManager::load(dir.path());
        assert!(m.list_states().is_empty());
        assert!(m.current_state().is_none());
    }

    #[test]
    fn test_first_state_becomes_current() {
        let dir = TempDir::new().unwrap();
        let mut m = manager(&dir);
        let a = m.create_state(StateKind::Task, "migrate db");
        let b = m.create_state(StateKind::Debug, "flaky test");
        assert_eq!(a.status, StateStatus::Active);
        assert_eq!(b.status, StateStatus::Paused);
        assert_eq!(m.current_state().unwrap().id, a.id);
        assert_eq!(active_count(&m), 1);
    }

    #[test]
    fn test_pause_takes_auto_checkpoint_and_logs_transition() {
        let dir = TempDir::new().unwrap();
        let mut m = manager(&dir);
        let a = m.create_state(StateKind::Task, "t");
        m.pause_state(&a.id, "lunch").unwrap();

        assert_eq!(m.get_state(&a.id).unwrap().status, StateStatus::Paused);
        let checkpoints = m.list_checkpoints(&a.id);
        assert_eq!(checkpoints.len(), 1);
        assert_eq!(checkpoints[0].reason, CheckpointReason::Auto);
        assert_eq!(checkpoints[0].snapshot.status, StateStatus::Active);
        let last = m.transitions().last().unwrap();
        assert_eq!((last.from, last.to), (StateStatus::Active, StateStatus::Paused));

        assert!(matches!(
            m.pause_state(&a.id, "again"),
            Err(StateError::InvalidTransition { action: "pause", .. })
        ));
    }

    #[test]
    fn test_resume_only_from_paused() {
        let dir = TempDir::new().unwrap();
        let mut m = manager(&dir);
        let a = m.create_state(StateKind::Task, "t");
        assert!(m.resume_state(&a.id).is_err());
        m.pause_state(&a.id, "x").unwrap();
        m.resume_state(&a.id).unwrap();
        assert_eq!(m.current_state().unwrap().status, StateStatus::Active);
    }

    #[test]
    fn test_complete_and_fail_clear_current() {
        let dir = TempDir::new().unwrap();
        let mut m = manager(&dir);
        let a = m.create_state(StateKind::Task, "t");
        m.complete_state(&a.id, "shipped").unwrap();
        assert!(m.current_state().is_none());
        let state = m.get_state(&a.id).unwrap();
        assert_eq!(state.status, StateStatus::Completed);
        assert_eq!(state.memory.reasoning.last().unwrap(), "Completed: shipped");
        assert!(m.complete_state(&a.id, "again").is_err());

        let b = m.create_state(StateKind::Debug, "d");
        assert_eq!(b.status, StateStatus::Active);
        m.fail_state(&b.id, "gave up").unwrap();
        assert!(m.current_state().is_none());
    }

    #[test]
    fn test_switch_pauses_active_state() {
        let dir = TempDir::new().unwrap();
        let mut m = manager(&dir);
        let a = m.create_state(StateKind::Task, "a");
        let b = m.create_state(StateKind::Exploration, "b");

        let switched = m.switch_to_state(&b.id).unwrap();
        assert_eq!(switched.status, StateStatus::Active);
        assert_eq!(m.get_state(&a.id).unwrap().status, StateStatus::Paused);
        assert_eq!(m.current_state().unwrap().id, b.id);
        assert_eq!(active_count(&m), 1);
        assert!(m.transitions().iter().any(|t| t.state_id == a.id && t.reason == "Context switch"));

        m.switch_to_state(&a.id).unwrap();
        assert_eq!(m.get_state(&b.id).unwrap().status, StateStatus::Paused);
        assert_eq!(active_count(&m), 1);
    }

    #[test]
    fn test_checkpoints_capped_fifo() {
        let dir = TempDir::new().unwrap();
        let mut m = manager(&dir);
        let a = m.create_state(StateKind::Task, "t");
        for i in 1..=11 {
            m.create_checkpoint(&a.id, &format!("cp-{i}"), CheckpointReason::Manual)
                .unwrap();
        }
        let names: Vec<_> = m.list_checkpoints(&a.id).iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names.len(), 10);
        assert!(!names.contains(&"cp-1"));
        assert_eq!(names.first(), Some(&"cp-2"));
        assert_eq!(names.last(), Some(&"cp-11"));
    }

    #[test]
    fn test_persist_then_reload_is_identical() {
        let dir = TempDir::new().unwrap();
        let mut m = manager(&dir);
        let a = m.create_state(StateKind::Task, "t");
        m.add_memory(&a.id, "branch", serde_json::json!("feature/x")).unwrap();
        m.add_reasoning(&a.id, "start with the schema").unwrap();
        m.record_decision(&a.id, "use sqlite", "single user").unwrap();
        m.update_progress(&a.id, 1, 3, Some("schema")).unwrap();
        m.create_checkpoint(&a.id, "before api", CheckpointReason::Manual).unwrap();
        let b = m.create_state(StateKind::Maintenance, "m");
        m.switch_to_state(&b.id).unwrap();

        let reloaded = manager(&dir);
        assert_eq!(reloaded.document().states, m.document().states);
        assert_eq!(reloaded.document().checkpoints, m.document().checkpoints);
        assert_eq!(reloaded.document().current_state_id, m.document().current_state_id);
        assert_eq!(reloaded.document(), m.document());
    }

    #[test]
    fn test_missing_or_corrupt_file_is_first_run() {
        let dir = TempDir::new().unwrap();
        assert_eq!(manager(&dir).document(), &PersistedState::default());

        std::fs::write(dir.path().join("execution_state.json"), "{\"states\": [tru").unwrap();
        assert_eq!(manager(&dir).document(), &PersistedState::default());
    }

    #[test]
    fn test_update_state_cannot_change_status() {
        let dir = TempDir::new().unwrap();
        let mut m = manager(&dir);
        let a = m.create_state(StateKind::Task, "t");
        let updated = m
            .update_state(&a.id, |s| {
                s.description = "renamed".into();
                s.status = StateStatus::Completed;
            })
            .unwrap();
        assert_eq!(updated.description, "renamed");
        assert_eq!(updated.status, StateStatus::Active);
    }

    #[test]
    fn test_rollback_restores_snapshot() {
        let dir = TempDir::new().unwrap();
        let mut m = manager(&dir);
        let a = m.create_state(StateKind::Task, "t");
        m.add_reasoning(&a.id, "first idea").unwrap();
        let cp = m.create_checkpoint(&a.id, "good", CheckpointReason::Manual).unwrap();
        m.add_reasoning(&a.id, "bad idea").unwrap();

        let restored = m.rollback_to_checkpoint(&cp.id).unwrap();
        assert_eq!(restored.memory.reasoning, vec!["first idea".to_string()]);
        assert_eq!(restored.status, StateStatus::Active);
        assert_eq!(restored.id, a.id);
        assert!(m.rollback_to_checkpoint("nope").is_err());
    }

    #[test]
    fn test_interrupt_creates_interruption_checkpoint() {
        let dir = TempDir::new().unwrap();
        let mut m = manager(&dir);
        let a = m.create_state(StateKind::Task, "t");
        m.interrupt_state(&a.id, "shutdown").unwrap();
        assert_eq!(m.get_state(&a.id).unwrap().status, StateStatus::Interrupted);
        assert_eq!(m.list_checkpoints(&a.id)[0].reason, CheckpointReason::Interruption);
        m.resume_state(&a.id).unwrap();
        assert_eq!(m.get_state(&a.id).unwrap().status, StateStatus::Active);
    }

    #[test]
    fn test_cleanup_removes_only_old_terminal_states() {
        let dir = TempDir::new().unwrap();
        let mut m = manager(&dir);
        let old_done = m.create_state(StateKind::Task, "old");
        m.complete_state(&old_done.id, "ok").unwrap();
        let recent_done = m.create_state(StateKind::Task, "recent");
        m.complete_state(&recent_done.id, "ok").unwrap();
        let old_paused = m.create_state(StateKind::Task, "paused");
        m.pause_state(&old_paused.id, "x").unwrap();

        let long_ago = Utc::now() - Duration::days(30);
        for id in [&old_done.id, &old_paused.id] {
            m.doc.states.get_mut(id.as_str()).unwrap().updated_at = long_ago;
        }

        assert_eq!(m.cleanup(Duration::days(7)), 1);
        assert!(m.get_state(&old_done.id).is_none());
        assert!(m.get_state(&recent_done.id).is_some());
        assert!(m.get_state(&old_paused.id).is_some());
    }

    #[test]
    fn test_transition_log_is_bounded() {
        let dir = TempDir::new().unwrap();
        let mut m = manager(&dir);
        let a = m.create_state(StateKind::Task, "t");
        for _ in 0..60 {
            m.pause_state(&a.id, "x").unwrap();
            m.resume_state(&a.id).unwrap();
        }
        assert_eq!(m.transitions().len(), MAX_TRANSITIONS);
    }
}
