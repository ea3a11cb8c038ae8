//! Hand-written collaborator doubles shared by the unit tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::domain::traits::{
    AgentOutcome, AgentRunner, ChatProvider, Completion, IntentClassifier, LearningSystem,
    LearningVerdict, LlmProvider, PhaseRecord, TaskRecord, TrustLedger,
};
use crate::domain::types::ClassifiedIntent;

/// Replies with scripted responses in order, then with `fallback`.
pub struct MockLlm {
    responses: Mutex<VecDeque<Result<String, String>>>,
    fallback: Result<String, String>,
    pub cost: f64,
    pub calls: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
}

impl MockLlm {
    pub fn new(fallback: Result<&str, &str>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            fallback: fallback.map(str::to_string).map_err(str::to_string),
            cost: 0.01,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, response: Result<&str, &str>) {
        self.responses
            .lock()
            .unwrap()
            .push_back(response.map(str::to_string).map_err(str::to_string));
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for MockLlm {
    async fn completion(&self, prompt: &str, _agent: &str) -> Result<Completion, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        let next = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        next.map(|content| Completion {
            content,
            cost: self.cost,
        })
    }
}

/// A classifier that always answers the same way and counts its calls.
pub struct MockClassifier {
    result: Result<ClassifiedIntent, String>,
    pub cost: f64,
    pub calls: AtomicUsize,
}

impl MockClassifier {
    pub fn new(result: Result<ClassifiedIntent, String>) -> Self {
        Self {
            result,
            cost: 0.001,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IntentClassifier for MockClassifier {
    async fn classify(&self, _text: &str) -> Result<(ClassifiedIntent, f64), String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone().map(|intent| (intent, self.cost))
    }
}

/// Holds one agent call open until released.
#[derive(Default)]
pub struct AgentGate {
    entered: Notify,
    release: Notify,
}

impl AgentGate {
    /// Resolves once the held call has started.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }
}

/// Coding agent with scripted outcomes; succeeds once the script runs out.
#[derive(Default)]
pub struct MockAgent {
    script: Mutex<VecDeque<Result<AgentOutcome, String>>>,
    gate: Mutex<Option<Arc<AgentGate>>>,
    pub prompts: Mutex<Vec<String>>,
}

impl MockAgent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn succeed(&self, output: &str, files: &[&str]) {
        self.script.lock().unwrap().push_back(Ok(AgentOutcome {
            output: output.to_string(),
            files_modified: files.iter().map(|f| f.to_string()).collect(),
            cost: 0.5,
        }));
    }

    pub fn fail(&self, error: &str) {
        self.script.lock().unwrap().push_back(Err(error.to_string()));
    }

    pub fn run_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    /// The next call blocks until the returned gate is released.
    pub fn hold_next(&self) -> Arc<AgentGate> {
        let gate = Arc::new(AgentGate::default());
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }
}

#[async_trait]
impl AgentRunner for MockAgent {
    async fn run(&self, prompt: &str, _workdir: &Path) -> Result<AgentOutcome, String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let result = self.script.lock().unwrap().pop_front().unwrap_or_else(|| {
            Ok(AgentOutcome {
                output: "done".to_string(),
                files_modified: Vec::new(),
                cost: 0.5,
            })
        });
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        result
    }
}

pub struct RecordingTrust {
    pub level: i32,
    pub tasks: Mutex<Vec<TaskRecord>>,
    pub rollbacks: Mutex<Vec<String>>,
}

impl RecordingTrust {
    pub fn new(level: i32) -> Self {
        Self {
            level,
            tasks: Mutex::new(Vec::new()),
            rollbacks: Mutex::new(Vec::new()),
        }
    }

    pub fn task_count(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }

    pub fn rollback_count(&self) -> usize {
        self.rollbacks.lock().unwrap().len()
    }
}

impl TrustLedger for RecordingTrust {
    fn trust_level(&self) -> i32 {
        self.level
    }

    fn record_task(&self, record: TaskRecord) {
        self.tasks.lock().unwrap().push(record);
    }

    fn record_rollback(&self, reason: &str) {
        self.rollbacks.lock().unwrap().push(reason.to_string());
    }
}

/// Learning system that stops after `stop_after` recorded phases, if set.
#[derive(Default)]
pub struct MockLearning {
    pub stop_after: Option<usize>,
    pub phases: AtomicUsize,
    pub failures: AtomicUsize,
    pub persisted: AtomicUsize,
    pub tracking: Mutex<Vec<String>>,
}

impl LearningSystem for MockLearning {
    fn start_tracking(&self, plan_id: &str) {
        self.tracking.lock().unwrap().push(plan_id.to_string());
    }

    fn record_phase(&self, _record: &PhaseRecord) -> LearningVerdict {
        let n = self.phases.fetch_add(1, Ordering::SeqCst) + 1;
        match self.stop_after {
            Some(limit) if n >= limit => LearningVerdict::stop("budget reached"),
            _ => LearningVerdict::proceed(),
        }
    }

    fn record_failure(&self, _record: &PhaseRecord, _error: &str) -> LearningVerdict {
        self.failures.fetch_add(1, Ordering::SeqCst);
        LearningVerdict::proceed()
    }

    fn persist_costs(&self) {
        self.persisted.fetch_add(1, Ordering::SeqCst);
    }
}

/// Collects everything sent to the chat.
#[derive(Default)]
pub struct MockChat {
    pub messages: Mutex<Vec<String>>,
}

impl MockChat {
    pub fn last(&self) -> Option<String> {
        self.messages.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ChatProvider for MockChat {
    async fn send_message(&self, content: &str) -> Result<String, String> {
        let mut messages = self.messages.lock().unwrap();
        messages.push(content.to_string());
        Ok(format!("msg-{}", messages.len()))
    }

    async fn send_notification(&self, content: &str) -> Result<(), String> {
        self.messages.lock().unwrap().push(content.to_string());
        Ok(())
    }

    async fn typing(&self, _active: bool) -> Result<(), String> {
        Ok(())
    }

    fn room_id(&self) -> String {
        "test".to_string()
    }
}
