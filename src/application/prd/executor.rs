//! # PRD Executor
//!
//! Drives an approved [`ExecutionPlan`] phase by phase through the coding agent.
//!
//! The phase loop runs as a spawned task bound to one plan id. Before each phase it
//! re-checks the plan status, so pause and abort take effect at the next phase
//! boundary. The plan lock is never held across the agent call.
//!
//! At most one loop owns a plan. A loop gives up ownership under the plan lock,
//! after confirming the plan is no longer executing, so a resume either lands
//! before that check (and the loop keeps going) or after it (and starts a new loop).

use chrono::Utc;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::plan::{
    CheckpointKind, ExecutionPlan, PhaseStatus, PlanStatus, PrdCheckpoint, PrdError,
};
use crate::application::utils::{is_rate_limit_error, slugify, truncate};
use crate::domain::config::ExecutorConfig;
use crate::domain::traits::{
    AgentOutcome, AgentRunner, LearningSystem, LlmProvider, PhaseRecord, TaskRecord, TrustLedger,
};
use crate::strings::prompts::{self, PhasePrompt};

pub type CheckpointObserver = Box<dyn Fn(&PrdCheckpoint) + Send + Sync>;

/// Outcome of one loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Wait `phase_delay_ms`, then run the next phase.
    Continue,
    Stop,
}

/// Everything the phase loop needs after the lock is released.
struct PhaseJob {
    plan_id: String,
    index: usize,
    phase_id: String,
    phase_name: String,
    project_path: String,
    prompt: String,
}

struct Inner {
    plan: Mutex<Option<ExecutionPlan>>,
    llm: Arc<dyn LlmProvider>,
    agent: Arc<dyn AgentRunner>,
    trust: Arc<dyn TrustLedger>,
    learning: Arc<dyn LearningSystem>,
    observers: RwLock<Vec<CheckpointObserver>>,
    driver: Mutex<Option<JoinHandle<()>>>,
    /// Plan id of the loop that is currently running, if any.
    driver_owner: std::sync::Mutex<Option<String>>,
    config: ExecutorConfig,
}

/// Handle to the single-plan executor. Clones share the same plan.
#[derive(Clone)]
pub struct PrdExecutor {
    inner: Arc<Inner>,
}

impl PrdExecutor {
    pub fn new(
        config: ExecutorConfig,
        llm: Arc<dyn LlmProvider>,
        agent: Arc<dyn AgentRunner>,
        trust: Arc<dyn TrustLedger>,
        learning: Arc<dyn LearningSystem>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                plan: Mutex::new(None),
                llm,
                agent,
                trust,
                learning,
                observers: RwLock::new(Vec::new()),
                driver: Mutex::new(None),
                driver_owner: std::sync::Mutex::new(None),
                config,
            }),
        }
    }

    /// Registers an observer. Observers run synchronously in registration order.
    pub fn on_checkpoint(&self, observer: impl Fn(&PrdCheckpoint) + Send + Sync + 'static) {
        if let Ok(mut observers) = self.inner.observers.write() {
            observers.push(Box::new(observer));
        }
    }

    pub fn notify_checkpoint(&self, checkpoint: &PrdCheckpoint) {
        self.inner.notify(checkpoint);
    }

    pub async fn current_plan(&self) -> Option<ExecutionPlan> {
        self.inner.plan.lock().await.clone()
    }

    pub async fn status(&self) -> Option<PlanStatus> {
        self.inner.plan.lock().await.as_ref().map(|p| p.status)
    }

    /// Asks the planner for 3-6 phases. No plan is stored on failure.
    pub async fn submit_prd(&self, content: &str, project_path: &str) -> Result<ExecutionPlan, PrdError> {
        if let Some(status) = self.status().await.filter(|s| !s.is_terminal()) {
            return Err(PrdError::PlanActive(status));
        }

        tracing::info!("Planning PRD for {}", project_path);
        let prompt = prompts::prd_plan_prompt(content, project_path, &[]);
        let completion = self
            .inner
            .llm
            .completion(&prompt, &self.inner.config.planner_agent)
            .await
            .map_err(PrdError::Planning)?;

        let plan = ExecutionPlan::from_generated(&completion.content, content, project_path)
            .map_err(|e| {
                tracing::warn!("PRD planning rejected: {}", e);
                PrdError::Planning(e)
            })?;

        tracing::info!("Plan {} ready with {} phases", plan.id, plan.phases.len());
        let mut slot = self.inner.plan.lock().await;
        // Re-check: another submission may have landed while the planner ran
        if let Some(existing) = slot.as_ref().filter(|p| !p.status.is_terminal()) {
            return Err(PrdError::PlanActive(existing.status));
        }
        *slot = Some(plan.clone());
        Ok(plan)
    }

    pub async fn approve_plan(&self) -> Result<ExecutionPlan, PrdError> {
        let mut slot = self.inner.plan.lock().await;
        let plan = slot.as_mut().ok_or(PrdError::NoActivePlan)?;
        if plan.status != PlanStatus::AwaitingApproval {
            return Err(PrdError::InvalidState {
                action: "approve",
                status: plan.status,
            });
        }

        self.inner.learning.start_tracking(&plan.id);
        if self.inner.config.create_branch {
            let short: String = plan.id.chars().take(8).collect();
            plan.branch = Some(format!("prd/{}-{}", slugify(&plan.title, 40), short));
        }
        plan.status = PlanStatus::Executing;
        tracing::info!("Plan {} approved, executing", plan.id);
        let snapshot = plan.clone();

        // Still holding the plan lock so ownership is decided atomically
        self.start_driver(&snapshot.id).await;
        Ok(snapshot)
    }

    pub async fn pause_execution(&self) -> Result<ExecutionPlan, PrdError> {
        let mut slot = self.inner.plan.lock().await;
        let plan = slot.as_mut().ok_or(PrdError::NoActivePlan)?;
        if plan.status != PlanStatus::Executing {
            return Err(PrdError::InvalidState {
                action: "pause",
                status: plan.status,
            });
        }
        plan.status = PlanStatus::Paused;
        tracing::info!("Plan {} paused at phase {}", plan.id, plan.current_phase_index + 1);
        Ok(plan.clone())
    }

    /// Re-enters the loop at the unchanged phase index.
    pub async fn resume_execution(&self) -> Result<ExecutionPlan, PrdError> {
        let mut slot = self.inner.plan.lock().await;
        let plan = slot.as_mut().ok_or(PrdError::NoActivePlan)?;
        if plan.status != PlanStatus::Paused {
            return Err(PrdError::InvalidState {
                action: "resume",
                status: plan.status,
            });
        }
        plan.status = PlanStatus::Executing;
        tracing::info!("Plan {} resumed at phase {}", plan.id, plan.current_phase_index + 1);
        let snapshot = plan.clone();

        self.start_driver(&snapshot.id).await;
        Ok(snapshot)
    }

    /// Fails the plan and clears the slot. Files already changed stay changed.
    pub async fn abort_execution(&self) -> Result<ExecutionPlan, PrdError> {
        let mut slot = self.inner.plan.lock().await;
        let status = slot.as_ref().map(|p| p.status).ok_or(PrdError::NoActivePlan)?;
        if status.is_terminal() {
            return Err(PrdError::InvalidState {
                action: "abort",
                status,
            });
        }
        let mut plan = slot.take().ok_or(PrdError::NoActivePlan)?;
        plan.status = PlanStatus::Failed;
        plan.completed_at = Some(Utc::now());
        self.inner.learning.persist_costs();
        tracing::info!("Plan {} aborted", plan.id);
        Ok(plan)
    }

    /// Runs one iteration of the phase loop.
    pub async fn execute_next_phase(&self) -> Step {
        self.inner.execute_next_phase(None).await
    }

    /// Waits for the background loop to stop.
    pub async fn wait_idle(&self) {
        let handle = self.inner.driver.lock().await.take();
        if let Some(handle) = handle
            && let Err(e) = handle.await
        {
            tracing::error!("PRD driver task failed: {}", e);
        }
    }

    pub async fn status_report(&self) -> String {
        let slot = self.inner.plan.lock().await;
        let Some(plan) = slot.as_ref() else {
            return "No active PRD plan.".to_string();
        };

        let mut report = format!(
            "📋 **{}** ({})\nProgress: {}/{} phases, cost ${:.2}\n",
            plan.title,
            plan.status,
            plan.completed_count(),
            plan.phases.len(),
            plan.total_cost()
        );
        for (i, phase) in plan.phases.iter().enumerate() {
            let marker = if i == plan.current_phase_index && !plan.status.is_terminal() {
                "👉"
            } else {
                "  "
            };
            report.push_str(&format!("{} {}. {} [{:?}]\n", marker, i + 1, phase.name, phase.status));
        }
        if plan.consecutive_failures > 0 {
            report.push_str(&format!("Consecutive failures: {}\n", plan.consecutive_failures));
        }
        if !plan.deviations.is_empty() {
            report.push_str(&format!("Deviations: {}\n", plan.deviations.len()));
        }
        report
    }

    /// Spawns a loop for `plan_id` unless one already owns it.
    /// Must be called with the plan lock held.
    async fn start_driver(&self, plan_id: &str) {
        {
            let mut owner = self.inner.driver_owner.lock().unwrap_or_else(PoisonError::into_inner);
            if owner.as_deref() == Some(plan_id) {
                // The owning loop sees the new status before it gives up the plan
                return;
            }
            *owner = Some(plan_id.to_string());
        }
        let handle = tokio::spawn(Inner::drive(self.inner.clone(), plan_id.to_string()));
        *self.inner.driver.lock().await = Some(handle);
    }
}

impl Inner {
    fn notify(&self, checkpoint: &PrdCheckpoint) {
        tracing::info!("Checkpoint {:?}: {}", checkpoint.kind, checkpoint.message);
        if let Ok(observers) = self.observers.read() {
            for observer in observers.iter() {
                observer(checkpoint);
            }
        }
    }

    /// The phase loop for one plan. Loops left behind by an aborted plan stop
    /// at their next check without touching the plan that replaced it.
    async fn drive(inner: Arc<Inner>, plan_id: String) {
        let delay = Duration::from_millis(inner.config.phase_delay_ms);
        loop {
            if inner.execute_next_phase(Some(&plan_id)).await == Step::Continue {
                tokio::time::sleep(delay).await;
                continue;
            }

            let slot = inner.plan.lock().await;
            let resumed = slot
                .as_ref()
                .is_some_and(|p| p.id == plan_id && p.status == PlanStatus::Executing);
            if !resumed {
                let mut owner = inner.driver_owner.lock().unwrap_or_else(PoisonError::into_inner);
                if owner.as_deref() == Some(plan_id.as_str()) {
                    *owner = None;
                }
                tracing::debug!("PRD driver for plan {} stopped", plan_id);
                return;
            }
        }
    }

    /// Runs one phase. With `expected` set, a plan with another id is left alone.
    async fn execute_next_phase(&self, expected: Option<&str>) -> Step {
        let job = {
            let mut slot = self.plan.lock().await;
            let Some(plan) = slot.as_mut() else {
                return Step::Stop;
            };
            if plan.status != PlanStatus::Executing || expected.is_some_and(|id| id != plan.id) {
                return Step::Stop;
            }

            // A phase completed just before a budget stop is not re-run
            if plan
                .current_phase()
                .is_some_and(|p| p.status == PhaseStatus::Completed)
            {
                plan.current_phase_index += 1;
            }

            if plan.current_phase_index >= plan.phases.len() {
                let checkpoint = self.complete_plan(plan);
                drop(slot);
                self.notify(&checkpoint);
                return Step::Stop;
            }

            Self::begin_phase(plan)
        };

        tracing::info!("Executing phase {}: {}", job.index + 1, job.phase_name);
        let result = self.agent.run(&job.prompt, Path::new(&job.project_path)).await;

        let (step, checkpoint) = {
            let mut slot = self.plan.lock().await;
            let Some(plan) = slot
                .as_mut()
                .filter(|p| p.id == job.plan_id && p.current_phase_index == job.index && !p.status.is_terminal())
            else {
                tracing::info!("Discarding result of phase {}: plan was aborted or replaced", job.index + 1);
                return Step::Stop;
            };

            match result {
                Ok(outcome) => self.phase_succeeded(plan, &job, outcome),
                Err(error) => self.phase_failed(plan, &job, &error),
            }
        };

        self.notify(&checkpoint);
        step
    }

    fn begin_phase(plan: &mut ExecutionPlan) -> PhaseJob {
        let index = plan.current_phase_index;
        let constraints: Vec<String> = plan.constraints.iter().cloned().collect();
        let completed = plan.completed_summaries();
        let total = plan.phases.len();

        let phase = &mut plan.phases[index];
        phase.status = PhaseStatus::Executing;
        phase.started_at = Some(Utc::now());

        let prompt = prompts::phase_prompt(&PhasePrompt {
            number: index + 1,
            total,
            name: &phase.name,
            description: &phase.description,
            decisions: &phase.decisions,
            constraints: &constraints,
            completed: &completed,
            project_path: &plan.project_path,
            branch: plan.branch.as_deref(),
            prd: &plan.prd_content,
        });

        PhaseJob {
            plan_id: plan.id.clone(),
            index,
            phase_id: phase.id.clone(),
            phase_name: phase.name.clone(),
            project_path: plan.project_path.clone(),
            prompt,
        }
    }

    fn checkpoint(
        plan: &ExecutionPlan,
        job: &PhaseJob,
        kind: CheckpointKind,
        message: String,
        requires_response: bool,
    ) -> PrdCheckpoint {
        PrdCheckpoint {
            plan_id: plan.id.clone(),
            phase_index: job.index,
            phase_name: job.phase_name.clone(),
            kind,
            message,
            requires_response,
        }
    }

    fn phase_succeeded(&self, plan: &mut ExecutionPlan, job: &PhaseJob, outcome: AgentOutcome) -> (Step, PrdCheckpoint) {
        let outside: Vec<String> = plan
            .files_outside_project(&outcome.files_modified)
            .into_iter()
            .map(str::to_string)
            .collect();
        for file in outside {
            plan.record_deviation(&job.phase_id, format!("Modified {}", file), "outside the project path");
        }

        let phase = &mut plan.phases[job.index];
        phase.status = PhaseStatus::Completed;
        phase.completed_at = Some(Utc::now());
        phase.files_modified = outcome.files_modified.clone();
        phase.result = Some(truncate(&outcome.output, 2000));
        phase.cost = outcome.cost;
        plan.consecutive_failures = 0;

        let record = PhaseRecord {
            plan_id: plan.id.clone(),
            phase_id: job.phase_id.clone(),
            phase_name: job.phase_name.clone(),
            cost: outcome.cost,
            files_modified: outcome.files_modified.clone(),
        };
        let verdict = self.learning.record_phase(&record);
        if verdict.should_stop {
            plan.status = PlanStatus::Paused;
            self.learning.persist_costs();
            let reason = verdict.reason.unwrap_or_else(|| "learning system stop".to_string());
            tracing::warn!("Plan {} paused after phase {}: {}", plan.id, job.index + 1, reason);
            let message = format!(
                "⏸️ Paused after **{}**: {}. Reply `resume` to continue or `abort` to stop.",
                job.phase_name, reason
            );
            return (Step::Stop, Self::checkpoint(plan, job, CheckpointKind::BudgetStop, message, true));
        }

        self.trust.record_task(TaskRecord {
            description: format!("PRD phase {}: {}", job.index + 1, job.phase_name),
            files_modified: outcome.files_modified.clone(),
            success: true,
        });

        let message = format!(
            "✅ Phase {}/{} **{}** complete ({} files).",
            job.index + 1,
            plan.phases.len(),
            job.phase_name,
            outcome.files_modified.len()
        );
        let checkpoint = Self::checkpoint(plan, job, CheckpointKind::PhaseCompleted, message, false);
        plan.current_phase_index += 1;
        (Step::Continue, checkpoint)
    }

    fn phase_failed(&self, plan: &mut ExecutionPlan, job: &PhaseJob, error: &str) -> (Step, PrdCheckpoint) {
        if is_rate_limit_error(error) {
            // No penalty: same phase, same failure count
            plan.phases[job.index].status = PhaseStatus::Pending;
            plan.status = PlanStatus::Paused;
            self.learning.persist_costs();
            tracing::warn!("Plan {} rate limited on phase {}", plan.id, job.index + 1);
            let message = format!(
                "⏳ Rate limited during **{}**. Reply `resume` once the limit resets to retry this phase.",
                job.phase_name
            );
            return (Step::Stop, Self::checkpoint(plan, job, CheckpointKind::RateLimited, message, true));
        }

        let phase = &mut plan.phases[job.index];
        phase.status = PhaseStatus::Failed;
        phase.result = Some(truncate(error, 2000));
        phase.completed_at = Some(Utc::now());
        plan.consecutive_failures += 1;

        let record = PhaseRecord {
            plan_id: plan.id.clone(),
            phase_id: job.phase_id.clone(),
            phase_name: job.phase_name.clone(),
            cost: 0.0,
            files_modified: Vec::new(),
        };
        let verdict = self.learning.record_failure(&record, error);
        self.trust
            .record_rollback(&format!("PRD phase {} failed: {}", job.index + 1, truncate(error, 200)));
        tracing::warn!(
            "Plan {} phase {} failed ({} consecutive): {}",
            plan.id,
            job.index + 1,
            plan.consecutive_failures,
            error
        );

        if plan.consecutive_failures >= self.config.max_consecutive_failures || verdict.should_stop {
            plan.status = PlanStatus::Paused;
            self.learning.persist_costs();
            let reason = verdict
                .reason
                .unwrap_or_else(|| format!("{} consecutive failures", plan.consecutive_failures));
            let message = format!(
                "🛑 Stopped at **{}**: {}.\nLast error: {}\nReply `resume` to retry this phase or `abort`.",
                job.phase_name,
                reason,
                truncate(error, 300)
            );
            return (Step::Stop, Self::checkpoint(plan, job, CheckpointKind::CircuitBreaker, message, true));
        }

        plan.record_deviation(&job.phase_id, format!("Skipped {}", job.phase_name), truncate(error, 200));
        let message = format!(
            "⚠️ Phase **{}** failed, moving on: {}",
            job.phase_name,
            truncate(error, 300)
        );
        let checkpoint = Self::checkpoint(plan, job, CheckpointKind::PhaseFailed, message, false);
        plan.current_phase_index += 1;
        (Step::Continue, checkpoint)
    }

    fn complete_plan(&self, plan: &mut ExecutionPlan) -> PrdCheckpoint {
        plan.status = PlanStatus::Completed;
        plan.completed_at = Some(Utc::now());
        let report = plan.build_final_report();
        plan.final_report = Some(report.clone());
        self.learning.persist_costs();
        tracing::info!("Plan {} completed, cost ${:.2}", plan.id, plan.total_cost());

        PrdCheckpoint {
            plan_id: plan.id.clone(),
            phase_index: plan.phases.len(),
            phase_name: String::new(),
            kind: CheckpointKind::PlanCompleted,
            message: report,
            requires_response: false,
        }
    }
}
