//! PRD plan model: the plan, its phases, deviations and checkpoint notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use uuid::Uuid;

use crate::application::utils::extract_json;

pub const MIN_PHASES: usize = 3;
pub const MAX_PHASES: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    AwaitingApproval,
    Executing,
    Paused,
    Completed,
    Failed,
}

impl PlanStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PlanStatus::Completed | PlanStatus::Failed)
    }
}

impl std::fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PlanStatus::AwaitingApproval => "awaiting_approval",
            PlanStatus::Executing => "executing",
            PlanStatus::Paused => "paused",
            PlanStatus::Completed => "completed",
            PlanStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    Pending,
    Executing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrdPhase {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Choices the planner already made. Never open questions.
    pub decisions: Vec<String>,
    pub status: PhaseStatus,
    pub files_modified: Vec<String>,
    pub result: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrdDeviation {
    pub phase_id: String,
    pub description: String,
    pub reason: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub id: String,
    pub title: String,
    pub prd_content: String,
    pub project_path: String,
    pub branch: Option<String>,
    pub phases: Vec<PrdPhase>,
    pub total_estimate: String,
    pub confidence: f64,
    pub constraints: BTreeSet<String>,
    pub status: PlanStatus,
    pub current_phase_index: usize,
    pub deviations: Vec<PrdDeviation>,
    #[serde(skip)]
    pub consecutive_failures: u32,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub final_report: Option<String>,
}

/// Shape the planner model is asked to return.
#[derive(Debug, Deserialize)]
struct GeneratedPlan {
    #[serde(default)]
    title: Option<String>,
    phases: Vec<GeneratedPhase>,
    #[serde(default)]
    total_estimate: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    constraints: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GeneratedPhase {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    decisions: Vec<String>,
}

impl ExecutionPlan {
    /// Builds a plan from the planner's raw response. Rejects anything but 3-6 phases.
    pub fn from_generated(response: &str, prd_content: &str, project_path: &str) -> Result<Self, String> {
        let json = extract_json(response).ok_or_else(|| "planner returned no JSON".to_string())?;
        let generated: GeneratedPlan =
            serde_json::from_str(json).map_err(|e| format!("planner returned invalid JSON: {}", e))?;

        let count = generated.phases.len();
        if !(MIN_PHASES..=MAX_PHASES).contains(&count) {
            return Err(format!(
                "planner produced {} phases, expected {}-{}",
                count, MIN_PHASES, MAX_PHASES
            ));
        }

        let phases = generated
            .phases
            .into_iter()
            .enumerate()
            .map(|(i, p)| PrdPhase {
                id: format!("phase-{}", i + 1),
                name: p.name,
                description: p.description,
                decisions: p.decisions,
                status: PhaseStatus::Pending,
                files_modified: Vec::new(),
                result: None,
                started_at: None,
                completed_at: None,
                cost: 0.0,
            })
            .collect();

        let title = generated
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| prd_content.lines().next().unwrap_or("PRD").chars().take(60).collect());

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            title,
            prd_content: prd_content.to_string(),
            project_path: project_path.to_string(),
            branch: None,
            phases,
            total_estimate: generated.total_estimate.unwrap_or_else(|| "unknown".to_string()),
            confidence: generated.confidence.unwrap_or(0.7).clamp(0.0, 1.0),
            constraints: generated.constraints.into_iter().collect(),
            status: PlanStatus::AwaitingApproval,
            current_phase_index: 0,
            deviations: Vec::new(),
            consecutive_failures: 0,
            created_at: Utc::now(),
            completed_at: None,
            final_report: None,
        })
    }

    pub fn current_phase(&self) -> Option<&PrdPhase> {
        self.phases.get(self.current_phase_index)
    }

    pub fn completed_count(&self) -> usize {
        self.phases
            .iter()
            .filter(|p| p.status == PhaseStatus::Completed)
            .count()
    }

    pub fn total_cost(&self) -> f64 {
        self.phases.iter().map(|p| p.cost).sum()
    }

    pub fn record_deviation(&mut self, phase_id: &str, description: impl Into<String>, reason: impl Into<String>) {
        self.deviations.push(PrdDeviation {
            phase_id: phase_id.to_string(),
            description: description.into(),
            reason: reason.into(),
            recorded_at: Utc::now(),
        });
    }

    /// Files a phase reported that live outside the project directory.
    pub fn files_outside_project<'a>(&self, files: &'a [String]) -> Vec<&'a str> {
        let root = Path::new(&self.project_path);
        files
            .iter()
            .filter(|f| {
                let path = Path::new(f.as_str());
                path.is_absolute() && !path.starts_with(root)
            })
            .map(String::as_str)
            .collect()
    }

    /// Summary lines of finished phases, fed into later phase prompts.
    pub fn completed_summaries(&self) -> Vec<String> {
        self.phases
            .iter()
            .filter(|p| p.status == PhaseStatus::Completed)
            .map(|p| {
                let result = p.result.as_deref().unwrap_or("done");
                let first = result.lines().next().unwrap_or("done");
                format!("{}: {}", p.name, first)
            })
            .collect()
    }

    pub fn build_final_report(&self) -> String {
        let mut report = format!("🏁 **{}** finished\n\n", self.title);
        for (i, phase) in self.phases.iter().enumerate() {
            let icon = match phase.status {
                PhaseStatus::Completed => "✅",
                PhaseStatus::Failed => "❌",
                PhaseStatus::Executing => "⏳",
                PhaseStatus::Pending => "⏸️",
            };
            report.push_str(&format!("{} {}. {}\n", icon, i + 1, phase.name));
        }

        let files: BTreeSet<&str> = self
            .phases
            .iter()
            .flat_map(|p| p.files_modified.iter().map(String::as_str))
            .collect();
        if !files.is_empty() {
            report.push_str(&format!("\n**Files modified** ({}):\n", files.len()));
            for file in files {
                report.push_str(&format!("- `{}`\n", file));
            }
        }

        if !self.deviations.is_empty() {
            report.push_str("\n**Deviations**:\n");
            for d in &self.deviations {
                report.push_str(&format!("- {}: {} ({})\n", d.phase_id, d.description, d.reason));
            }
        }

        if let Some(branch) = &self.branch {
            report.push_str(&format!("\n**Branch**: `{}`\n", branch));
        }
        report.push_str(&format!("\n**Cost**: ${:.2}", self.total_cost()));
        report
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointKind {
    PhaseCompleted,
    PhaseFailed,
    RateLimited,
    CircuitBreaker,
    BudgetStop,
    PlanCompleted,
}

/// Progress notification pushed to observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrdCheckpoint {
    pub plan_id: String,
    pub phase_index: usize,
    pub phase_name: String,
    pub kind: CheckpointKind,
    pub message: String,
    pub requires_response: bool,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PrdError {
    #[error("No active plan.")]
    NoActivePlan,
    #[error("A plan is already in progress ({0}). Abort it first.")]
    PlanActive(PlanStatus),
    #[error("Cannot {action} while the plan is {status}.")]
    InvalidState { action: &'static str, status: PlanStatus },
    #[error("Planning failed: {0}")]
    Planning(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    const THREE_PHASES: &str = r#"{"title":"Todo","phases":[
        {"name":"Scaffold","description":"init","decisions":["Use Vite"]},
        {"name":"Storage","description":"db","decisions":["SQLite"]},
        {"name":"UI","description":"views","decisions":[]}
    ],"total_estimate":"2h","confidence":0.8,"constraints":["no docker"]}"#;

    #[test]
    fn test_from_generated_builds_pending_phases() {
        let plan = ExecutionPlan::from_generated(THREE_PHASES, "a todo app", "/tmp/todo").unwrap();
        assert_eq!(plan.status, PlanStatus::AwaitingApproval);
        assert_eq!(plan.phases.len(), 3);
        assert_eq!(plan.phases[1].id, "phase-2");
        assert!(plan.phases.iter().all(|p| p.status == PhaseStatus::Pending));
        assert!(plan.constraints.contains("no docker"));
        assert_eq!(plan.title, "Todo");
    }

    #[test]
    fn test_phase_count_outside_range_is_rejected() {
        let two = r#"{"phases":[{"name":"a"},{"name":"b"}]}"#;
        assert!(ExecutionPlan::from_generated(two, "x", "/tmp").is_err());
        let seven = format!(
            "{{\"phases\":[{}]}}",
            vec![r#"{"name":"p"}"#; 7].join(",")
        );
        assert!(ExecutionPlan::from_generated(&seven, "x", "/tmp").is_err());
        assert!(ExecutionPlan::from_generated("not json", "x", "/tmp").is_err());
    }

    #[test]
    fn test_files_outside_project() {
        let plan = ExecutionPlan::from_generated(THREE_PHASES, "a todo app", "/tmp/todo").unwrap();
        let files = vec![
            "src/main.ts".to_string(),
            "/tmp/todo/package.json".to_string(),
            "/etc/hosts".to_string(),
        ];
        assert_eq!(plan.files_outside_project(&files), vec!["/etc/hosts"]);
    }

    #[test]
    fn test_final_report_lists_files_and_deviations() {
        let mut plan = ExecutionPlan::from_generated(THREE_PHASES, "a todo app", "/tmp/todo").unwrap();
        plan.phases[0].status = PhaseStatus::Completed;
        plan.phases[0].files_modified = vec!["index.html".into()];
        plan.phases[0].cost = 0.25;
        plan.record_deviation("phase-2", "Skipped", "agent error");
        let report = plan.build_final_report();
        assert!(report.contains("index.html"));
        assert!(report.contains("phase-2: Skipped (agent error)"));
        assert!(report.contains("$0.25"));
    }
}
