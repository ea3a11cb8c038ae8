//! # Cost Tracker
//!
//! The learning system consulted by the PRD phase loop. Tracks spend per plan,
//! trips a budget stop, and detects the same error recurring across phases.
//! Totals are persisted to `costs.json` in the data directory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::application::utils::write_atomic;
use crate::domain::config::ExecutorConfig;
use crate::domain::traits::{LearningSystem, LearningVerdict, PhaseRecord};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanCosts {
    pub started_at: Option<DateTime<Utc>>,
    pub total: f64,
    pub phases: BTreeMap<String, f64>,
    /// Error signature -> occurrences.
    #[serde(default)]
    pub errors: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostLedger {
    pub lifetime_total: f64,
    pub plans: BTreeMap<String, PlanCosts>,
}

pub struct CostTracker {
    path: PathBuf,
    budget_limit: Option<f64>,
    repeated_error_limit: u32,
    ledger: Mutex<CostLedger>,
}

/// Reduces an error to a comparable signature: first line, digits masked.
fn error_signature(error: &str) -> String {
    let first = error.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    first
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_digit() { '#' } else { c })
        .take(120)
        .collect()
}

impl CostTracker {
    pub fn new(path: impl Into<PathBuf>, config: &ExecutorConfig) -> Self {
        let path = path.into();
        let ledger = Self::load(&path);
        Self {
            path,
            budget_limit: config.budget_limit,
            repeated_error_limit: config.repeated_error_limit.max(1),
            ledger: Mutex::new(ledger),
        }
    }

    fn load(path: &Path) -> CostLedger {
        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring corrupt cost ledger {:?}: {}", path, e);
                CostLedger::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => CostLedger::default(),
            Err(e) => {
                tracing::warn!("Cannot read cost ledger {:?}, starting empty: {}", path, e);
                CostLedger::default()
            }
        }
    }

    pub fn snapshot(&self) -> CostLedger {
        self.ledger.lock().map(|l| l.clone()).unwrap_or_default()
    }

    pub fn plan_total(&self, plan_id: &str) -> f64 {
        self.snapshot().plans.get(plan_id).map(|p| p.total).unwrap_or(0.0)
    }
}

impl LearningSystem for CostTracker {
    fn start_tracking(&self, plan_id: &str) {
        if let Ok(mut ledger) = self.ledger.lock() {
            ledger.plans.entry(plan_id.to_string()).or_default().started_at = Some(Utc::now());
        }
        tracing::debug!("Cost tracking started for plan {}", plan_id);
    }

    fn record_phase(&self, record: &PhaseRecord) -> LearningVerdict {
        let Ok(mut ledger) = self.ledger.lock() else {
            return LearningVerdict::proceed();
        };
        ledger.lifetime_total += record.cost;
        let plan = ledger.plans.entry(record.plan_id.clone()).or_default();
        plan.total += record.cost;
        *plan.phases.entry(record.phase_id.clone()).or_default() += record.cost;

        match self.budget_limit {
            Some(limit) if plan.total >= limit => {
                tracing::warn!("Plan {} reached budget: ${:.2} of ${:.2}", record.plan_id, plan.total, limit);
                LearningVerdict::stop(format!("budget reached (${:.2} of ${:.2})", plan.total, limit))
            }
            _ => LearningVerdict::proceed(),
        }
    }

    fn record_failure(&self, record: &PhaseRecord, error: &str) -> LearningVerdict {
        let Ok(mut ledger) = self.ledger.lock() else {
            return LearningVerdict::proceed();
        };
        let plan = ledger.plans.entry(record.plan_id.clone()).or_default();
        plan.total += record.cost;
        let signature = error_signature(error);
        let count = plan.errors.entry(signature.clone()).or_default();
        *count += 1;

        if *count >= self.repeated_error_limit {
            tracing::warn!("Repeated error in plan {} ({}x): {}", record.plan_id, count, signature);
            LearningVerdict::stop(format!("the same error occurred {} times", count))
        } else {
            LearningVerdict::proceed()
        }
    }

    fn persist_costs(&self) {
        let ledger = self.snapshot();
        let result = serde_json::to_vec_pretty(&ledger)
            .map_err(std::io::Error::other)
            .and_then(|bytes| write_atomic(&self.path, &bytes));
        if let Err(e) = result {
            tracing::warn!("Failed to persist costs to {:?}: {}", self.path, e);
        }
    }
}
