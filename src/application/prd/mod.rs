//! # PRD Execution
//!
//! Autonomous, phased builds: a PRD is planned into 3-6 phases, approved by the
//! user, then executed unattended with checkpoints, rate-limit backoff and a
//! consecutive-failure circuit breaker.

pub mod executor;
pub mod plan;

pub use executor::PrdExecutor;
pub use plan::{CheckpointKind, ExecutionPlan, PlanStatus, PrdCheckpoint, PrdError};
