//! # PRD Commands
//!
//! Submitting, approving and steering autonomous builds. Each approved plan is
//! mirrored by an execution state so it shows up in sessions and survives restarts.

use super::{notify, reply};
use crate::application::prd::{CheckpointKind, ExecutionPlan, PlanStatus, PrdCheckpoint};
use crate::application::router::AppContext;
use crate::application::state::{ExecutionStateManager, StateError, StateKind};
use crate::domain::traits::ChatProvider;
use crate::domain::types::{Action, ParsedIntent};
use crate::strings::messages;
use anyhow::Result;

pub async fn handle_submit(
    ctx: &AppContext,
    chat: &impl ChatProvider,
    intent: &ParsedIntent,
    raw: &str,
) -> Result<()> {
    let content = intent.prompt.as_deref().unwrap_or(raw);
    let project_path = {
        let session = ctx.session.lock().await;
        match (&session.project_path, &intent.target) {
            (Some(path), _) => path.clone(),
            (None, Some(target)) => ctx.projects.resolve(target),
            (None, None) => ctx.projects.resolve(content.lines().next().unwrap_or("project")),
        }
    };

    let _ = chat.typing(true).await;
    let result = ctx
        .prd
        .submit_prd(content, &project_path.display().to_string())
        .await;
    let _ = chat.typing(false).await;

    match result {
        Ok(plan) => reply(chat, &messages::plan_summary(&plan)).await,
        Err(e) => notify(chat, &messages::prd_error(&e.to_string())).await,
    }
}

pub async fn handle_approve(ctx: &AppContext, chat: &impl ChatProvider) -> Result<()> {
    if let Some(plan) = ctx.prd.current_plan().await
        && plan.status == PlanStatus::AwaitingApproval
        && let Err(e) = tokio::fs::create_dir_all(&plan.project_path).await
    {
        tracing::warn!("Failed to create project dir {}: {}", plan.project_path, e);
    }

    let plan = match ctx.prd.approve_plan().await {
        Ok(plan) => plan,
        Err(e) => return notify(chat, &messages::prd_error(&e.to_string())).await,
    };

    let tracked = track_plan(&mut *ctx.states.lock().await, &plan);
    match tracked {
        Ok(state_id) => ctx.session.lock().await.prd_state_id = Some(state_id),
        Err(e) => tracing::warn!("Failed to track plan {}: {}", plan.id, e),
    }

    reply(chat, &messages::plan_approved(&plan)).await
}

/// Opens the execution state that mirrors an approved plan and makes it current.
fn track_plan(states: &mut ExecutionStateManager, plan: &ExecutionPlan) -> Result<String, StateError> {
    let state = states.create_state(StateKind::Task, &format!("Build: {}", plan.title));
    states.switch_to_state(&state.id)?;
    states.add_memory(&state.id, "plan_id", serde_json::json!(plan.id))?;
    states.update_state(&state.id, |s| {
        s.progress.total = plan.phases.len() as u32;
        s.progress.pending_steps = plan.phases.iter().map(|p| p.name.clone()).collect();
    })?;
    Ok(state.id)
}

pub async fn handle_pause(ctx: &AppContext, chat: &impl ChatProvider) -> Result<()> {
    match ctx.prd.pause_execution().await {
        Ok(plan) => {
            with_plan_state(ctx, |states, id| states.pause_state(id, "Build paused")).await;
            reply(chat, &messages::plan_paused(&plan)).await
        }
        Err(e) => notify(chat, &messages::prd_error(&e.to_string())).await,
    }
}

pub async fn handle_resume(ctx: &AppContext, chat: &impl ChatProvider) -> Result<()> {
    match ctx.prd.resume_execution().await {
        Ok(plan) => {
            with_plan_state(ctx, |states, id| states.resume_state(id)).await;
            reply(chat, &messages::plan_resumed(&plan)).await
        }
        Err(e) => notify(chat, &messages::prd_error(&e.to_string())).await,
    }
}

pub async fn handle_abort(ctx: &AppContext, chat: &impl ChatProvider) -> Result<()> {
    match ctx.prd.abort_execution().await {
        Ok(plan) => {
            with_plan_state(ctx, |states, id| states.fail_state(id, "Aborted by user")).await;
            ctx.session.lock().await.prd_state_id = None;
            reply(chat, &messages::plan_aborted(&plan)).await
        }
        Err(e) => notify(chat, &messages::prd_error(&e.to_string())).await,
    }
}

pub async fn handle_status(ctx: &AppContext, chat: &impl ChatProvider) -> Result<()> {
    reply(chat, &ctx.prd.status_report().await).await
}

/// "Build it to completion": approve, resume, or plan the last discussed task and run it.
pub async fn handle_autonomous(ctx: &AppContext, chat: &impl ChatProvider, intent: &ParsedIntent) -> Result<()> {
    match ctx.prd.status().await {
        Some(PlanStatus::AwaitingApproval) => return handle_approve(ctx, chat).await,
        Some(PlanStatus::Paused) => return handle_resume(ctx, chat).await,
        Some(PlanStatus::Executing) => return notify(chat, messages::BUILD_ALREADY_RUNNING).await,
        _ => {}
    }

    let source = match &intent.prompt {
        Some(task) => Some(task.clone()),
        None => ctx.session.lock().await.last_answer.clone(),
    };
    let Some(source) = source else {
        return notify(chat, messages::NOTHING_TO_BUILD).await;
    };

    let planning = ParsedIntent::pattern(Action::PrdSubmit).with_prompt(Some(source.clone()));
    handle_submit(ctx, chat, &planning, &source).await?;
    if ctx.prd.status().await == Some(PlanStatus::AwaitingApproval) {
        handle_approve(ctx, chat).await?;
    }
    Ok(())
}

/// Mirrors executor progress onto the plan's execution state.
pub async fn record_checkpoint(ctx: &AppContext, checkpoint: &PrdCheckpoint) {
    let total = ctx
        .prd
        .current_plan()
        .await
        .map(|p| p.phases.len() as u32)
        .unwrap_or_default();

    let phase = checkpoint.phase_name.clone();
    let message = checkpoint.message.clone();
    match checkpoint.kind {
        CheckpointKind::PhaseCompleted => {
            let done = checkpoint.phase_index as u32 + 1;
            with_plan_state(ctx, |states, id| states.update_progress(id, done, total, Some(&phase))).await;
        }
        CheckpointKind::PhaseFailed => {
            with_plan_state(ctx, |states, id| states.add_reasoning(id, &format!("Skipped {}: {}", phase, message))).await;
        }
        CheckpointKind::RateLimited | CheckpointKind::CircuitBreaker | CheckpointKind::BudgetStop => {
            with_plan_state(ctx, |states, id| states.pause_state(id, &message)).await;
        }
        CheckpointKind::PlanCompleted => {
            with_plan_state(ctx, |states, id| states.complete_state(id, &message)).await;
            ctx.session.lock().await.prd_state_id = None;
        }
    }
}

async fn with_plan_state<F>(ctx: &AppContext, op: F)
where
    F: FnOnce(&mut ExecutionStateManager, &str) -> Result<(), StateError>,
{
    let Some(id) = ctx.session.lock().await.prd_state_id.clone() else {
        return;
    };
    let mut states = ctx.states.lock().await;
    if let Err(e) = op(&mut *states, &id) {
        tracing::debug!("Plan state {} not updated: {}", id, e);
    }
}
