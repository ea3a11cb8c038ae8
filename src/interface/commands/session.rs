//! # Session Commands
//!
//! Listing tracked execution states, manual checkpoints, and dev sessions.

use super::{notify, reply};
use crate::application::router::AppContext;
use crate::application::state::{CheckpointReason, StateKind};
use crate::domain::traits::ChatProvider;
use crate::domain::types::ParsedIntent;
use crate::strings::messages;
use anyhow::Result;

pub async fn handle_list(ctx: &AppContext, chat: &impl ChatProvider) -> Result<()> {
    let states = ctx.states.lock().await;
    let current = states.current_state().map(|s| s.id.clone());
    let lines: Vec<String> = states
        .list_states()
        .iter()
        .map(|s| messages::state_line(s, current.as_deref() == Some(s.id.as_str())))
        .collect();
    drop(states);

    if lines.is_empty() {
        return notify(chat, messages::NO_SESSIONS).await;
    }
    reply(chat, &format!("**🗂️ Sessions**\n{}", lines.join("\n"))).await
}

pub async fn handle_checkpoint(ctx: &AppContext, chat: &impl ChatProvider, intent: &ParsedIntent) -> Result<()> {
    let name = intent.target.as_deref().unwrap_or("Manual checkpoint");
    let mut states = ctx.states.lock().await;
    let Some(current) = states.current_state().cloned() else {
        return notify(chat, messages::NO_ACTIVE_STATE).await;
    };
    match states.create_checkpoint(&current.id, name, CheckpointReason::Manual) {
        Ok(_) => reply(chat, &messages::checkpoint_saved(name, &current.description)).await,
        Err(e) => notify(chat, &messages::state_error(&e.to_string())).await,
    }
}

pub async fn handle_dev_start(ctx: &AppContext, chat: &impl ChatProvider, intent: &ParsedIntent) -> Result<()> {
    if let Some(target) = &intent.target {
        ctx.session.lock().await.project_path = Some(ctx.projects.resolve(target));
    }
    let path = ctx.workdir().await.display().to_string();

    let mut states = ctx.states.lock().await;
    let state = states.create_state(StateKind::Debug, &format!("Dev session for {}", path));
    if let Err(e) = states.switch_to_state(&state.id) {
        return notify(chat, &messages::state_error(&e.to_string())).await;
    }
    drop(states);
    ctx.session.lock().await.dev_state_id = Some(state.id);

    reply(chat, &messages::dev_started(&path)).await
}

pub async fn handle_dev_stop(ctx: &AppContext, chat: &impl ChatProvider) -> Result<()> {
    let Some(id) = ctx.session.lock().await.dev_state_id.take() else {
        return notify(chat, messages::DEV_NOT_RUNNING).await;
    };
    let mut states = ctx.states.lock().await;
    let description = states
        .get_state(&id)
        .map(|s| s.description.clone())
        .unwrap_or_default();
    match states.complete_state(&id, "Dev session stopped") {
        Ok(()) => reply(chat, &messages::dev_stopped(&description)).await,
        Err(e) => notify(chat, &messages::state_error(&e.to_string())).await,
    }
}
