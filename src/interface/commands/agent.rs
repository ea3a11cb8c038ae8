//! # Agent Commands
//!
//! Ad-hoc questions to the coding agent, agent sessions, and turning the
//! agent's last answer into a command plan awaiting confirmation.

use super::{notify, reply};
use crate::application::router::AppContext;
use crate::application::state::StateKind;
use crate::application::utils::truncate;
use crate::domain::traits::ChatProvider;
use crate::domain::types::ParsedIntent;
use crate::strings::messages;
use anyhow::Result;

const SHELL_FENCES: [&str; 6] = ["", "bash", "sh", "shell", "console", "zsh"];

/// Shell commands from the fenced code blocks of an answer, in order.
pub fn extract_commands(answer: &str) -> Vec<String> {
    let mut commands = Vec::new();
    let mut in_block = false;
    let mut shell_block = false;

    for line in answer.lines() {
        let trimmed = line.trim();
        if let Some(lang) = trimmed.strip_prefix("```") {
            if in_block {
                in_block = false;
            } else {
                in_block = true;
                shell_block = SHELL_FENCES.contains(&lang.trim().to_lowercase().as_str());
            }
            continue;
        }
        if !in_block || !shell_block || trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let command = trimmed.strip_prefix("$ ").unwrap_or(trimmed);
        commands.push(command.to_string());
    }
    commands
}

pub async fn handle_ask(ctx: &AppContext, chat: &impl ChatProvider, intent: &ParsedIntent) -> Result<()> {
    let Some(question) = intent.prompt.as_deref().or(intent.target.as_deref()) else {
        return notify(chat, messages::ASK_USAGE).await;
    };

    let mut prompt = question.to_string();
    {
        let plans = ctx.plans.lock().await;
        if let Some(results) = plans.recent_results(chrono::Utc::now()) {
            prompt.push_str("\n\nRecently executed commands:\n");
            for r in results {
                let status = if r.success { "ok" } else { "failed" };
                prompt.push_str(&format!("$ {} ({})\n{}\n", r.command, status, truncate(&r.output, 500)));
            }
        }
    }

    let workdir = ctx.workdir().await;
    let _ = chat.typing(true).await;
    let result = ctx.agent.run(&prompt, &workdir).await;
    let _ = chat.typing(false).await;

    match result {
        Ok(outcome) => {
            ctx.session.lock().await.last_answer = Some(outcome.output.clone());
            let mut states = ctx.states.lock().await;
            if let Some(id) = states.current_state().map(|s| s.id.clone())
                && let Err(e) = states.add_reasoning(&id, &format!("Asked: {}", truncate(question, 120)))
            {
                tracing::warn!("Failed to record question: {}", e);
            }
            drop(states);
            reply(chat, &messages::agent_answer(&outcome.output, &outcome.files_modified)).await
        }
        Err(e) => {
            tracing::warn!("Agent ask failed: {}", e);
            notify(chat, &messages::agent_error(&e)).await
        }
    }
}

/// Opens a tracked agent session, pausing whatever was active.
pub async fn handle_start(ctx: &AppContext, chat: &impl ChatProvider, intent: &ParsedIntent) -> Result<()> {
    if let Some(target) = &intent.target {
        ctx.session.lock().await.project_path = Some(ctx.projects.resolve(target));
    }
    let workdir = ctx.workdir().await;
    let path = workdir.display().to_string();

    let mut states = ctx.states.lock().await;
    let state = states.create_state(StateKind::Task, &format!("Agent session in {}", path));
    if let Err(e) = states.switch_to_state(&state.id) {
        return notify(chat, &messages::state_error(&e.to_string())).await;
    }
    if let Err(e) = states.add_memory(&state.id, "workdir", serde_json::json!(path)) {
        tracing::warn!("Failed to record workdir: {}", e);
    }
    drop(states);

    reply(chat, &messages::agent_started(&path)).await
}

pub async fn handle_stop(ctx: &AppContext, chat: &impl ChatProvider) -> Result<()> {
    let mut states = ctx.states.lock().await;
    let Some(current) = states.current_state().cloned() else {
        return notify(chat, messages::NO_ACTIVE_STATE).await;
    };
    match states.pause_state(&current.id, "Stopped by user") {
        Ok(()) => reply(chat, &messages::agent_stopped(&current.description)).await,
        Err(e) => notify(chat, &messages::state_error(&e.to_string())).await,
    }
}

pub async fn handle_status(ctx: &AppContext, chat: &impl ChatProvider) -> Result<()> {
    let states = ctx.states.lock().await;
    match states.current_state() {
        Some(state) => {
            let mut msg = messages::state_line(state, true);
            if let Some(last) = state.memory.reasoning.last() {
                msg.push_str(&format!("\nLast: {}", last));
            }
            reply(chat, &msg).await
        }
        None => notify(chat, messages::NO_ACTIVE_STATE).await,
    }
}

/// Proposes the commands from the last agent answer as a pending plan.
pub async fn handle_apply_last(ctx: &AppContext, chat: &impl ChatProvider) -> Result<()> {
    let Some(answer) = ctx.session.lock().await.last_answer.clone() else {
        return notify(chat, messages::NO_LAST_ANSWER).await;
    };
    let commands = extract_commands(&answer);
    if commands.is_empty() {
        return notify(chat, messages::NO_COMMANDS_FOUND).await;
    }

    let description = "Apply the last response";
    let msg = messages::plan_proposal(description, &commands);
    ctx.plans.lock().await.propose(commands, description);
    reply(chat, &msg).await
}
