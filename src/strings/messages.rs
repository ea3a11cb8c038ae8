//! # Messages
//!
//! Contains constant strings and format functions for user-facing messages.
//! Includes error messages, status updates, and notification templates.

use crate::application::plan_store::ExecutionResult;
use crate::application::prd::ExecutionPlan;
use crate::application::state::ExecutionState;
use crate::domain::types::Action;

pub const WELCOME: &str = "👋 Jeeves is ready. Type `help` to see what I can do.";
pub const UNKNOWN_INTENT: &str = "❓ I'm not sure what you want me to do. Try `help`.";
pub const ASK_USAGE: &str = "Usage: `ask claude <question>`";
pub const NO_ACTIVE_STATE: &str = "No active session.";
pub const NO_SESSIONS: &str = "No sessions yet.";
pub const NO_PENDING_PLAN: &str = "There is no command plan waiting for confirmation.";
pub const PLAN_REJECTED: &str = "🗑️ Plan discarded. Nothing was run.";
pub const NOTHING_TO_CANCEL: &str = "Nothing to cancel.";
pub const NO_LAST_ANSWER: &str = "There is no previous answer to apply.";
pub const NO_COMMANDS_FOUND: &str = "The last answer has no commands in code blocks to apply.";
pub const NOTHING_TO_BUILD: &str =
    "Nothing to build yet. Submit a PRD (`prd: ...`) or ask the agent for a plan first.";
pub const BUILD_ALREADY_RUNNING: &str = "⏳ The build is already running.";
pub const FEEDBACK_NOTED: &str = "📝 Noted.";
pub const DEV_NOT_RUNNING: &str = "No dev session is running.";
pub const PROJECT_NAME_REQUIRED: &str = "Usage: `create project <name>`";

pub fn agent_error(err: &str) -> String {
    format!("❌ **Agent failed**: {err}")
}

pub fn agent_answer(output: &str, files: &[String]) -> String {
    if files.is_empty() {
        return output.to_string();
    }
    let list = files
        .iter()
        .map(|f| format!("- `{f}`"))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{output}\n\n**Files modified**:\n{list}")
}

pub fn agent_started(path: &str) -> String {
    format!("🤖 Agent session started in `{path}`.")
}

pub fn agent_stopped(description: &str) -> String {
    format!("⏸️ Paused: {description}")
}

pub fn denied(message: Option<&str>) -> String {
    format!(
        "🚫 **Not allowed**: {}",
        message.unwrap_or("you do not have enough trust for that yet.")
    )
}

pub fn not_connected(action: Action, target: Option<&str>) -> String {
    match target {
        Some(target) => format!("🔌 Understood `{action}` for **{target}**, but no service is connected to handle it."),
        None => format!("🔌 Understood `{action}`, but no service is connected to handle it."),
    }
}

pub fn not_doing(target: &str) -> String {
    format!("👍 Okay, I won't {target}.")
}

pub fn plan_proposal(description: &str, commands: &[String]) -> String {
    let list = commands
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{}. `{}`", i + 1, c))
        .collect::<Vec<_>>()
        .join("\n");
    format!("📋 **{description}**\n{list}\n\nRun these? (yes/no)")
}

pub fn plan_results(results: &[ExecutionResult], skipped: usize) -> String {
    let mut msg = String::new();
    for r in results {
        let icon = if r.success { "✅" } else { "❌" };
        msg.push_str(&format!("{icon} `{}`\n", r.command));
        if !r.output.is_empty() {
            msg.push_str(&format!("```\n{}\n```\n", r.output));
        }
    }
    if skipped > 0 {
        msg.push_str(&format!("⏭️ Skipped {skipped} remaining command(s) after the failure.\n"));
    }
    msg.trim_end().to_string()
}

pub fn plan_summary(plan: &ExecutionPlan) -> String {
    let mut msg = format!(
        "📐 **{}** ({} phases, estimate {}, confidence {:.0}%)\n",
        plan.title,
        plan.phases.len(),
        plan.total_estimate,
        plan.confidence * 100.0
    );
    for (i, phase) in plan.phases.iter().enumerate() {
        msg.push_str(&format!("{}. **{}**: {}\n", i + 1, phase.name, phase.description));
    }
    msg.push_str(&format!("\nProject: `{}`\nApprove to start building. (yes/no)", plan.project_path));
    msg
}

pub fn plan_approved(plan: &ExecutionPlan) -> String {
    match &plan.branch {
        Some(branch) => format!("🚀 Building **{}** on branch `{}`.", plan.title, branch),
        None => format!("🚀 Building **{}**.", plan.title),
    }
}

pub fn plan_paused(plan: &ExecutionPlan) -> String {
    format!(
        "⏸️ **{}** paused after {}/{} phases.",
        plan.title,
        plan.completed_count(),
        plan.phases.len()
    )
}

pub fn plan_resumed(plan: &ExecutionPlan) -> String {
    format!("▶️ Resuming **{}** at phase {}.", plan.title, plan.current_phase_index + 1)
}

pub fn plan_aborted(plan: &ExecutionPlan) -> String {
    format!("🛑 **{}** aborted.", plan.title)
}

pub fn prd_error(err: &str) -> String {
    format!("⚠️ {err}")
}

pub fn project_created(path: &str) -> String {
    format!("📁 Project created at `{path}`.")
}

pub fn project_creation_failed(err: &str) -> String {
    format!("Failed to create project: {err}")
}

pub fn state_line(state: &ExecutionState, current: bool) -> String {
    let marker = if current { "▶" } else { "•" };
    let progress = if state.progress.total > 0 {
        format!(" [{}/{}]", state.progress.current, state.progress.total)
    } else {
        String::new()
    };
    format!(
        "{marker} {} ({:?}, {}){progress}",
        state.description, state.kind, state.status
    )
}

pub fn checkpoint_saved(name: &str, description: &str) -> String {
    format!("💾 Checkpoint '{name}' saved for {description}.")
}

pub fn dev_started(path: &str) -> String {
    format!("🛠️ Dev session started for `{path}`.")
}

pub fn dev_stopped(description: &str) -> String {
    format!("✅ Finished: {description}")
}

pub fn state_error(err: &str) -> String {
    format!("⚠️ {err}")
}

pub fn status_summary(
    session: Option<String>,
    build: Option<String>,
    pending_commands: Option<usize>,
    trust_level: i32,
) -> String {
    let mut msg = String::from("**📊 Status**\n");
    msg.push_str(&format!("**Session**: {}\n", session.as_deref().unwrap_or("none")));
    msg.push_str(&format!("**Build**: {}\n", build.as_deref().unwrap_or("none")));
    if let Some(count) = pending_commands {
        msg.push_str(&format!("**Pending plan**: {count} command(s) awaiting yes/no\n"));
    }
    msg.push_str(&format!("**Trust level**: {trust_level}"));
    msg
}
