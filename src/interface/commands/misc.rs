//! # Miscellaneous Commands
//!
//! Status, feedback, cancel, and the replies for actions nothing here executes
//! (homelab/media services, denied and unknown intents).

use super::{notify, reply};
use crate::application::prd::PlanStatus;
use crate::application::router::AppContext;
use crate::domain::traits::ChatProvider;
use crate::domain::types::ParsedIntent;
use crate::strings::messages;
use anyhow::Result;

pub async fn handle_status(ctx: &AppContext, chat: &impl ChatProvider) -> Result<()> {
    let session = {
        let states = ctx.states.lock().await;
        states.current_state().map(|s| messages::state_line(s, true))
    };
    let build = ctx.prd.current_plan().await.map(|plan| {
        format!(
            "{} ({}, {}/{} phases)",
            plan.title,
            plan.status,
            plan.completed_count(),
            plan.phases.len()
        )
    });
    let pending = ctx.plans.lock().await.pending().map(|p| p.commands.len());

    let msg = messages::status_summary(session, build, pending, ctx.trust.trust_level());
    reply(chat, &msg).await
}

/// Records feedback against the current session, if there is one.
pub async fn handle_feedback(
    ctx: &AppContext,
    chat: &impl ChatProvider,
    intent: &ParsedIntent,
    raw: &str,
) -> Result<()> {
    let feedback = intent.prompt.as_deref().unwrap_or(raw);
    let mut states = ctx.states.lock().await;
    if let Some(id) = states.current_state().map(|s| s.id.clone())
        && let Err(e) = states.add_reasoning(&id, &format!("Feedback: {}", feedback))
    {
        tracing::warn!("Failed to record feedback: {}", e);
    }
    tracing::info!("Feedback: {}", feedback);
    reply(chat, messages::FEEDBACK_NOTED).await
}

/// Rejects a pending command plan, else pauses a running build on a bare "stop".
pub async fn handle_cancel(ctx: &AppContext, chat: &impl ChatProvider, intent: &ParsedIntent) -> Result<()> {
    if ctx.plans.lock().await.reject().is_some() {
        return reply(chat, messages::PLAN_REJECTED).await;
    }
    if intent.target.is_none() && ctx.prd.status().await == Some(PlanStatus::Executing) {
        return super::prd::handle_pause(ctx, chat).await;
    }
    match &intent.target {
        Some(target) => reply(chat, &messages::not_doing(target)).await,
        None => notify(chat, messages::NOTHING_TO_CANCEL).await,
    }
}

pub async fn handle_service(chat: &impl ChatProvider, intent: &ParsedIntent) -> Result<()> {
    tracing::info!("No integration for {} ({:?})", intent.action, intent.target);
    reply(chat, &messages::not_connected(intent.action, intent.target.as_deref())).await
}

pub async fn handle_denied(chat: &impl ChatProvider, intent: &ParsedIntent) -> Result<()> {
    notify(chat, &messages::denied(intent.message.as_deref())).await
}

pub async fn handle_unknown(chat: &impl ChatProvider, intent: &ParsedIntent) -> Result<()> {
    match &intent.message {
        Some(message) => {
            tracing::debug!("Unknown intent: {}", message);
            reply(chat, &format!("{}\n_{}_", messages::UNKNOWN_INTENT, message)).await
        }
        None => reply(chat, messages::UNKNOWN_INTENT).await,
    }
}

#[cfg(test)]
mod tests {
    use crate::application::prd::PlanStatus;
    use crate::application::router::tests::harness;
    use crate::domain::types::Action;

    const PLAN: &str = r#"{"title":"Habits","phases":[
        {"name":"Scaffold","description":"init","decisions":[]},
        {"name":"Storage","description":"db","decisions":[]}
    ],"total_estimate":"1h","confidence":0.9}"#;

    #[tokio::test]
    async fn test_bare_stop_pauses_running_build() {
        let h = harness(1);
        h.llm.push(Ok(PLAN));
        h.router.route(&h.chat, "prd: a habit tracker").await.unwrap();
        let gate = h.agent.hold_next();
        h.router.route(&h.chat, "yes").await.unwrap();
        gate.entered().await;

        let intent = h.router.route(&h.chat, "stop").await.unwrap();
        assert_eq!(intent.action, Action::Cancel);
        let ctx = h.router.context().clone();
        assert_eq!(ctx.prd.status().await, Some(PlanStatus::Paused));

        gate.release();
        ctx.prd.wait_idle().await;
        assert_eq!(ctx.prd.status().await, Some(PlanStatus::Paused));
        assert_eq!(h.agent.run_count(), 1);
    }

    #[tokio::test]
    async fn test_bare_stop_with_nothing_running() {
        let h = harness(1);
        let intent = h.router.route(&h.chat, "stop").await.unwrap();
        assert_eq!(intent.action, Action::Cancel);
        assert_eq!(h.chat.last().unwrap(), crate::strings::messages::NOTHING_TO_CANCEL);
    }

    #[tokio::test]
    async fn test_negated_command_is_not_executed() {
        let h = harness(2);
        let intent = h.router.route(&h.chat, "don't restart plex").await.unwrap();
        assert_eq!(intent.action, Action::Cancel);
        assert!(h.chat.last().unwrap().starts_with("👍 Okay, I won't"));
    }

    #[tokio::test]
    async fn test_unknown_without_model_explains() {
        let h = harness(1);
        let intent = h.router.route(&h.chat, "flibber the wotsit sideways").await.unwrap();
        assert_eq!(intent.action, Action::Unknown);
        assert!(h.chat.last().unwrap().contains("not sure"));
    }

    #[tokio::test]
    async fn test_feedback_is_recorded_on_current_session() {
        let h = harness(1);
        h.router.route(&h.chat, "start agent").await.unwrap();
        h.router
            .route(&h.chat, "this is wrong, the port should be 8080")
            .await
            .unwrap();
        let states = h.router.context().states.lock().await;
        let current = states.current_state().unwrap();
        assert!(current.memory.reasoning.iter().any(|r| r.starts_with("Feedback:")));
    }
}
