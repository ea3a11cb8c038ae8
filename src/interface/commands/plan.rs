//! # Plan Commands
//!
//! Answers to a pending command plan: run it, or throw it away.

use chrono::Utc;

use super::{notify, reply};
use crate::application::plan_store::ExecutionResult;
use crate::application::router::AppContext;
use crate::domain::traits::ChatProvider;
use crate::strings::messages;
use anyhow::Result;

/// Runs the pending commands in order, stopping at the first failure.
pub async fn handle_confirm(ctx: &AppContext, chat: &impl ChatProvider) -> Result<()> {
    let Some(plan) = ctx.plans.lock().await.accept() else {
        return notify(chat, messages::NO_PENDING_PLAN).await;
    };

    let workdir = ctx.workdir().await;
    let _ = chat.typing(true).await;
    let mut results = Vec::with_capacity(plan.commands.len());
    {
        let tools = ctx.tools.lock().await;
        for command in &plan.commands {
            let (success, output) = match tools.execute_command(command, &workdir).await {
                Ok(out) => (out.success, out.output),
                Err(e) => (false, format!("{:#}", e)),
            };
            results.push(ExecutionResult {
                command: command.clone(),
                success,
                output,
                recorded_at: Utc::now(),
            });
            if !success {
                tracing::warn!("Plan command failed, stopping: {}", command);
                break;
            }
        }
    }
    let _ = chat.typing(false).await;

    let skipped = plan.commands.len() - results.len();
    let msg = messages::plan_results(&results, skipped);
    ctx.plans.lock().await.record_results(results);
    reply(chat, &msg).await
}

pub async fn handle_reject(ctx: &AppContext, chat: &impl ChatProvider) -> Result<()> {
    match ctx.plans.lock().await.reject() {
        Some(plan) => {
            tracing::info!("Rejected plan: {}", plan.description);
            reply(chat, messages::PLAN_REJECTED).await
        }
        None => notify(chat, messages::NO_PENDING_PLAN).await,
    }
}

#[cfg(test)]
mod tests {
    use crate::application::router::tests::harness;

    #[tokio::test]
    async fn test_failed_command_stops_the_plan() {
        let h = harness(2);
        h.router
            .context()
            .plans
            .lock()
            .await
            .propose(vec!["false".into(), "echo never".into()], "Check");
        h.router.route(&h.chat, "yes").await.unwrap();

        let reply = h.chat.last().unwrap();
        assert!(reply.contains("❌ `false`"));
        assert!(reply.contains("Skipped 1"));
        let plans = h.router.context().plans.lock().await;
        assert_eq!(plans.recent_results(chrono::Utc::now()).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_yes_without_pending_plan_is_not_a_confirmation() {
        let h = harness(2);
        h.router.route(&h.chat, "yes").await.unwrap();
        assert!(h.router.context().plans.lock().await.recent_results(chrono::Utc::now()).is_none());
    }
}
