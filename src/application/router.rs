//! # Command Router
//!
//! Resolves each incoming message to a [`ParsedIntent`] and dispatches it to the
//! matching handler in `interface/commands` with the shared [`AppContext`].

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::application::intent::{IntentResolver, ResolutionContext};
use crate::application::plan_store::PlanStateStore;
use crate::application::prd::{PlanStatus, PrdCheckpoint, PrdExecutor};
use crate::application::project::ProjectManager;
use crate::application::state::ExecutionStateManager;
use crate::domain::config::AppConfig;
use crate::domain::traits::{AgentRunner, ChatProvider, TrustLedger};
use crate::domain::types::{Action, ParsedIntent};
use crate::infrastructure::tools::executor::SharedToolExecutor;
use crate::interface::commands;

/// Conversation facts that outlive a single message.
#[derive(Debug, Default)]
pub struct Session {
    /// Most recent coding-agent answer, the source for `apply_last`.
    pub last_answer: Option<String>,
    pub project_path: Option<PathBuf>,
    /// Execution state mirroring the running PRD plan.
    pub prd_state_id: Option<String>,
    pub dev_state_id: Option<String>,
}

/// Shared components every handler may touch.
pub struct AppContext {
    pub config: AppConfig,
    pub plans: Mutex<PlanStateStore>,
    pub prd: PrdExecutor,
    pub states: Mutex<ExecutionStateManager>,
    pub agent: Arc<dyn AgentRunner>,
    pub trust: Arc<dyn TrustLedger>,
    pub tools: SharedToolExecutor,
    pub projects: ProjectManager,
    pub session: Mutex<Session>,
}

impl AppContext {
    /// Where agent work and commands run: the session project, else the projects root.
    pub async fn workdir(&self) -> PathBuf {
        self.session
            .lock()
            .await
            .project_path
            .clone()
            .unwrap_or_else(|| self.projects.root().to_path_buf())
    }
}

pub struct CommandRouter {
    ctx: Arc<AppContext>,
    intents: Mutex<IntentResolver>,
}

impl CommandRouter {
    pub fn new(ctx: Arc<AppContext>, intents: IntentResolver) -> Self {
        Self {
            ctx,
            intents: Mutex::new(intents),
        }
    }

    pub fn context(&self) -> &Arc<AppContext> {
        &self.ctx
    }

    pub async fn route(&self, chat: &impl ChatProvider, message: &str) -> Result<ParsedIntent> {
        let msg = message.trim();
        if msg.is_empty() {
            return Ok(ParsedIntent::pattern(Action::Unknown).with_confidence(0.0));
        }

        let resolution_ctx = ResolutionContext {
            has_pending_plan: self.ctx.plans.lock().await.has_pending(),
            prd_awaiting_approval: self.ctx.prd.status().await == Some(PlanStatus::AwaitingApproval),
        };
        let intent = self.intents.lock().await.resolve(msg, &resolution_ctx).await;
        tracing::info!(
            "Router dispatching action='{}' target={:?} method={:?}",
            intent.action,
            intent.target,
            intent.resolution_method
        );

        self.dispatch(chat, &intent, msg).await?;
        Ok(intent)
    }

    async fn dispatch(&self, chat: &impl ChatProvider, intent: &ParsedIntent, raw: &str) -> Result<()> {
        let ctx = self.ctx.as_ref();
        match intent.action {
            Action::Status => commands::misc::handle_status(ctx, chat).await,
            Action::Help => commands::help::handle_help(chat).await,
            Action::AgentAsk => commands::agent::handle_ask(ctx, chat, intent).await,
            Action::AgentStart => commands::agent::handle_start(ctx, chat, intent).await,
            Action::AgentStop => commands::agent::handle_stop(ctx, chat).await,
            Action::AgentStatus => commands::agent::handle_status(ctx, chat).await,
            Action::ApplyLast => commands::agent::handle_apply_last(ctx, chat).await,
            Action::PrdSubmit => commands::prd::handle_submit(ctx, chat, intent, raw).await,
            Action::PrdApprove => commands::prd::handle_approve(ctx, chat).await,
            Action::PrdPause => commands::prd::handle_pause(ctx, chat).await,
            Action::PrdResume => commands::prd::handle_resume(ctx, chat).await,
            Action::PrdAbort => commands::prd::handle_abort(ctx, chat).await,
            Action::PrdStatus => commands::prd::handle_status(ctx, chat).await,
            Action::AutonomousBuild => commands::prd::handle_autonomous(ctx, chat, intent).await,
            Action::PlanConfirm => commands::plan::handle_confirm(ctx, chat).await,
            Action::PlanReject => commands::plan::handle_reject(ctx, chat).await,
            Action::CreateProject => commands::project::handle_create(ctx, chat, intent).await,
            Action::SessionList => commands::session::handle_list(ctx, chat).await,
            Action::SessionCheckpoint => commands::session::handle_checkpoint(ctx, chat, intent).await,
            Action::DevStart => commands::session::handle_dev_start(ctx, chat, intent).await,
            Action::DevStop => commands::session::handle_dev_stop(ctx, chat).await,
            Action::Feedback => commands::misc::handle_feedback(ctx, chat, intent, raw).await,
            Action::Cancel => commands::misc::handle_cancel(ctx, chat, intent).await,
            Action::HomelabStatus
            | Action::HomelabServiceRestart
            | Action::HomelabServiceStart
            | Action::HomelabServiceStop
            | Action::HomelabLogs
            | Action::HomelabContainers
            | Action::HomelabVpnStatus
            | Action::HomelabDnsStats
            | Action::MediaSearch
            | Action::MediaAdd
            | Action::MediaQueue => commands::misc::handle_service(chat, intent).await,
            Action::Denied => commands::misc::handle_denied(chat, intent).await,
            Action::Unknown => commands::misc::handle_unknown(chat, intent).await,
        }
    }

    /// Mirrors a PRD checkpoint onto the plan's execution state.
    pub async fn record_checkpoint(&self, checkpoint: &PrdCheckpoint) {
        commands::prd::record_checkpoint(&self.ctx, checkpoint).await;
    }

    /// Marks live work as interrupted so it can be resumed next run.
    pub async fn shutdown(&self) {
        let mut states = self.ctx.states.lock().await;
        let live: Vec<String> = states
            .list_states()
            .iter()
            .filter(|s| s.status == crate::application::state::StateStatus::Active)
            .map(|s| s.id.clone())
            .collect();
        for id in live {
            if let Err(e) = states.interrupt_state(&id, "Shutdown") {
                tracing::warn!("Failed to interrupt state {}: {}", id, e);
            }
        }
    }
}
