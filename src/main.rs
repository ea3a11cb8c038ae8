//! # Main Entry Point
//!
//! Initializes the application:
//! - Domain: Configuration and Types
//! - Infrastructure: Console chat, LLM client, coding agent, trust ledger
//! - Application: Intent cascade, PRD executor, execution state, router
//! - Interface: Command Handlers
//!
//! Then reads messages from stdin until EOF or Ctrl-C.

mod application;
mod domain;
mod infrastructure;
mod interface;
mod strings;
#[cfg(test)]
mod test_support;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::application::intent::IntentResolver;
use crate::application::intent::classifier::{LlmClassifier, LlmParser};
use crate::application::learning::CostTracker;
use crate::application::plan_store::PlanStateStore;
use crate::application::prd::{PrdCheckpoint, PrdExecutor};
use crate::application::project::ProjectManager;
use crate::application::router::{AppContext, CommandRouter, Session};
use crate::application::state::ExecutionStateManager;
use crate::domain::config::AppConfig;
use crate::domain::paths;
use crate::domain::traits::{ChatProvider, LlmProvider, TrustLedger};
use crate::infrastructure::agent::CliAgent;
use crate::infrastructure::console::ConsoleChat;
use crate::infrastructure::llm::Client as LlmClient;
use crate::infrastructure::tools::executor::ToolExecutor;
use crate::infrastructure::trust::LocalTrust;

#[derive(Parser, Debug)]
#[command(name = "jeeves", about = "Chat-driven assistant for coding agents and autonomous builds")]
struct Args {
    /// Path to the config file (defaults to <data-dir>/config.yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding state, costs and logs
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1. Load Configuration
    let default_data_dir = args.data_dir.clone().unwrap_or_else(|| PathBuf::from("data"));
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| default_data_dir.join(paths::CONFIG_FILE));
    let (config, config_error) = match AppConfig::load(&config_path) {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };
    let data_dir = args
        .data_dir
        .unwrap_or_else(|| paths::expand_home(&config.system.data_dir));
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

    // 2. Logging Setup
    let file_appender = tracing_appender::rolling::never(&data_dir, paths::SESSION_LOG_FILE);
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,reqwest=warn,hyper=warn"));
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false);
    let console_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    tracing::info!("Starting Jeeves...");
    if let Some(e) = config_error {
        tracing::warn!("Using default configuration: {:#}", e);
    }

    // 3. Initialize Infrastructure
    let llm: Arc<dyn LlmProvider> = Arc::new(LlmClient::new(config.agents.clone()));
    let trust: Arc<dyn TrustLedger> = Arc::new(LocalTrust::new(&config.trust));
    let agent = Arc::new(CliAgent::new(config.coding_agent.clone()));

    let projects_root = config
        .system
        .projects_dir
        .as_deref()
        .map(paths::expand_home)
        .unwrap_or_else(|| data_dir.join("projects"));
    std::fs::create_dir_all(&projects_root)
        .with_context(|| format!("Failed to create projects directory {}", projects_root.display()))?;
    let tools = Arc::new(Mutex::new(
        ToolExecutor::new(vec![projects_root.clone()])
            .with_timeout(Duration::from_secs(config.system.command_timeout_secs)),
    ));

    // 4. Initialize Application Components
    let learning = Arc::new(CostTracker::new(paths::costs_path(&data_dir), &config.executor));
    let prd = PrdExecutor::new(
        config.executor.clone(),
        llm.clone(),
        agent.clone(),
        trust.clone(),
        learning,
    );

    let mut states = ExecutionStateManager::load(paths::execution_state_path(&data_dir));
    let removed = states.cleanup(chrono::Duration::days(config.system.state_ttl_days));
    if removed > 0 {
        tracing::info!("Removed {} expired execution states", removed);
    }

    let mut intents = IntentResolver::new(config.intent.clone()).with_trust(trust.clone());
    if config.agents.contains_key(&config.intent.classifier_agent)
        && config.agents.contains_key(&config.intent.parser_agent)
    {
        intents = intents.with_remote(
            Arc::new(LlmClassifier::new(llm.clone(), config.intent.classifier_agent.clone())),
            LlmParser::new(llm.clone(), config.intent.parser_agent.clone()),
        );
    } else {
        tracing::warn!("No classifier/parser agents configured; remote intent stages disabled");
    }

    let ctx = Arc::new(AppContext {
        config: config.clone(),
        plans: Mutex::new(PlanStateStore::new()),
        prd: prd.clone(),
        states: Mutex::new(states),
        agent,
        trust,
        tools: tools.clone(),
        projects: ProjectManager::new(projects_root, tools),
        session: Mutex::new(Session::default()),
    });
    let router = Arc::new(CommandRouter::new(ctx, intents));
    let chat = Arc::new(ConsoleChat::new());

    // 5. Checkpoint Forwarding
    // Observers run inside the executor, so they only enqueue.
    let (checkpoint_tx, mut checkpoint_rx) = tokio::sync::mpsc::unbounded_channel::<PrdCheckpoint>();
    prd.on_checkpoint(move |checkpoint| {
        let _ = checkpoint_tx.send(checkpoint.clone());
    });

    let forward_router = router.clone();
    let forward_chat = chat.clone();
    tokio::spawn(async move {
        while let Some(checkpoint) = checkpoint_rx.recv().await {
            forward_router.record_checkpoint(&checkpoint).await;
            if let Err(e) = forward_chat.send_notification(&checkpoint.message).await {
                tracing::error!("Failed to deliver checkpoint: {}", e);
            }
        }
    });

    // 6. Input Loop
    let _ = chat.send_notification(strings::messages::WELCOME).await;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line {
                    Ok(Some(text)) => {
                        if let Err(e) = router.route(chat.as_ref(), &text).await {
                            tracing::error!("Failed to route message: {:#}", e);
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::error!("Failed to read input: {}", e);
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
        }
    }

    router.shutdown().await;
    tracing::info!("Shutting down");
    Ok(())
}
