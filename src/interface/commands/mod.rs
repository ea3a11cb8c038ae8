//! # Command Handlers
//!
//! One handler function per resolved action (status, agent, plans, PRD builds, sessions).
//! These handlers are invoked by the Router.

pub mod agent;
pub mod help;
pub mod misc;
pub mod plan;
pub mod prd;
pub mod project;
pub mod session;

use crate::domain::traits::ChatProvider;
use anyhow::Result;

pub(crate) async fn reply(chat: &impl ChatProvider, content: &str) -> Result<()> {
    chat.send_message(content)
        .await
        .map(|_| ())
        .map_err(|e| anyhow::anyhow!(e))
}

pub(crate) async fn notify(chat: &impl ChatProvider, content: &str) -> Result<()> {
    chat.send_notification(content)
        .await
        .map_err(|e| anyhow::anyhow!(e))
}
