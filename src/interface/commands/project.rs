//! # Project Command
//!
//! Handles `create project <name>`.
//! Scaffolds the project under the projects root and makes it the session's project.

use super::{notify, reply};
use crate::application::router::AppContext;
use crate::domain::traits::ChatProvider;
use crate::domain::types::ParsedIntent;
use crate::strings::messages;
use anyhow::Result;

pub async fn handle_create(ctx: &AppContext, chat: &impl ChatProvider, intent: &ParsedIntent) -> Result<()> {
    let Some(name) = intent.target.as_deref() else {
        return notify(chat, messages::PROJECT_NAME_REQUIRED).await;
    };

    match ctx.projects.create_project(name).await {
        Ok(path) => {
            let display = path.display().to_string();
            ctx.session.lock().await.project_path = Some(path);
            reply(chat, &messages::project_created(&display)).await
        }
        Err(e) => notify(chat, &messages::project_creation_failed(&e.to_string())).await,
    }
}
