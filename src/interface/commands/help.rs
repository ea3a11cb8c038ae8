//! # Help Command
//!
//! Displays the main help menu to the user.

use super::reply;
use crate::domain::traits::ChatProvider;
use anyhow::Result;

pub async fn handle_help(chat: &impl ChatProvider) -> Result<()> {
    reply(chat, crate::strings::help::MAIN).await
}
