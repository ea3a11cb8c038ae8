//! # Console Chat Adapter
//!
//! Implements the `ChatProvider` trait over stdout so the bot can be driven
//! from a terminal.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::io::AsyncWriteExt;

use crate::domain::traits::ChatProvider;

#[derive(Default)]
pub struct ConsoleChat {
    sent: AtomicUsize,
}

impl ConsoleChat {
    pub fn new() -> Self {
        Self::default()
    }

    async fn write(&self, text: &str) -> Result<(), String> {
        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(format!("{}\n", text).as_bytes())
            .await
            .map_err(|e| e.to_string())?;
        stdout.flush().await.map_err(|e| e.to_string())
    }
}

#[async_trait]
impl ChatProvider for ConsoleChat {
    async fn send_message(&self, content: &str) -> Result<String, String> {
        tracing::debug!("Bot sending message: {}", content);
        self.write(content).await?;
        let id = self.sent.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("console-{}", id))
    }

    async fn send_notification(&self, content: &str) -> Result<(), String> {
        self.write(content).await
    }

    async fn typing(&self, _active: bool) -> Result<(), String> {
        Ok(())
    }

    fn room_id(&self) -> String {
        "console".to_string()
    }
}
