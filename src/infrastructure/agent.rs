//! # Coding Agent CLI
//!
//! Runs the configured coding-agent command (e.g. `claude -p <prompt>`) in the
//! project directory. Stdout becomes the answer; lines of the form
//! `MODIFIED: <path>` report changed files.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::domain::config::CodingAgentConfig;
use crate::domain::traits::{AgentOutcome, AgentRunner};

const MODIFIED_PREFIX: &str = "MODIFIED:";

pub struct CliAgent {
    config: CodingAgentConfig,
}

impl CliAgent {
    pub fn new(config: CodingAgentConfig) -> Self {
        Self { config }
    }
}

/// Collects the paths reported on `MODIFIED:` lines, without duplicates.
pub fn parse_modified_files(output: &str) -> Vec<String> {
    let mut files: Vec<String> = Vec::new();
    for line in output.lines() {
        if let Some(rest) = line.trim().strip_prefix(MODIFIED_PREFIX) {
            let path = rest.trim();
            if !path.is_empty() && !files.iter().any(|f| f == path) {
                files.push(path.to_string());
            }
        }
    }
    files
}

#[async_trait]
impl AgentRunner for CliAgent {
    async fn run(&self, prompt: &str, workdir: &Path) -> Result<AgentOutcome, String> {
        if !workdir.is_dir() {
            return Err(format!("Working directory {} does not exist", workdir.display()));
        }

        tracing::info!(
            "Running coding agent '{}' in {}",
            self.config.command,
            workdir.display()
        );

        let child = Command::new(&self.config.command)
            .args(&self.config.args)
            .arg(prompt)
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| format!("Failed to start {}: {}", self.config.command, e))?;

        let timeout = Duration::from_secs(self.config.timeout_secs);
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| format!("Coding agent failed: {}", e))?,
            Err(_) => {
                return Err(format!(
                    "Coding agent timed out after {}s",
                    self.config.timeout_secs
                ));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = if stderr.trim().is_empty() { stdout.trim() } else { stderr.trim() };
            return Err(format!(
                "Coding agent exited with {}: {}",
                output.status.code().unwrap_or(-1),
                detail
            ));
        }

        Ok(AgentOutcome {
            files_modified: parse_modified_files(&stdout),
            output: stdout.trim().to_string(),
            cost: self.config.cost_per_run,
        })
    }
}
