//! # Tool Executor
//!
//! Runs confirmed shell commands and project file writes.
//! Enforces sandboxing by validating paths against the allowed root directories.

use anyhow::{Context as AnyhowContext, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 120;

/// What a finished command printed, and whether it exited cleanly.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutput {
    pub success: bool,
    pub output: String,
}

#[derive(Debug)]
pub struct ToolExecutor {
    allowed_directories: Vec<PathBuf>,
    timeout: Duration,
}

impl ToolExecutor {
    pub fn new(allowed_directories: Vec<PathBuf>) -> Self {
        let allowed_directories = allowed_directories
            .into_iter()
            .map(|root| root.canonicalize().unwrap_or(root))
            .collect();
        Self {
            allowed_directories,
            timeout: Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the canonical path if it lies inside an allowed root.
    /// Paths that do not exist yet are resolved through their nearest existing ancestor.
    pub fn validate_path(&self, path: &Path) -> Result<PathBuf> {
        let mut existing = path.to_path_buf();
        let mut missing = Vec::new();
        while !existing.exists() {
            let Some(name) = existing.file_name() else {
                anyhow::bail!("Unable to validate path {:?}", path);
            };
            missing.push(name.to_owned());
            existing = match existing.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            };
        }

        let mut abs_path = existing.canonicalize()?;
        for part in missing.iter().rev() {
            abs_path.push(part);
        }

        if self
            .allowed_directories
            .iter()
            .any(|root| abs_path.starts_with(root))
        {
            Ok(abs_path)
        } else {
            Err(anyhow::anyhow!(
                "Access denied: {:?} is not in allowed directories {:?}",
                abs_path,
                self.allowed_directories
            ))
        }
    }

    /// Runs `command` through the shell in `cwd`. A non-zero exit is reported, not an error.
    pub async fn execute_command(&self, command: &str, cwd: &Path) -> Result<CommandOutput> {
        let safe_cwd = self
            .validate_path(cwd)
            .context("Invalid CWD for command execution")?;

        let mut cmd = tokio::process::Command::new("sh");
        cmd.args(["-c", command]);
        cmd.current_dir(safe_cwd);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        tracing::info!("Executing `{}` in {:?}", command, cwd);
        let child = cmd.spawn().context("Failed to spawn command shell")?;
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .context("Command timed out")??;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        let mut result = stdout.trim_end().to_string();
        if !stderr.trim().is_empty() {
            if !result.is_empty() {
                result.push_str("\n--- STDERR ---\n");
            }
            result.push_str(stderr.trim_end());
        }
        if !output.status.success() {
            if !result.is_empty() {
                result.push('\n');
            }
            result.push_str(&format!("[Exit Code: {}]", output.status));
        }

        Ok(CommandOutput {
            success: output.status.success(),
            output: result,
        })
    }

    pub async fn write_file(&self, path: &Path, content: &str) -> Result<()> {
        let safe_path = self.validate_path(path)?;
        if let Some(parent) = safe_path.parent()
            && !parent.exists()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&safe_path, content)
            .await
            .with_context(|| format!("Failed to write {:?}", safe_path))
    }
}

pub type SharedToolExecutor = Arc<Mutex<ToolExecutor>>;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_command_output_and_exit_status() {
        let dir = TempDir::new().unwrap();
        let tools = ToolExecutor::new(vec![dir.path().to_path_buf()]);

        let ok = tools.execute_command("echo hello", dir.path()).await.unwrap();
        assert!(ok.success);
        assert_eq!(ok.output, "hello");

        let failed = tools.execute_command("echo oops >&2; exit 3", dir.path()).await.unwrap();
        assert!(!failed.success);
        assert!(failed.output.contains("oops"));
        assert!(failed.output.contains("[Exit Code:"));
    }

    #[tokio::test]
    async fn test_paths_outside_roots_are_denied() {
        let allowed = TempDir::new().unwrap();
        let other = TempDir::new().unwrap();
        let tools = ToolExecutor::new(vec![allowed.path().to_path_buf()]);

        assert!(tools.validate_path(&allowed.path().join("new/dir/file.txt")).is_ok());
        assert!(tools.execute_command("ls", other.path()).await.is_err());
    }

    #[tokio::test]
    async fn test_write_file_creates_parents() {
        let dir = TempDir::new().unwrap();
        let tools = ToolExecutor::new(vec![dir.path().to_path_buf()]);
        let path = dir.path().join("proj/README.md");
        tools.write_file(&path, "# proj\n").await.unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "# proj\n");
    }
}
