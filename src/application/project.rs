//! # Project Manager
//!
//! Resolves where work happens: the projects root, named projects under it,
//! and scaffolding for `create_project`.

use anyhow::{Result, bail};
use std::path::{Path, PathBuf};

use crate::application::utils::slugify;
use crate::infrastructure::tools::executor::SharedToolExecutor;

#[derive(Debug)]
pub struct ProjectManager {
    root: PathBuf,
    tools: SharedToolExecutor,
}

impl ProjectManager {
    pub fn new(root: PathBuf, tools: SharedToolExecutor) -> Self {
        Self { root, tools }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a target to a directory: absolute paths as-is, names under the root.
    pub fn resolve(&self, target: &str) -> PathBuf {
        let target = target.trim();
        let path = Path::new(target);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(slugify(target, 40))
        }
    }

    /// Creates a project directory with a README. Existing projects are left alone.
    pub async fn create_project(&self, name: &str) -> Result<PathBuf> {
        let slug = slugify(name, 40);
        if slug.is_empty() {
            bail!("'{}' is not a usable project name", name);
        }
        let path = self.root.join(&slug);
        if path.exists() {
            bail!("Project '{}' already exists at {}", slug, path.display());
        }

        let tools = self.tools.lock().await;
        tools
            .write_file(&path.join("README.md"), &format!("# {}\n", name.trim()))
            .await?;
        tracing::info!("Created project {} at {:?}", slug, path);
        Ok(path)
    }
}
