//! # Data Paths
//!
//! Centralized definitions for files kept under the data directory.
//! Acts as the Single Source of Truth for where persisted state lives.

use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "config.yaml";
pub const EXECUTION_STATE_FILE: &str = "execution_state.json";
pub const COSTS_FILE: &str = "costs.json";
pub const SESSION_LOG_FILE: &str = "session.log";

/// Returns the full path to the execution state document
pub fn execution_state_path(data_dir: &Path) -> PathBuf {
    data_dir.join(EXECUTION_STATE_FILE)
}

/// Returns the full path to the persisted cost ledger
pub fn costs_path(data_dir: &Path) -> PathBuf {
    data_dir.join(COSTS_FILE)
}

/// Expands a leading `~/` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}
