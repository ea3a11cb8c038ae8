//! # Configuration
//!
//! Manages the loading and parsing of the application's configuration file (`config.yaml`).
//! Defines the structs for system settings, model agents, the intent cascade,
//! the PRD executor and the coding agent.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Main application configuration structure.
/// Matches the layout of `data/config.yaml`.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub agents: AgentsConfig,
    #[serde(default)]
    pub intent: IntentConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub coding_agent: CodingAgentConfig,
    #[serde(default)]
    pub trust: TrustConfig,
    #[serde(default)]
    pub system: SystemConfig,
}

impl AppConfig {
    /// Reads and parses a YAML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse config YAML")
    }
}

/// System-level settings.
#[derive(Debug, Deserialize, Clone)]
pub struct SystemConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default)]
    pub projects_dir: Option<String>,
    /// Days a terminal execution state is kept before cleanup.
    #[serde(default = "default_state_ttl_days")]
    pub state_ttl_days: i64,
    /// Time limit for each confirmed shell command.
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            projects_dir: None,
            state_ttl_days: default_state_ttl_days(),
            command_timeout_secs: default_command_timeout_secs(),
        }
    }
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_state_ttl_days() -> i64 {
    7
}

fn default_command_timeout_secs() -> u64 {
    120
}

/// Thresholds and model selection for the intent cascade.
#[derive(Debug, Deserialize, Clone)]
pub struct IntentConfig {
    /// Agent used for cheap classification (Stage 5).
    #[serde(default = "default_classifier_agent")]
    pub classifier_agent: String,
    /// Agent used for the full parse fallback (Stage 6).
    #[serde(default = "default_parser_agent")]
    pub parser_agent: String,
    #[serde(default = "default_disambiguation_threshold")]
    pub disambiguation_threshold: f64,
    #[serde(default = "default_quick_threshold")]
    pub quick_threshold: f64,
    #[serde(default = "default_classifier_threshold")]
    pub classifier_threshold: f64,
}

impl Default for IntentConfig {
    fn default() -> Self {
        Self {
            classifier_agent: default_classifier_agent(),
            parser_agent: default_parser_agent(),
            disambiguation_threshold: default_disambiguation_threshold(),
            quick_threshold: default_quick_threshold(),
            classifier_threshold: default_classifier_threshold(),
        }
    }
}

fn default_classifier_agent() -> String {
    "classifier".to_string()
}
fn default_parser_agent() -> String {
    "parser".to_string()
}
fn default_disambiguation_threshold() -> f64 {
    0.85
}
fn default_quick_threshold() -> f64 {
    0.85
}
fn default_classifier_threshold() -> f64 {
    0.7
}

/// Settings for the autonomous PRD executor.
#[derive(Debug, Deserialize, Clone)]
pub struct ExecutorConfig {
    /// Agent used to turn a PRD into phases.
    #[serde(default = "default_planner_agent")]
    pub planner_agent: String,
    /// Pause between phases, in milliseconds.
    #[serde(default = "default_phase_delay_ms")]
    pub phase_delay_ms: u64,
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,
    /// Spend cap for a single plan. `None` disables the budget breaker.
    #[serde(default)]
    pub budget_limit: Option<f64>,
    /// Same error this many times within one plan trips the anti-pattern breaker.
    #[serde(default = "default_repeated_error_limit")]
    pub repeated_error_limit: u32,
    #[serde(default = "default_create_branch")]
    pub create_branch: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            planner_agent: default_planner_agent(),
            phase_delay_ms: default_phase_delay_ms(),
            max_consecutive_failures: default_max_consecutive_failures(),
            budget_limit: None,
            repeated_error_limit: default_repeated_error_limit(),
            create_branch: default_create_branch(),
        }
    }
}

fn default_planner_agent() -> String {
    "parser".to_string()
}
fn default_phase_delay_ms() -> u64 {
    2000
}
fn default_max_consecutive_failures() -> u32 {
    2
}
fn default_repeated_error_limit() -> u32 {
    3
}
fn default_create_branch() -> bool {
    true
}

/// The external coding agent CLI (e.g. `claude -p`).
#[derive(Debug, Deserialize, Clone)]
pub struct CodingAgentConfig {
    #[serde(default = "default_agent_command")]
    pub command: String,
    #[serde(default = "default_agent_args")]
    pub args: Vec<String>,
    #[serde(default = "default_agent_timeout")]
    pub timeout_secs: u64,
    /// Flat cost charged per session when the agent does not report one.
    #[serde(default)]
    pub cost_per_run: f64,
}

impl Default for CodingAgentConfig {
    fn default() -> Self {
        Self {
            command: default_agent_command(),
            args: default_agent_args(),
            timeout_secs: default_agent_timeout(),
            cost_per_run: 0.0,
        }
    }
}

fn default_agent_command() -> String {
    "claude".to_string()
}
fn default_agent_args() -> Vec<String> {
    vec!["-p".to_string()]
}
fn default_agent_timeout() -> u64 {
    1800
}

#[derive(Debug, Deserialize, Clone)]
pub struct TrustConfig {
    #[serde(default = "default_trust_level")]
    pub initial_level: i32,
    /// Successful tasks needed to gain one level.
    #[serde(default = "default_tasks_per_level")]
    pub tasks_per_level: u32,
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            initial_level: default_trust_level(),
            tasks_per_level: default_tasks_per_level(),
        }
    }
}

fn default_trust_level() -> i32 {
    1
}
fn default_tasks_per_level() -> u32 {
    10
}

pub type AgentsConfig = HashMap<String, AgentConfig>;

/// A model endpoint the LLM client can route to.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AgentConfig {
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_key_env: Option<String>, // e.g. "ANTHROPIC_API_KEY"
    #[serde(default)]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// USD per million input tokens, used for cost estimates.
    #[serde(default)]
    pub input_price: f64,
    /// USD per million output tokens.
    #[serde(default)]
    pub output_price: f64,
}
