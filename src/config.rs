//! Run configuration loaded from YAML.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::ConfigError;
use crate::evaluator::Tolerances;

/// Environment variable that replaces the agent command of a `command` backend.
pub const AGENT_CMD_ENV: &str = "DESIGNER_AGENT_CMD";
/// Environment variable that replaces the simulator command.
pub const SIMULATOR_CMD_ENV: &str = "DESIGNER_SIMULATOR_CMD";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignerConfig {
  pub agent: AgentConfig,
  pub simulator: SimulatorConfig,
  pub evaluation: Tolerances,
  #[serde(default)]
  pub report: ReportConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
  pub max_iterations: u32,
  #[serde(default)]
  pub save_agent_responses: bool,
  pub backend: AgentBackend,
}

/// Where designs come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AgentBackend {
  /// External agent process; the context is written to its stdin.
  Command(CommandAgentConfig),
  /// OpenAI-compatible chat-completions endpoint.
  Chat(ChatAgentConfig),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandAgentConfig {
  pub agent_cmd: String,
  /// Directory the agent may write `design.json` into instead of printing to stdout.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub stage_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatAgentConfig {
  pub endpoint: String,
  pub model: String,
  #[serde(default = "default_api_key_env")]
  pub api_key_env: String,
  #[serde(default = "default_temperature")]
  pub temperature: f32,
  #[serde(default = "default_max_tokens")]
  pub max_tokens: u32,
  #[serde(default)]
  pub system_message: String,
  #[serde(default = "default_request_timeout_secs")]
  pub request_timeout_secs: u64,
}

fn default_api_key_env() -> String {
  "OPENAI_API_KEY".to_string()
}

fn default_temperature() -> f32 {
  0.2
}

fn default_max_tokens() -> u32 {
  4000
}

fn default_request_timeout_secs() -> u64 {
  120
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatorConfig {
  /// Program to run; may include leading arguments separated by whitespace.
  pub command: String,
  /// Extra arguments; `{model}` and `{results}` are replaced with file paths.
  #[serde(default)]
  pub args: Vec<String>,
  pub property_package: String,
  #[serde(default = "default_calculation_mode")]
  pub calculation_mode: String,
  pub timeout_secs: u64,
  /// Parent of per-simulation work directories (system temp dir if unset).
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub work_dir: Option<PathBuf>,
}

fn default_calculation_mode() -> String {
  "Sequential".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
  #[serde(default = "default_true")]
  pub write_score_trace: bool,
}

impl Default for ReportConfig {
  fn default() -> Self {
    Self {
      write_score_trace: true,
    }
  }
}

fn default_true() -> bool {
  true
}

impl DesignerConfig {
  /// Loads and validates a YAML config file.
  #[instrument(level = "trace")]
  pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let config: Self = serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })?;
    config.validate()?;
    info!(path = %path.display(), "loaded configuration");
    Ok(config)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.agent.max_iterations == 0 {
      return Err(ConfigError::Invalid(
        "agent.max_iterations must be at least 1".to_string(),
      ));
    }
    match &self.agent.backend {
      AgentBackend::Command(c) if c.agent_cmd.trim().is_empty() => {
        return Err(ConfigError::Invalid(
          "agent.backend.agent_cmd is empty".to_string(),
        ));
      }
      AgentBackend::Chat(c) if c.endpoint.trim().is_empty() || c.model.trim().is_empty() => {
        return Err(ConfigError::Invalid(
          "agent.backend needs both endpoint and model".to_string(),
        ));
      }
      AgentBackend::Chat(c) if c.request_timeout_secs == 0 => {
        return Err(ConfigError::Invalid(
          "agent.backend.request_timeout_secs must be positive".to_string(),
        ));
      }
      _ => {}
    }
    if self.simulator.command.trim().is_empty() {
      return Err(ConfigError::Invalid("simulator.command is empty".to_string()));
    }
    if self.simulator.timeout_secs == 0 {
      return Err(ConfigError::Invalid(
        "simulator.timeout_secs must be positive".to_string(),
      ));
    }
    let t = &self.evaluation;
    let tolerances = [
      ("mass_balance_tolerance", t.mass_balance_tolerance),
      ("energy_balance_tolerance", t.energy_balance_tolerance),
      ("purity_tolerance", t.purity_tolerance),
      ("yield_tolerance", t.yield_tolerance),
      ("production_rate_tolerance", t.production_rate_tolerance),
    ];
    for (name, value) in tolerances {
      if !value.is_finite() || value < 0.0 {
        return Err(ConfigError::Invalid(format!(
          "evaluation.{} must be a non-negative number",
          name
        )));
      }
    }
    if let Some(c) = t.conditions_tolerance {
      if !c.is_finite() || c < 0.0 {
        return Err(ConfigError::Invalid(
          "evaluation.conditions_tolerance must be a non-negative number".to_string(),
        ));
      }
    }
    Ok(())
  }

  /// Applies CLI overrides; `None` leaves the file value.
  pub fn apply_overrides(&mut self, property_package: Option<&str>, max_iterations: Option<u32>) {
    if let Some(pp) = property_package {
      info!(property_package = pp, "property package from command line");
      self.simulator.property_package = pp.to_string();
    }
    if let Some(n) = max_iterations {
      info!(max_iterations = n, "max iterations from command line");
      self.agent.max_iterations = n;
    }
  }

  /// Replaces commands from [AGENT_CMD_ENV] / [SIMULATOR_CMD_ENV] when set and non-empty.
  pub fn apply_env_overrides(&mut self) {
    self.apply_command_overrides(
      std::env::var(AGENT_CMD_ENV).ok().as_deref(),
      std::env::var(SIMULATOR_CMD_ENV).ok().as_deref(),
    );
  }

  pub(crate) fn apply_command_overrides(&mut self, agent_cmd: Option<&str>, simulator_cmd: Option<&str>) {
    if let (Some(cmd), AgentBackend::Command(c)) = (
      agent_cmd.filter(|s| !s.trim().is_empty()),
      &mut self.agent.backend,
    ) {
      c.agent_cmd = cmd.to_string();
    }
    if let Some(cmd) = simulator_cmd.filter(|s| !s.trim().is_empty()) {
      self.simulator.command = cmd.to_string();
    }
  }

  /// Config as persisted with a run: everything except the system message.
  pub fn persisted(&self) -> serde_json::Value {
    let mut value = serde_json::to_value(self).unwrap_or(serde_json::Value::Null);
    if let Some(backend) = value
      .get_mut("agent")
      .and_then(|a| a.get_mut("backend"))
      .and_then(|b| b.as_object_mut())
    {
      backend.remove("system_message");
    }
    value
  }
}
