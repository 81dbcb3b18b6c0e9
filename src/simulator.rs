//! Process simulator bridge.
//!
//! [ProcessSimulator] runs an external simulator command on a model file and reads the
//! results document it writes. Each run gets its own work directory.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::SimulatorConfig;
use crate::converter::ModelArtifact;
use crate::error::SimulationError;
use crate::types::SimulationResult;

pub const RESULTS_FILE_NAME: &str = "simulation_results.json";
const MODEL_PLACEHOLDER: &str = "{model}";
const RESULTS_PLACEHOLDER: &str = "{results}";

/// Runs a model and returns its results, or fails within `timeout`.
#[async_trait]
pub trait Simulator: Send + Sync {
  async fn run(
    &self,
    model: &ModelArtifact,
    timeout: Duration,
  ) -> Result<SimulationResult, SimulationError>;
}

#[derive(Debug, Clone)]
pub struct ProcessSimulator {
  program: String,
  args: Vec<String>,
  work_root: PathBuf,
}

impl ProcessSimulator {
  /// `command` may carry leading arguments; `args` follow them. Without any `args`
  /// the model and results paths are passed as the last two arguments.
  pub fn new(config: &SimulatorConfig) -> Result<Self, SimulationError> {
    let mut parts = config.command.split_whitespace().map(str::to_string);
    let program = parts.next().ok_or(SimulationError::EmptyCommand)?;
    let mut args: Vec<String> = parts.collect();
    if config.args.is_empty() {
      args.push(MODEL_PLACEHOLDER.to_string());
      args.push(RESULTS_PLACEHOLDER.to_string());
    } else {
      args.extend(config.args.iter().cloned());
    }
    let work_root = config
      .work_dir
      .clone()
      .unwrap_or_else(|| std::env::temp_dir().join("flowsheet-designer"));
    Ok(Self {
      program,
      args,
      work_root,
    })
  }

  fn expand_args(&self, model: &Path, results: &Path) -> Vec<String> {
    let model = model.to_string_lossy();
    let results = results.to_string_lossy();
    self
      .args
      .iter()
      .map(|a| {
        a.replace(MODEL_PLACEHOLDER, &model)
          .replace(RESULTS_PLACEHOLDER, &results)
      })
      .collect()
  }
}

/// Reads and checks the results document.
pub(crate) fn read_results(path: &Path) -> Result<SimulationResult, SimulationError> {
  if !path.exists() {
    return Err(SimulationError::MissingResults(path.to_path_buf()));
  }
  let text = std::fs::read_to_string(path)?;
  let value: serde_json::Value =
    serde_json::from_str(&text).map_err(|e| SimulationError::Malformed(e.to_string()))?;
  if value.get("status").and_then(|s| s.as_str()) == Some("error") {
    let message = value
      .get("message")
      .and_then(|m| m.as_str())
      .unwrap_or("no message")
      .to_string();
    return Err(SimulationError::Reported(message));
  }
  serde_json::from_value(value).map_err(|e| SimulationError::Malformed(e.to_string()))
}

fn log_file(path: &Path) -> Result<Stdio, SimulationError> {
  Ok(Stdio::from(std::fs::File::create(path)?))
}

/// Sends SIGKILL to the process group led by `pid`.
#[cfg(unix)]
async fn kill_process_group(pid: u32) {
  let status = Command::new("kill")
    .args(["-KILL", "--", &format!("-{}", pid)])
    .stdin(Stdio::null())
    .stdout(Stdio::null())
    .stderr(Stdio::null())
    .status()
    .await;
  match status {
    Ok(s) if s.success() => debug!(pid, "simulator process group killed"),
    Ok(s) => debug!(pid, ?s, "kill of simulator process group failed"),
    Err(e) => warn!(pid, error = %e, "could not run kill for simulator process group"),
  }
}

#[cfg(not(unix))]
async fn kill_process_group(_pid: u32) {}

#[async_trait]
impl Simulator for ProcessSimulator {
  #[instrument(level = "trace", skip(self, model))]
  async fn run(
    &self,
    model: &ModelArtifact,
    timeout: Duration,
  ) -> Result<SimulationResult, SimulationError> {
    let work = self.work_root.join(Uuid::new_v4().to_string());
    tokio::fs::create_dir_all(&work).await?;
    let model_path = work.join(&model.file_name);
    let results_path = work.join(RESULTS_FILE_NAME);
    tokio::fs::write(&model_path, &model.content).await?;

    let args = self.expand_args(&model_path, &results_path);
    debug!(program = %self.program, ?args, "starting simulator");
    let started = Instant::now();
    let mut command = Command::new(&self.program);
    command
      .args(&args)
      .current_dir(&work)
      .stdin(Stdio::null())
      .stdout(log_file(&work.join("simulator.stdout.log"))?)
      .stderr(log_file(&work.join("simulator.stderr.log"))?)
      .kill_on_drop(true);
    // Own process group, so a timeout also reaches whatever a wrapper script started.
    #[cfg(unix)]
    command.process_group(0);
    let mut child = command
      .spawn()
      .map_err(|e| SimulationError::Spawn(format!("{}: {}", self.program, e)))?;

    match tokio::time::timeout(timeout, child.wait()).await {
      Ok(Ok(status)) if status.success() => {}
      Ok(Ok(status)) => {
        let msg = status
          .code()
          .map(|c| format!("exit code {}", c))
          .unwrap_or_else(|| "signal".to_string());
        warn!(work_dir = %work.display(), "simulator failed, logs kept");
        return Err(SimulationError::Exit(msg));
      }
      Ok(Err(e)) => return Err(SimulationError::Io(e)),
      Err(_) => {
        if let Some(pid) = child.id() {
          kill_process_group(pid).await;
        }
        if let Err(e) = child.kill().await {
          warn!(error = %e, "could not kill timed-out simulator");
        }
        warn!(?timeout, work_dir = %work.display(), "simulation timed out");
        return Err(SimulationError::Timeout(timeout));
      }
    }

    let result = read_results(&results_path)?;
    info!(
      elapsed_secs = started.elapsed().as_secs_f64(),
      streams = result.streams.len(),
      "simulation completed"
    );
    if let Err(e) = tokio::fs::remove_dir_all(&work).await {
      debug!(error = %e, "work dir not removed");
    }
    Ok(result)
  }
}
