//! Run recorder: per-iteration artifacts, history, final report and score trace under
//! one run directory.
//!
//! Layout:
//! ```text
//! <output>/run_YYYYmmdd_HHMMSS/
//!   raw_materials.json  product_specs.json  config.json
//!   iteration_<n>/process_design.json  raw_response.txt  model.dwxml
//!                 simulation_results.json  evaluation.json  feedback.json
//!   iteration_history.json  final_report.json  score_trace.csv
//! ```

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::converter::ModelArtifact;
use crate::error::PersistenceError;
use crate::types::{
  Design, Evaluation, Feedback, FinalReport, History, IterationRecord, ProductSpecs,
  RawMaterials, SimulationResult,
};

pub const RAW_MATERIALS_FILENAME: &str = "raw_materials.json";
pub const PRODUCT_SPECS_FILENAME: &str = "product_specs.json";
pub const CONFIG_FILENAME: &str = "config.json";
pub const DESIGN_FILENAME: &str = "process_design.json";
pub const RAW_RESPONSE_FILENAME: &str = "raw_response.txt";
pub const SIMULATION_RESULTS_FILENAME: &str = "simulation_results.json";
pub const EVALUATION_FILENAME: &str = "evaluation.json";
pub const FEEDBACK_FILENAME: &str = "feedback.json";
pub const HISTORY_FILENAME: &str = "iteration_history.json";
pub const FINAL_REPORT_FILENAME: &str = "final_report.json";
pub const SCORE_TRACE_FILENAME: &str = "score_trace.csv";

/// Writes `value` to `path` as pretty JSON, creating the parent directory.
#[instrument(level = "trace", skip(value))]
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), PersistenceError> {
  let json = serde_json::to_string_pretty(value).map_err(|e| PersistenceError::json(path, e))?;
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).map_err(|e| PersistenceError::io(parent, e))?;
  }
  std::fs::write(path, json).map_err(|e| PersistenceError::io(path, e))
}

/// Loads a persisted iteration history.
#[instrument(level = "trace")]
pub fn load_history(path: &Path) -> Result<History, PersistenceError> {
  let bytes = std::fs::read(path).map_err(|e| PersistenceError::io(path, e))?;
  serde_json::from_slice(&bytes).map_err(|e| PersistenceError::json(path, e))
}

/// One row of score_trace.csv.
#[derive(Debug, Serialize)]
struct ScoreTraceRow {
  iteration: u32,
  status: String,
  score: Option<f64>,
  mass_balance_error_pct: Option<f64>,
  energy_balance_error_pct: Option<f64>,
}

/// Side-effecting sink for one run's artifacts.
#[derive(Debug, Clone)]
pub struct RunRecorder {
  run_dir: PathBuf,
}

impl RunRecorder {
  /// Creates a fresh `run_<timestamp>` directory under `output_dir`. A numeric suffix is
  /// added when a run directory for the same second already exists.
  pub fn create(output_dir: &Path) -> Result<Self, PersistenceError> {
    std::fs::create_dir_all(output_dir).map_err(|e| PersistenceError::io(output_dir, e))?;
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
    let mut candidate = output_dir.join(format!("run_{}", stamp));
    let mut n = 1;
    loop {
      match std::fs::create_dir(&candidate) {
        Ok(()) => break,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
          n += 1;
          candidate = output_dir.join(format!("run_{}_{}", stamp, n));
        }
        Err(e) => return Err(PersistenceError::io(&candidate, e)),
      }
    }
    info!(run_dir = %candidate.display(), "created run directory");
    Ok(Self { run_dir: candidate })
  }

  /// Recorder over an existing run directory.
  pub fn open(run_dir: impl Into<PathBuf>) -> Self {
    Self {
      run_dir: run_dir.into(),
    }
  }

  pub fn run_dir(&self) -> &Path {
    &self.run_dir
  }

  pub fn iteration_dir(&self, iteration: u32) -> PathBuf {
    self.run_dir.join(format!("iteration_{}", iteration))
  }

  pub fn history_path(&self) -> PathBuf {
    self.run_dir.join(HISTORY_FILENAME)
  }

  /// Saves the run inputs and the persisted view of the configuration.
  pub fn save_inputs(
    &self,
    raw_materials: &RawMaterials,
    product_specs: &ProductSpecs,
    config: &serde_json::Value,
  ) -> Result<(), PersistenceError> {
    write_json(&self.run_dir.join(RAW_MATERIALS_FILENAME), raw_materials)?;
    write_json(&self.run_dir.join(PRODUCT_SPECS_FILENAME), product_specs)?;
    write_json(&self.run_dir.join(CONFIG_FILENAME), config)
  }

  pub fn save_design(&self, iteration: u32, design: &Design) -> Result<PathBuf, PersistenceError> {
    let path = self.iteration_dir(iteration).join(DESIGN_FILENAME);
    write_json(&path, design)?;
    Ok(path)
  }

  pub fn save_raw_response(&self, iteration: u32, raw: &str) -> Result<(), PersistenceError> {
    let dir = self.iteration_dir(iteration);
    std::fs::create_dir_all(&dir).map_err(|e| PersistenceError::io(&dir, e))?;
    let path = dir.join(RAW_RESPONSE_FILENAME);
    std::fs::write(&path, raw).map_err(|e| PersistenceError::io(&path, e))
  }

  pub fn save_model(
    &self,
    iteration: u32,
    model: &ModelArtifact,
  ) -> Result<PathBuf, PersistenceError> {
    let dir = self.iteration_dir(iteration);
    std::fs::create_dir_all(&dir).map_err(|e| PersistenceError::io(&dir, e))?;
    let path = dir.join(&model.file_name);
    std::fs::write(&path, &model.content).map_err(|e| PersistenceError::io(&path, e))?;
    debug!(path = %path.display(), "saved model");
    Ok(path)
  }

  pub fn save_simulation_result(
    &self,
    iteration: u32,
    result: &SimulationResult,
  ) -> Result<PathBuf, PersistenceError> {
    let path = self.iteration_dir(iteration).join(SIMULATION_RESULTS_FILENAME);
    write_json(&path, result)?;
    Ok(path)
  }

  pub fn save_evaluation(
    &self,
    iteration: u32,
    evaluation: &Evaluation,
  ) -> Result<(), PersistenceError> {
    write_json(&self.iteration_dir(iteration).join(EVALUATION_FILENAME), evaluation)
  }

  /// Writes the iteration's feedback and rewrites the whole history document.
  pub fn record_iteration(
    &self,
    record: &IterationRecord,
    history: &History,
  ) -> Result<(), PersistenceError> {
    write_json(
      &self.iteration_dir(record.iteration).join(FEEDBACK_FILENAME),
      &record.feedback,
    )?;
    write_json(&self.history_path(), history)
  }

  /// Feedback persisted for `iteration`; None when absent or unreadable.
  pub fn load_feedback(&self, iteration: u32) -> Option<Feedback> {
    let path = self.iteration_dir(iteration).join(FEEDBACK_FILENAME);
    let bytes = match std::fs::read(&path) {
      Ok(b) => b,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
      Err(e) => {
        warn!(path = %path.display(), error = %e, "feedback unreadable");
        return None;
      }
    };
    match serde_json::from_slice(&bytes) {
      Ok(f) => Some(f),
      Err(e) => {
        warn!(path = %path.display(), error = %e, "feedback is not valid JSON");
        None
      }
    }
  }

  pub fn write_final_report(&self, report: &FinalReport) -> Result<PathBuf, PersistenceError> {
    let path = self.run_dir.join(FINAL_REPORT_FILENAME);
    write_json(&path, report)?;
    Ok(path)
  }

  /// One CSV row per recorded iteration.
  pub fn write_score_trace(&self, history: &History) -> Result<PathBuf, PersistenceError> {
    let path = self.run_dir.join(SCORE_TRACE_FILENAME);
    let csv_err = |source| PersistenceError::Csv {
      path: path.clone(),
      source,
    };
    let mut wtr = csv::Writer::from_path(&path).map_err(csv_err)?;
    for r in history {
      wtr
        .serialize(ScoreTraceRow {
          iteration: r.iteration,
          status: r.status().to_string(),
          score: r.score,
          mass_balance_error_pct: r.constraint_check.map(|c| c.mass_balance_error_pct),
          energy_balance_error_pct: r.constraint_check.map(|c| c.energy_balance_error_pct),
        })
        .map_err(csv_err)?;
    }
    wtr.flush().map_err(|e| PersistenceError::io(&path, e))?;
    Ok(path)
  }
}
