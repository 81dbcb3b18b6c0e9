//! DTOs for iteration_history.json: one entry per recorded iteration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::{ConstraintResult, Feedback, FeedbackStatus};

/// One recorded iteration, failed ones included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
  /// 1-based iteration number.
  pub iteration: u32,
  /// RFC 3339 timestamp when the iteration was recorded.
  pub timestamp: String,
  pub process_design_path: PathBuf,
  pub feedback: Feedback,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub simulation_results_path: Option<PathBuf>,
  /// Score of the iteration; None when it never reached scoring.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub score: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub constraint_check: Option<ConstraintResult>,
}

impl IterationRecord {
  pub fn status(&self) -> FeedbackStatus {
    self.feedback.status
  }
}

/// Append-only ordered log of iteration records.
pub type History = Vec<IterationRecord>;
