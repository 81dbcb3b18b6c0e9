//! Outcome status of one design iteration.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome status of one design iteration, in classification priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackStatus {
  Success,
  ConstraintViolation,
  ProductSpecsNotMet,
  Error,
}

impl FeedbackStatus {
  pub fn is_success(&self) -> bool {
    matches!(self, FeedbackStatus::Success)
  }
}

impl fmt::Display for FeedbackStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      FeedbackStatus::Success => write!(f, "success"),
      FeedbackStatus::ConstraintViolation => write!(f, "constraint_violation"),
      FeedbackStatus::ProductSpecsNotMet => write!(f, "product_specs_not_met"),
      FeedbackStatus::Error => write!(f, "error"),
    }
  }
}
