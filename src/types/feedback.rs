//! Structured guidance derived from one iteration's outcome.

use serde::{Deserialize, Serialize};

use super::FeedbackStatus;

/// Structured guidance derived from one iteration's outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
  pub status: FeedbackStatus,
  pub message: String,
  #[serde(default)]
  pub constraint_issues: Vec<String>,
  #[serde(default)]
  pub product_issues: Vec<String>,
  #[serde(default)]
  pub suggestions: Vec<String>,
}

impl Feedback {
  pub fn new(status: FeedbackStatus, message: impl Into<String>) -> Self {
    Self {
      status,
      message: message.into(),
      constraint_issues: vec![],
      product_issues: vec![],
      suggestions: vec![],
    }
  }

  /// Feedback for an iteration that failed before evaluation was possible.
  pub fn error(message: impl Into<String>, suggestions: Vec<String>) -> Self {
    Self {
      suggestions,
      ..Self::new(FeedbackStatus::Error, message)
    }
  }

  pub fn has_issues(&self) -> bool {
    !self.constraint_issues.is_empty() || !self.product_issues.is_empty()
  }
}
