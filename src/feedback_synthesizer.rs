//! Turns an evaluation, or a failure caught before evaluation, into [Feedback].

use std::fmt;

use tracing::instrument;

use crate::types::{Evaluation, Feedback, FeedbackStatus, IssueKind};

pub const SUCCESS_MESSAGE: &str = "Process design meets all requirements and constraints!";
pub const CONSTRAINT_VIOLATION_MESSAGE: &str = "Process design violates fundamental constraints";
pub const SPECS_NOT_MET_MESSAGE: &str = "Process design does not meet all product specifications";

/// Stage that failed before an evaluation existed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
  Conversion,
  Simulation,
}

impl fmt::Display for FailureKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      FailureKind::Conversion => write!(f, "conversion"),
      FailureKind::Simulation => write!(f, "simulation"),
    }
  }
}

/// Feedback for an evaluated iteration. Constraint entries come before product entries.
#[instrument(level = "trace", skip(evaluation))]
pub fn synthesize(evaluation: &Evaluation) -> Feedback {
  let constraints = &evaluation.constraint_check;
  let products = &evaluation.product_evaluation;

  let status = if constraints.all_satisfied() && products.all_specifications_met {
    FeedbackStatus::Success
  } else if !constraints.all_satisfied() {
    FeedbackStatus::ConstraintViolation
  } else {
    FeedbackStatus::ProductSpecsNotMet
  };
  let message = match status {
    FeedbackStatus::Success => SUCCESS_MESSAGE,
    FeedbackStatus::ConstraintViolation => CONSTRAINT_VIOLATION_MESSAGE,
    _ => SPECS_NOT_MET_MESSAGE,
  };
  let mut feedback = Feedback::new(status, message);

  if !constraints.mass_balance_satisfied {
    feedback.constraint_issues.push(format!(
      "Mass balance error: {:.2}%",
      constraints.mass_balance_error_pct
    ));
    feedback
      .suggestions
      .push("Adjust flow rates or component splits to ensure mass conservation".to_string());
  }
  if !constraints.energy_balance_satisfied {
    feedback.constraint_issues.push(format!(
      "Energy balance error: {:.2}%",
      constraints.energy_balance_error_pct
    ));
    feedback
      .suggestions
      .push("Review heat duties and enthalpy calculations for energy conservation".to_string());
  }

  for product in &products.products {
    for issue in &product.issues {
      feedback
        .product_issues
        .push(format!("{}: {} - {}", product.name, issue.kind, issue.detail));
      feedback
        .suggestions
        .push(suggestion_for(issue.kind, &product.name));
    }
  }

  feedback
}

/// Feedback for an iteration whose conversion or simulation failed.
pub fn failure(kind: FailureKind, error: &dyn fmt::Display) -> Feedback {
  let (message, suggestions) = match kind {
    FailureKind::Conversion => (
      format!("Failed to convert design to simulator model: {}", error),
      [
        "Ensure all units and connections are properly specified",
        "Check for invalid operation parameters",
      ],
    ),
    FailureKind::Simulation => (
      format!("Simulation failed: {}", error),
      [
        "Check for invalid input parameters",
        "Ensure thermodynamic property package is appropriate for components",
      ],
    ),
  };
  Feedback::error(message, suggestions.iter().map(|s| s.to_string()).collect())
}

fn suggestion_for(kind: IssueKind, product: &str) -> String {
  match kind {
    IssueKind::Purity => format!("Improve separation for {} to increase purity", product),
    IssueKind::Yield => format!(
      "Adjust reaction conditions or improve recovery for {}",
      product
    ),
    IssueKind::ProductionRate => format!(
      "Increase feed rate or improve conversion for {}",
      product
    ),
    IssueKind::Temperature => format!("Adjust cooling/heating for {} stream", product),
    IssueKind::Pressure => format!("Adjust pressure control for {} stream", product),
    IssueKind::NotFound => format!(
      "Add an outlet stream to the flowsheet boundary that carries {}",
      product
    ),
  }
}
