//! Evaluation of one simulation result against balances and product specs.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Error sentinel (percent) used when a balance cannot be computed.
pub const BALANCE_ERROR_SENTINEL: f64 = 100.0;

/// Mass/energy balance verdict.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConstraintResult {
  pub mass_balance_satisfied: bool,
  pub mass_balance_error_pct: f64,
  pub energy_balance_satisfied: bool,
  pub energy_balance_error_pct: f64,
}

impl ConstraintResult {
  /// Verdict for an absent or malformed simulation result.
  pub fn unavailable() -> Self {
    Self {
      mass_balance_satisfied: false,
      mass_balance_error_pct: BALANCE_ERROR_SENTINEL,
      energy_balance_satisfied: false,
      energy_balance_error_pct: BALANCE_ERROR_SENTINEL,
    }
  }

  pub fn all_satisfied(&self) -> bool {
    self.mass_balance_satisfied && self.energy_balance_satisfied
  }
}

/// Which product criterion an issue is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
  Purity,
  Yield,
  ProductionRate,
  Temperature,
  Pressure,
  NotFound,
}

impl fmt::Display for IssueKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      IssueKind::Purity => write!(f, "purity"),
      IssueKind::Yield => write!(f, "yield"),
      IssueKind::ProductionRate => write!(f, "production_rate"),
      IssueKind::Temperature => write!(f, "temperature"),
      IssueKind::Pressure => write!(f, "pressure"),
      IssueKind::NotFound => write!(f, "not_found"),
    }
  }
}

/// One unmet product criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductIssue {
  pub kind: IssueKind,
  pub detail: String,
}

/// Target vs actual values for one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductResult {
  pub name: String,
  /// Outlet stream the product was matched to, if any.
  pub stream: Option<String>,
  pub target_purity: f64,
  pub actual_purity: Option<f64>,
  pub target_yield: f64,
  pub actual_yield: Option<f64>,
  pub target_production_rate: f64,
  pub actual_production_rate: Option<f64>,
  pub production_rate_unit: String,
  pub specifications_met: bool,
  /// Normalized closeness to all three targets, in [0, 1].
  pub score: f64,
  pub issues: Vec<ProductIssue>,
}

/// Per-product spec compliance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductEvaluation {
  pub all_specifications_met: bool,
  /// Ordered as in the product specs.
  pub products: Vec<ProductResult>,
}

impl ProductEvaluation {
  pub fn product(&self, name: &str) -> Option<&ProductResult> {
    self.products.iter().find(|p| p.name == name)
  }
}

/// Constraint check plus product evaluation for one iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
  pub constraint_check: ConstraintResult,
  pub product_evaluation: ProductEvaluation,
}
