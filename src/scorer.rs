//! Scalar fitness of an evaluated design, in [0, 100], higher is better.

use tracing::instrument;

use crate::types::{ConstraintResult, Evaluation, ProductEvaluation};

pub const MAX_SCORE: f64 = 100.0;
/// Cap on each balance penalty.
const BALANCE_PENALTY_CAP: f64 = 50.0;
/// Penalty points per percent of mass balance error.
const MASS_PENALTY_PER_PCT: f64 = 10.0;
/// Penalty points per percent of energy balance error.
const ENERGY_PENALTY_PER_PCT: f64 = 5.0;

/// Weight of each product's shortfall in the score.
pub trait ProductWeighting: Send + Sync {
  /// Weight for `product`, one of `num_products` evaluated products.
  fn weight(&self, product: &str, num_products: usize) -> f64;
}

/// Every product counts `1 / num_products`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EqualWeighting;

impl ProductWeighting for EqualWeighting {
  fn weight(&self, _product: &str, num_products: usize) -> f64 {
    if num_products == 0 {
      0.0
    } else {
      1.0 / num_products as f64
    }
  }
}

/// Scores an evaluation with equal product weighting.
pub fn score(evaluation: &Evaluation) -> f64 {
  score_with(
    &evaluation.constraint_check,
    &evaluation.product_evaluation,
    &EqualWeighting,
  )
}

/// Scores constraint and product verdicts. Balance penalties apply only to an
/// unsatisfied balance.
#[instrument(level = "trace", skip(constraints, products, weighting))]
pub fn score_with(
  constraints: &ConstraintResult,
  products: &ProductEvaluation,
  weighting: &dyn ProductWeighting,
) -> f64 {
  let mut score = MAX_SCORE;

  if !constraints.mass_balance_satisfied {
    score -= penalty(constraints.mass_balance_error_pct, MASS_PENALTY_PER_PCT);
  }
  if !constraints.energy_balance_satisfied {
    score -= penalty(constraints.energy_balance_error_pct, ENERGY_PENALTY_PER_PCT);
  }

  let n = products.products.len();
  for p in &products.products {
    let normalized = p.score.clamp(0.0, 1.0) * MAX_SCORE;
    let weight = weighting.weight(&p.name, n).max(0.0);
    score -= (MAX_SCORE - normalized) * weight;
  }

  if score.is_nan() {
    return 0.0;
  }
  score.clamp(0.0, MAX_SCORE)
}

fn penalty(error_pct: f64, per_pct: f64) -> f64 {
  let p = error_pct.abs() * per_pct;
  if p.is_nan() {
    return BALANCE_PENALTY_CAP;
  }
  p.min(BALANCE_PENALTY_CAP)
}
