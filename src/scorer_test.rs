//! Tests for `scorer`.

use proptest::prelude::*;

use crate::scorer::{EqualWeighting, MAX_SCORE, ProductWeighting, score, score_with};
use crate::types::{ConstraintResult, Evaluation, ProductEvaluation, ProductResult};

fn constraints(mass_ok: bool, mass_err: f64, energy_ok: bool, energy_err: f64) -> ConstraintResult {
  ConstraintResult {
    mass_balance_satisfied: mass_ok,
    mass_balance_error_pct: mass_err,
    energy_balance_satisfied: energy_ok,
    energy_balance_error_pct: energy_err,
  }
}

fn product(name: &str, score: f64) -> ProductResult {
  ProductResult {
    name: name.to_string(),
    stream: Some("P1".to_string()),
    target_purity: 0.99,
    actual_purity: Some(0.99),
    target_yield: 0.9,
    actual_yield: Some(0.9),
    target_production_rate: 100.0,
    actual_production_rate: Some(100.0),
    production_rate_unit: "kg/h".to_string(),
    specifications_met: score >= 1.0,
    score,
    issues: vec![],
  }
}

fn products(scores: &[f64]) -> ProductEvaluation {
  ProductEvaluation {
    all_specifications_met: scores.iter().all(|s| *s >= 1.0),
    products: scores
      .iter()
      .enumerate()
      .map(|(i, s)| product(&format!("p{}", i), *s))
      .collect(),
  }
}

#[test]
fn perfect_design_scores_max() {
  let s = score_with(
    &constraints(true, 0.0, true, 0.0),
    &products(&[1.0]),
    &EqualWeighting,
  );
  assert_eq!(s, MAX_SCORE);
}

#[test]
fn scenario_b_mass_penalty_capped_at_fifty() {
  let s = score_with(
    &constraints(false, 10.0, true, 0.0),
    &products(&[1.0]),
    &EqualWeighting,
  );
  assert_eq!(s, 50.0);
}

#[test]
fn small_mass_error_penalized_proportionally() {
  let s = score_with(
    &constraints(false, 2.0, true, 0.0),
    &products(&[]),
    &EqualWeighting,
  );
  assert!((s - 80.0).abs() < 1e-9);
}

#[test]
fn energy_penalty_is_half_rate() {
  let s = score_with(
    &constraints(true, 0.0, false, 4.0),
    &products(&[]),
    &EqualWeighting,
  );
  assert!((s - 80.0).abs() < 1e-9);
}

#[test]
fn product_shortfall_is_equally_weighted() {
  let s = score_with(
    &constraints(true, 0.0, true, 0.0),
    &products(&[1.0, 0.5]),
    &EqualWeighting,
  );
  assert!((s - 75.0).abs() < 1e-9);
}

#[test]
fn worst_case_clamps_to_zero() {
  let s = score_with(
    &constraints(false, 100.0, false, 100.0),
    &products(&[0.0]),
    &EqualWeighting,
  );
  assert_eq!(s, 0.0);
}

#[test]
fn score_uses_evaluation_parts() {
  let ev = Evaluation {
    constraint_check: constraints(false, 10.0, true, 0.0),
    product_evaluation: products(&[0.5]),
  };
  assert_eq!(score(&ev), 0.0);
}

struct FirstOnly;

impl ProductWeighting for FirstOnly {
  fn weight(&self, product: &str, _num_products: usize) -> f64 {
    if product == "p0" { 1.0 } else { 0.0 }
  }
}

#[test]
fn weighting_is_pluggable() {
  let pe = products(&[1.0, 0.0]);
  let c = constraints(true, 0.0, true, 0.0);
  assert_eq!(score_with(&c, &pe, &FirstOnly), 100.0);
  assert!((score_with(&c, &pe, &EqualWeighting) - 50.0).abs() < 1e-9);
}

fn arb_constraints() -> impl Strategy<Value = ConstraintResult> {
  (any::<bool>(), 0.0..1000.0f64, any::<bool>(), 0.0..1000.0f64)
    .prop_map(|(mo, me, eo, ee)| constraints(mo, me, eo, ee))
}

proptest! {
  #[test]
  fn score_is_bounded(c in arb_constraints(), scores in prop::collection::vec(0.0..=1.0f64, 0..6)) {
    let s = score_with(&c, &products(&scores), &EqualWeighting);
    prop_assert!((0.0..=MAX_SCORE).contains(&s));
  }

  #[test]
  fn score_is_deterministic(c in arb_constraints(), scores in prop::collection::vec(0.0..=1.0f64, 0..6)) {
    let pe = products(&scores);
    let a = score_with(&c, &pe, &EqualWeighting);
    let b = score_with(&c, &pe, &EqualWeighting);
    prop_assert_eq!(a.to_bits(), b.to_bits());
  }

  #[test]
  fn lower_mass_error_never_lowers_score(
    c in arb_constraints(),
    smaller in 0.0..1000.0f64,
    extra in 0.0..1000.0f64,
    scores in prop::collection::vec(0.0..=1.0f64, 0..6),
  ) {
    let pe = products(&scores);
    let mut lo = c;
    lo.mass_balance_error_pct = smaller;
    let mut hi = c;
    hi.mass_balance_error_pct = smaller + extra;
    prop_assert!(score_with(&lo, &pe, &EqualWeighting) >= score_with(&hi, &pe, &EqualWeighting));
  }
}
