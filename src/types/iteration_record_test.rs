//! Tests for `IterationRecord`.

use std::path::PathBuf;

use super::{ConstraintResult, Feedback, FeedbackStatus, IterationRecord};

fn record(score: Option<f64>) -> IterationRecord {
  IterationRecord {
    iteration: 2,
    timestamp: "2026-02-14T10:00:00+00:00".to_string(),
    process_design_path: PathBuf::from("run/iteration_2/process_design.json"),
    feedback: Feedback::new(FeedbackStatus::ProductSpecsNotMet, "not yet"),
    simulation_results_path: score.map(|_| PathBuf::from("run/iteration_2/simulation_results.json")),
    score,
    constraint_check: score.map(|_| ConstraintResult {
      mass_balance_satisfied: true,
      mass_balance_error_pct: 0.2,
      energy_balance_satisfied: true,
      energy_balance_error_pct: 1.0,
    }),
  }
}

#[test]
fn serializes_expected_fields() {
  let json = serde_json::to_value(record(Some(71.5))).unwrap();
  assert_eq!(json["iteration"], 2);
  assert_eq!(json["feedback"]["status"], "product_specs_not_met");
  assert_eq!(json["score"], 71.5);
  assert_eq!(
    json["simulation_results_path"],
    "run/iteration_2/simulation_results.json"
  );
}

#[test]
fn failed_iteration_omits_simulation_fields() {
  let json = serde_json::to_value(record(None)).unwrap();
  assert!(json.get("simulation_results_path").is_none());
  assert!(json.get("score").is_none());
  assert!(json.get("constraint_check").is_none());
  let back: IterationRecord = serde_json::from_value(json).unwrap();
  assert_eq!(back.score, None);
  assert_eq!(back.status(), FeedbackStatus::ProductSpecsNotMet);
}
