//! Tests for `recorder` and `report`.

use crate::converter::ModelArtifact;
use crate::recorder::{
  CONFIG_FILENAME, FEEDBACK_FILENAME, HISTORY_FILENAME, RunRecorder, load_history, write_json,
};
use crate::report::build_final_report;
use crate::types::{
  BestDesign, ConstraintResult, Design, Evaluation, Feedback, FeedbackStatus, IterationRecord,
  ProductEvaluation, ProductSpec, ProductSpecs, RawMaterial, RawMaterials, RunState,
  SimulationResult,
};

fn record(rec: &RunRecorder, iteration: u32, status: FeedbackStatus, score: Option<f64>) -> IterationRecord {
  IterationRecord {
    iteration,
    timestamp: "2026-10-15T10:00:00+00:00".to_string(),
    process_design_path: rec.iteration_dir(iteration).join("process_design.json"),
    feedback: Feedback::new(status, format!("iteration {}", iteration)),
    simulation_results_path: None,
    score,
    constraint_check: score.map(|_| ConstraintResult {
      mass_balance_satisfied: true,
      mass_balance_error_pct: 0.5,
      energy_balance_satisfied: false,
      energy_balance_error_pct: 12.0,
    }),
  }
}

#[test]
fn create_makes_distinct_run_dirs() {
  let out = tempfile::tempdir().unwrap();
  let a = RunRecorder::create(out.path()).unwrap();
  let b = RunRecorder::create(out.path()).unwrap();
  assert_ne!(a.run_dir(), b.run_dir());
  assert!(a.run_dir().is_dir());
  let name = a.run_dir().file_name().unwrap().to_string_lossy().into_owned();
  assert!(name.starts_with("run_"));
}

#[test]
fn inputs_and_iteration_artifacts_land_in_layout() {
  let out = tempfile::tempdir().unwrap();
  let rec = RunRecorder::create(out.path()).unwrap();
  let raw = RawMaterials {
    materials: vec![RawMaterial {
      name: "Ethane".to_string(),
      formula: "C2H6".to_string(),
      amount: 1.0,
      unit: "kg/h".to_string(),
      state: "gas".to_string(),
    }],
  };
  let specs = ProductSpecs {
    products: vec![ProductSpec::new("Ethylene", "C2H4", 0.99, 0.9, 100.0, "kg/h")],
  };
  rec
    .save_inputs(&raw, &specs, &serde_json::json!({"agent": {"max_iterations": 3}}))
    .unwrap();
  assert!(rec.run_dir().join(CONFIG_FILENAME).is_file());

  let design_path = rec.save_design(1, &Design::default()).unwrap();
  assert!(design_path.ends_with("iteration_1/process_design.json"));
  rec.save_raw_response(1, "raw text").unwrap();
  let model_path = rec
    .save_model(
      1,
      &ModelArtifact {
        file_name: "model.dwxml".to_string(),
        content: "<DWSIM/>".to_string(),
      },
    )
    .unwrap();
  assert_eq!(std::fs::read_to_string(model_path).unwrap(), "<DWSIM/>");
  let sim_path = rec
    .save_simulation_result(1, &SimulationResult::default())
    .unwrap();
  assert!(sim_path.is_file());
}

#[test]
fn feedback_round_trips_and_absence_is_tolerated() {
  let out = tempfile::tempdir().unwrap();
  let rec = RunRecorder::create(out.path()).unwrap();
  assert!(rec.load_feedback(1).is_none());

  let r1 = record(&rec, 1, FeedbackStatus::ConstraintViolation, Some(40.0));
  let history = vec![r1.clone()];
  rec.record_iteration(&r1, &history).unwrap();
  assert!(rec.iteration_dir(1).join(FEEDBACK_FILENAME).is_file());
  assert_eq!(rec.load_feedback(1), Some(r1.feedback.clone()));

  std::fs::write(rec.iteration_dir(1).join(FEEDBACK_FILENAME), "{oops").unwrap();
  assert!(rec.load_feedback(1).is_none());
}

#[test]
fn history_is_rewritten_in_full() {
  let out = tempfile::tempdir().unwrap();
  let rec = RunRecorder::create(out.path()).unwrap();
  let mut history = Vec::new();
  for i in 1..=3 {
    let r = record(&rec, i, FeedbackStatus::Error, None);
    history.push(r.clone());
    rec.record_iteration(&r, &history).unwrap();
  }
  let loaded = load_history(&rec.run_dir().join(HISTORY_FILENAME)).unwrap();
  assert_eq!(loaded, history);
}

#[test]
fn score_trace_has_one_row_per_iteration() {
  let out = tempfile::tempdir().unwrap();
  let rec = RunRecorder::create(out.path()).unwrap();
  let history = vec![
    record(&rec, 1, FeedbackStatus::Error, None),
    record(&rec, 2, FeedbackStatus::ConstraintViolation, Some(40.0)),
  ];
  let path = rec.write_score_trace(&history).unwrap();
  let text = std::fs::read_to_string(path).unwrap();
  let lines: Vec<&str> = text.lines().collect();
  assert_eq!(
    lines[0],
    "iteration,status,score,mass_balance_error_pct,energy_balance_error_pct"
  );
  assert_eq!(lines[1], "1,error,,,");
  assert_eq!(lines[2], "2,constraint_violation,40.0,0.5,12.0");
  assert_eq!(lines.len(), 3);
}

#[test]
fn load_history_reports_bad_json() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join(HISTORY_FILENAME);
  write_json(&path, &serde_json::json!({"not": "a list"})).unwrap();
  assert!(load_history(&path).is_err());
}

#[test]
fn report_without_best_design_is_summary_only() {
  let mut state = RunState::new();
  state.advance();
  state.advance();
  let report = build_final_report(&state);
  assert_eq!(report.summary.total_iterations, 2);
  assert!(!report.summary.success);
  assert!(report.summary.best_iteration.is_none());
  assert!(report.best_design.is_none());
  assert!(report.product_results.is_empty());
}

#[test]
fn report_from_best_design() {
  let mut state = RunState::new();
  state.advance();
  state.offer_best(BestDesign {
    iteration: 1,
    design: Design {
      process_name: "Cracker".to_string(),
      ..Design::default()
    },
    simulation_result: SimulationResult::default(),
    evaluation: Evaluation {
      constraint_check: ConstraintResult {
        mass_balance_satisfied: true,
        mass_balance_error_pct: 0.1,
        energy_balance_satisfied: true,
        energy_balance_error_pct: 0.2,
      },
      product_evaluation: ProductEvaluation {
        all_specifications_met: true,
        products: vec![],
      },
    },
    score: 100.0,
  });
  let report = build_final_report(&state);
  assert!(report.summary.success);
  assert_eq!(report.summary.best_score, Some(100.0));
  let best = report.best_design.unwrap();
  assert_eq!(best.process_name, "Cracker");
  assert_eq!(best.description, "No description available");
  assert_eq!(report.performance_metrics.unwrap().energy_balance_error, 0.2);
}
