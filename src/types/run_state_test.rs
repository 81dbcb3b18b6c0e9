//! Tests for `RunState`.

use super::{
  BestDesign, ConstraintResult, Design, Evaluation, ProductEvaluation, RunState, SimulationResult,
};

fn best(iteration: u32, score: f64) -> BestDesign {
  BestDesign {
    iteration,
    design: Design::default(),
    simulation_result: SimulationResult::default(),
    evaluation: Evaluation {
      constraint_check: ConstraintResult::unavailable(),
      product_evaluation: ProductEvaluation {
        all_specifications_met: false,
        products: vec![],
      },
    },
    score,
  }
}

#[test]
fn initial_state() {
  let st = RunState::new();
  assert_eq!(st.current_iteration, 0);
  assert_eq!(st.best_score, f64::NEG_INFINITY);
  assert!(st.best.is_none());
  assert!(st.history.is_empty());
}

#[test]
fn advance_is_one_based() {
  let mut st = RunState::new();
  assert_eq!(st.advance(), 1);
  assert_eq!(st.advance(), 2);
  assert_eq!(st.current_iteration, 2);
}

#[test]
fn zero_score_beats_initial_state() {
  let mut st = RunState::new();
  assert!(st.offer_best(best(1, 0.0)));
  assert_eq!(st.best.as_ref().map(|b| b.iteration), Some(1));
}

#[test]
fn ties_keep_earliest() {
  let mut st = RunState::new();
  assert!(st.offer_best(best(1, 40.0)));
  assert!(!st.offer_best(best(2, 40.0)));
  assert_eq!(st.best.as_ref().map(|b| b.iteration), Some(1));
}

#[test]
fn lower_score_does_not_replace() {
  let mut st = RunState::new();
  st.offer_best(best(1, 60.0));
  assert!(!st.offer_best(best(2, 10.0)));
  assert!(st.offer_best(best(3, 60.5)));
  assert_eq!(st.best_score, 60.5);
  assert_eq!(st.best.as_ref().map(|b| b.iteration), Some(3));
}
