//! Highest-scoring iteration seen so far in a run.

use super::{Design, Evaluation, SimulationResult};

/// Full record of the highest-scoring iteration; ties keep the earliest.
#[derive(Debug, Clone, PartialEq)]
pub struct BestDesign {
  pub iteration: u32,
  pub design: Design,
  pub simulation_result: SimulationResult,
  pub evaluation: Evaluation,
  pub score: f64,
}

impl BestDesign {
  /// Balances satisfied and every product spec met.
  pub fn meets_all_requirements(&self) -> bool {
    self.evaluation.constraint_check.all_satisfied()
      && self.evaluation.product_evaluation.all_specifications_met
  }
}
