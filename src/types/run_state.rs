//! Mutable state of one design run, owned by the controller.

use super::{BestDesign, History, IterationRecord};

/// Mutable state of one design run. Constructed fresh per run.
#[derive(Debug, Clone)]
pub struct RunState {
  /// 0 before the first iteration, then 1-based.
  pub current_iteration: u32,
  pub best_score: f64,
  pub best: Option<BestDesign>,
  pub history: History,
}

impl Default for RunState {
  fn default() -> Self {
    Self::new()
  }
}

impl RunState {
  pub fn new() -> Self {
    Self {
      current_iteration: 0,
      best_score: f64::NEG_INFINITY,
      best: None,
      history: Vec::new(),
    }
  }

  /// Moves to the next iteration and returns its number.
  pub fn advance(&mut self) -> u32 {
    self.current_iteration += 1;
    self.current_iteration
  }

  /// Replaces the best design iff `candidate` scores strictly higher.
  /// Returns true when the best design changed.
  pub fn offer_best(&mut self, candidate: BestDesign) -> bool {
    if candidate.score > self.best_score {
      self.best_score = candidate.score;
      self.best = Some(candidate);
      true
    } else {
      false
    }
  }

  pub fn record(&mut self, record: IterationRecord) {
    self.history.push(record);
  }
}
