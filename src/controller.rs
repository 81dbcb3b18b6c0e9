//! Iteration controller: request design → convert → simulate → evaluate → score →
//! record → decide, once per iteration, until success or the iteration budget is spent.
//!
//! Conversion and simulation failures end the iteration with an `error` record and the
//! loop moves on. Only [PersistenceError] stops a run early.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, error, info, instrument, warn};

use crate::config::DesignerConfig;
use crate::converter::ModelConverter;
use crate::error::PersistenceError;
use crate::evaluator::{self, Tolerances};
use crate::feedback_synthesizer::{self, FailureKind};
use crate::generator::DesignGenerator;
use crate::prompt;
use crate::recorder::RunRecorder;
use crate::report::build_final_report;
use crate::scorer::{EqualWeighting, ProductWeighting, score_with};
use crate::simulator::Simulator;
use crate::types::{
  BestDesign, ConstraintResult, Design, Feedback, FeedbackStatus, IterationRecord, ProductSpecs,
  RawMaterials, RunState,
};

/// Step of one iteration, used to label log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationPhase {
  RequestingDesign,
  Converting,
  Simulating,
  Evaluating,
  Scoring,
  Recording,
}

impl fmt::Display for IterationPhase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      IterationPhase::RequestingDesign => write!(f, "requesting_design"),
      IterationPhase::Converting => write!(f, "converting"),
      IterationPhase::Simulating => write!(f, "simulating"),
      IterationPhase::Evaluating => write!(f, "evaluating"),
      IterationPhase::Scoring => write!(f, "scoring"),
      IterationPhase::Recording => write!(f, "recording"),
    }
  }
}

/// What happens after an iteration is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopDecision {
  Continue,
  StopSuccess,
  StopBudget,
}

/// Success stops the loop; otherwise it stops once `iteration` reaches the budget.
pub fn decide(status: FeedbackStatus, iteration: u32, max_iterations: u32) -> LoopDecision {
  if status.is_success() {
    LoopDecision::StopSuccess
  } else if iteration >= max_iterations {
    LoopDecision::StopBudget
  } else {
    LoopDecision::Continue
  }
}

#[derive(Debug, Clone)]
pub struct ControllerSettings {
  pub max_iterations: u32,
  pub simulation_timeout: Duration,
  /// Package named in the design request.
  pub property_package: String,
  pub tolerances: Tolerances,
  pub save_agent_responses: bool,
  pub write_score_trace: bool,
}

impl ControllerSettings {
  pub fn from_config(config: &DesignerConfig) -> Self {
    Self {
      max_iterations: config.agent.max_iterations,
      simulation_timeout: Duration::from_secs(config.simulator.timeout_secs),
      property_package: config.simulator.property_package.clone(),
      tolerances: config.evaluation,
      save_agent_responses: config.agent.save_agent_responses,
      write_score_trace: config.report.write_score_trace,
    }
  }
}

/// What the run designs for, plus the config snapshot stored with it.
#[derive(Debug, Clone)]
pub struct RunInputs {
  pub raw_materials: RawMaterials,
  pub product_specs: ProductSpecs,
  pub config_snapshot: serde_json::Value,
}

/// Result of a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
  pub success: bool,
  pub iterations: u32,
  pub best_iteration: Option<u32>,
  pub best_score: Option<f64>,
  pub run_dir: PathBuf,
}

pub struct DesignController<G, C, S> {
  generator: G,
  converter: C,
  simulator: S,
  settings: ControllerSettings,
  inputs: RunInputs,
  recorder: RunRecorder,
  weighting: Box<dyn ProductWeighting>,
}

impl<G, C, S> DesignController<G, C, S>
where
  G: DesignGenerator,
  C: ModelConverter,
  S: Simulator,
{
  pub fn new(
    generator: G,
    converter: C,
    simulator: S,
    settings: ControllerSettings,
    inputs: RunInputs,
    recorder: RunRecorder,
  ) -> Self {
    Self {
      generator,
      converter,
      simulator,
      settings,
      inputs,
      recorder,
      weighting: Box::new(EqualWeighting),
    }
  }

  /// Replaces the default equal product weighting.
  pub fn with_weighting(mut self, weighting: impl ProductWeighting + 'static) -> Self {
    self.weighting = Box::new(weighting);
    self
  }

  /// Runs the loop to a terminal state and writes the final report.
  pub async fn run(&self) -> Result<RunOutcome, PersistenceError> {
    let max = self.settings.max_iterations;
    info!(max_iterations = max, run_dir = %self.recorder.run_dir().display(), "starting process design cycle");
    self.recorder.save_inputs(
      &self.inputs.raw_materials,
      &self.inputs.product_specs,
      &self.inputs.config_snapshot,
    )?;

    let mut state = RunState::new();
    let decision = loop {
      let iteration = state.advance();
      info!(iteration, max_iterations = max, "beginning iteration");
      let status = self.run_iteration(&mut state, iteration).await?;
      match decide(status, iteration, max) {
        LoopDecision::Continue => continue,
        terminal => break terminal,
      }
    };

    match decision {
      LoopDecision::StopSuccess => info!(
        iteration = state.current_iteration,
        "process design meets all requirements"
      ),
      _ => warn!(
        max_iterations = max,
        best_iteration = state.best.as_ref().map(|b| b.iteration),
        best_score = state.best.as_ref().map(|b| b.score),
        "reached maximum iterations without a design meeting all requirements"
      ),
    }

    let report = build_final_report(&state);
    self.recorder.write_final_report(&report)?;
    if self.settings.write_score_trace {
      self.recorder.write_score_trace(&state.history)?;
    }

    Ok(RunOutcome {
      success: decision == LoopDecision::StopSuccess,
      iterations: state.current_iteration,
      best_iteration: state.best.as_ref().map(|b| b.iteration),
      best_score: state.best.as_ref().map(|b| b.score),
      run_dir: self.recorder.run_dir().to_path_buf(),
    })
  }

  #[instrument(level = "trace", skip(self, state))]
  async fn run_iteration(
    &self,
    state: &mut RunState,
    iteration: u32,
  ) -> Result<FeedbackStatus, PersistenceError> {
    let design = self.request_design(iteration).await?;
    let design_path = self.recorder.save_design(iteration, &design)?;

    let model = match self.converter.convert(&design) {
      Ok(m) => m,
      Err(e) => {
        error!(iteration, phase = %IterationPhase::Converting, error = %e, "conversion failed");
        let feedback = feedback_synthesizer::failure(FailureKind::Conversion, &e);
        return self.record(state, iteration, design_path, feedback, None, None, None);
      }
    };
    self.recorder.save_model(iteration, &model)?;

    let result = match self
      .simulator
      .run(&model, self.settings.simulation_timeout)
      .await
    {
      Ok(r) => r,
      Err(e) => {
        error!(iteration, phase = %IterationPhase::Simulating, error = %e, "simulation failed");
        let feedback = feedback_synthesizer::failure(FailureKind::Simulation, &e);
        return self.record(state, iteration, design_path, feedback, None, None, None);
      }
    };
    let results_path = self.recorder.save_simulation_result(iteration, &result)?;

    let evaluation = evaluator::evaluate(
      Some(&result),
      &self.inputs.product_specs,
      &self.settings.tolerances,
    );
    self.recorder.save_evaluation(iteration, &evaluation)?;
    debug!(
      iteration,
      phase = %IterationPhase::Evaluating,
      constraints_met = evaluation.constraint_check.all_satisfied(),
      products_met = evaluation.product_evaluation.all_specifications_met,
      "design evaluated"
    );
    let feedback = feedback_synthesizer::synthesize(&evaluation);

    let score = score_with(
      &evaluation.constraint_check,
      &evaluation.product_evaluation,
      self.weighting.as_ref(),
    );
    info!(iteration, phase = %IterationPhase::Scoring, score, status = %feedback.status, "design scored");
    let constraint_check = evaluation.constraint_check;
    let improved = state.offer_best(BestDesign {
      iteration,
      design,
      simulation_result: result,
      evaluation,
      score,
    });
    if improved {
      info!(iteration, score, "new best design");
    }

    self.record(
      state,
      iteration,
      design_path,
      feedback,
      Some(results_path),
      Some(score),
      Some(constraint_check),
    )
  }

  /// Asks the generator for a design; a failed request degrades to a raw-text design.
  async fn request_design(&self, iteration: u32) -> Result<Design, PersistenceError> {
    let mut context = prompt::format_design_context(
      &self.inputs.raw_materials,
      &self.inputs.product_specs,
      &self.settings.property_package,
      iteration,
      self.settings.max_iterations,
    );
    if iteration > 1 {
      let previous = self.recorder.load_feedback(iteration - 1);
      context.push_str("\n\n");
      context.push_str(&prompt::format_feedback_context(
        iteration - 1,
        previous.as_ref(),
      ));
    }

    info!(iteration, phase = %IterationPhase::RequestingDesign, "requesting process design");
    let (design, raw) = match self.generator.generate(&context).await {
      Ok(generated) => (generated.design, Some(generated.raw_response)),
      Err(e) => {
        warn!(iteration, phase = %IterationPhase::RequestingDesign, error = %e, "treating response as design description");
        let raw = e.raw_response().map(str::to_string);
        let design = Design::degraded(
          raw.clone().unwrap_or_default(),
          format!("design generation failed: {}", e),
        );
        (design, raw)
      }
    };
    if let (true, Some(raw)) = (self.settings.save_agent_responses, raw) {
      self.recorder.save_raw_response(iteration, &raw)?;
    }
    Ok(design)
  }

  #[allow(clippy::too_many_arguments)]
  fn record(
    &self,
    state: &mut RunState,
    iteration: u32,
    process_design_path: PathBuf,
    feedback: Feedback,
    simulation_results_path: Option<PathBuf>,
    score: Option<f64>,
    constraint_check: Option<ConstraintResult>,
  ) -> Result<FeedbackStatus, PersistenceError> {
    let status = feedback.status;
    let record = IterationRecord {
      iteration,
      timestamp: chrono::Utc::now().to_rfc3339(),
      process_design_path,
      feedback,
      simulation_results_path,
      score,
      constraint_check,
    };
    state.record(record.clone());
    self.recorder.record_iteration(&record, &state.history)?;
    info!(iteration, phase = %IterationPhase::Recording, status = %status, "iteration recorded");
    Ok(status)
  }
}
