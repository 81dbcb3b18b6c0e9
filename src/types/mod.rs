//! Data model of a design run.
//!
//! Everything persisted under a run directory is one of these types, serialized as JSON.

mod best_design;
mod design;
mod evaluation;
mod feedback;
mod feedback_status;
mod final_report;
mod iteration_record;
#[cfg(test)]
mod iteration_record_test;
mod product_spec;
mod run_state;
#[cfg(test)]
mod run_state_test;
mod simulation_result;

pub use best_design::BestDesign;
pub use design::{
  CompositionEntry, Design, OperatingConditions, ParameterMap, Stream, StreamSpecifications, Unit,
  is_boundary_endpoint,
};
pub use evaluation::{
  BALANCE_ERROR_SENTINEL, ConstraintResult, Evaluation, IssueKind, ProductEvaluation,
  ProductIssue, ProductResult,
};
pub use feedback::Feedback;
pub use feedback_status::FeedbackStatus;
pub use final_report::{
  BestDesignSummary, FinalReport, PerformanceMetrics, ProductReport, ReportSummary,
};
pub use iteration_record::{History, IterationRecord};
pub use product_spec::{ProductSpec, ProductSpecs, RawMaterial, RawMaterials};
pub use run_state::RunState;
pub use simulation_result::{
  ComponentState, EnergyBalance, MassBalance, SimulationResult, StreamState, UnitParameters,
  UnitResult,
};
