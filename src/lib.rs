//! # flowsheet-designer
//!
//! Iterative chemical process design. A language model proposes a flowsheet, the flowsheet
//! is converted into a simulator model and simulated, and the results are evaluated against
//! conservation laws and product specifications. The evaluation is scored and turned into
//! feedback for the next proposal.
//!
//! ## Architecture
//!
//! [controller::DesignController] owns the loop and is generic over its three seams:
//! [generator::DesignGenerator] (agent command or chat-completions endpoint),
//! [converter::ModelConverter] (design → simulator XML) and [simulator::Simulator]
//! (external process). Evaluation, scoring and feedback are pure functions over the
//! simulation result. Every artifact of a run is written under one run directory by
//! [recorder::RunRecorder].

pub mod config;
pub mod controller;
pub mod converter;
pub mod design_parse;
pub mod error;
pub mod evaluator;
pub mod feedback_synthesizer;
pub mod generator;
pub mod inputs;
pub mod prompt;
pub mod recorder;
#[cfg(test)]
mod recorder_test;
pub mod report;
pub mod scorer;
#[cfg(test)]
mod scorer_test;
pub mod simulator;
#[cfg(test)]
mod simulator_test;
pub mod types;
pub mod units;

pub use config::DesignerConfig;
pub use controller::{ControllerSettings, DesignController, RunInputs, RunOutcome};
pub use converter::{ModelConverter, XmlModelConverter};
pub use generator::{DesignGenerator, from_backend};
pub use recorder::RunRecorder;
pub use simulator::{ProcessSimulator, Simulator};
pub use types::{Design, Feedback, FeedbackStatus, ProductSpecs, RawMaterials, SimulationResult};
