//! Error taxonomy for a design run.
//!
//! Only [PersistenceError] escapes a started run; the other kinds are folded into the
//! iteration's feedback by the controller.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// The design generator failed to produce a usable design.
#[derive(Debug, Error)]
pub enum GenerationError {
  /// The model answered, but the answer is not a design document.
  #[error("could not parse design from model response: {reason}")]
  Unparseable { raw: String, reason: String },
  /// The agent command could not be started or exited unsuccessfully.
  #[error("agent command failed: {0}")]
  Agent(String),
  /// The chat-completions request failed.
  #[error("model request failed: {0}")]
  Request(String),
}

impl GenerationError {
  /// Raw model text carried by the error, if the model answered at all.
  pub fn raw_response(&self) -> Option<&str> {
    match self {
      GenerationError::Unparseable { raw, .. } => Some(raw),
      _ => None,
    }
  }
}

/// Structural conversion of a design into a simulator model failed.
#[derive(Debug, Error)]
pub enum ConversionError {
  #[error("design has no unit operations")]
  NoUnits,
  #[error("duplicate {kind} id '{id}'")]
  DuplicateId { kind: &'static str, id: String },
  #[error("stream '{stream}' references unknown unit '{unit}'")]
  UnknownEndpoint { stream: String, unit: String },
  #[error("unit '{unit}' has invalid parameter: {detail}")]
  InvalidParameter { unit: String, detail: String },
  #[error("unit '{unit}' is not connected: {detail}")]
  Disconnected { unit: String, detail: String },
  #[error("unit conversion failed: {0}")]
  Units(String),
  #[error("model serialization failed: {0}")]
  Serialize(String),
}

/// The external simulator failed or did not answer in time.
#[derive(Debug, Error)]
pub enum SimulationError {
  #[error("simulator command is empty")]
  EmptyCommand,
  #[error("simulator spawn failed: {0}")]
  Spawn(String),
  #[error("simulation timed out after {0:?}")]
  Timeout(Duration),
  #[error("simulator exited with {0}")]
  Exit(String),
  #[error("simulation results not found at {0}")]
  MissingResults(PathBuf),
  #[error("simulation results are malformed: {0}")]
  Malformed(String),
  #[error("simulator reported an error: {0}")]
  Reported(String),
  #[error("simulator I/O: {0}")]
  Io(#[from] std::io::Error),
}

/// A run artifact could not be written or read back. Fatal for the run.
#[derive(Debug, Error)]
pub enum PersistenceError {
  #[error("{path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("{path}: {source}")]
  Json {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
  #[error("{path}: {source}")]
  Csv {
    path: PathBuf,
    #[source]
    source: csv::Error,
  },
}

impl PersistenceError {
  pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    PersistenceError::Io {
      path: path.into(),
      source,
    }
  }

  pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
    PersistenceError::Json {
      path: path.into(),
      source,
    }
  }
}

/// Configuration could not be loaded or is invalid.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("reading {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("parsing {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_yaml::Error,
  },
  #[error("invalid configuration: {0}")]
  Invalid(String),
}

/// Raw-material or product-spec input file could not be loaded.
#[derive(Debug, Error)]
pub enum InputError {
  #[error("reading {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("parsing {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
  #[error("{0}")]
  Invalid(String),
}
