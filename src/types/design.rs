//! A candidate process proposal for one iteration (units + streams).

use serde::{Deserialize, Serialize};

/// Type-specific parameters of a unit or free-form extra conditions.
pub type ParameterMap = serde_json::Map<String, serde_json::Value>;

/// Endpoint names that denote the flowsheet boundary rather than a unit.
const BOUNDARY_ENDPOINTS: [&str; 5] = ["", "none", "feed", "product", "boundary"];

/// Returns true if a stream endpoint refers to the flowsheet boundary.
pub fn is_boundary_endpoint(endpoint: &str) -> bool {
  let e = endpoint.trim();
  BOUNDARY_ENDPOINTS.iter().any(|b| e.eq_ignore_ascii_case(b))
}

/// One candidate process design, as proposed by the model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Design {
  pub process_name: String,
  pub description: String,
  pub property_package: String,
  pub unit_operations: Vec<Unit>,
  pub streams: Vec<Stream>,
  pub rationale: String,
  /// Raw model text when the response could not be parsed into a design.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub design_description: Option<String>,
  /// Why this design is a degraded stand-in (set only for degraded designs).
  #[serde(skip_serializing_if = "Option::is_none")]
  pub generation_note: Option<String>,
}

impl Design {
  /// Wraps unparseable model output as a best-effort design so the run can continue.
  pub fn degraded(raw_response: impl Into<String>, note: impl Into<String>) -> Self {
    Self {
      process_name: "Unparsed design".to_string(),
      design_description: Some(raw_response.into()),
      generation_note: Some(note.into()),
      ..Self::default()
    }
  }

  pub fn is_degraded(&self) -> bool {
    self.generation_note.is_some()
  }
}

/// A unit operation (reactor, column, exchanger, pump, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Unit {
  pub id: String,
  pub name: String,
  #[serde(rename = "type")]
  pub unit_type: String,
  pub specifications: ParameterMap,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub operating_conditions: Option<OperatingConditions>,
}

impl Unit {
  /// Numeric specification value, looked up by any of `keys` in order.
  pub fn number(&self, keys: &[&str]) -> Option<f64> {
    keys
      .iter()
      .find_map(|k| self.specifications.get(*k).and_then(|v| v.as_f64()))
  }
}

/// Operating point of a unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatingConditions {
  pub temperature: Option<f64>,
  pub temperature_unit: Option<String>,
  pub pressure: Option<f64>,
  pub pressure_unit: Option<String>,
  pub additional_parameters: ParameterMap,
}

/// A material or utility stream between units or the boundary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stream {
  pub id: String,
  pub name: String,
  /// feed / intermediate / product / utility.
  #[serde(rename = "type")]
  pub stream_type: String,
  /// Unit id, or a boundary name such as `feed`.
  pub source: String,
  /// Unit id, or a boundary name such as `product`.
  pub destination: String,
  pub specifications: StreamSpecifications,
}

/// Thermodynamic state and composition of a stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamSpecifications {
  pub phase: Option<String>,
  pub temperature: Option<f64>,
  pub temperature_unit: Option<String>,
  pub pressure: Option<f64>,
  pub pressure_unit: Option<String>,
  pub flow_rate: Option<f64>,
  pub flow_rate_unit: Option<String>,
  pub composition: Vec<CompositionEntry>,
}

/// One (component, fraction) pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositionEntry {
  pub component: String,
  pub fraction: f64,
  /// `mole` or `mass`.
  pub fraction_type: Option<String>,
}
