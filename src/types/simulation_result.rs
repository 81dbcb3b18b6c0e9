//! Simulator output for one design.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::design::is_boundary_endpoint;

/// Results document produced by the simulator for one model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationResult {
  pub streams: BTreeMap<String, StreamState>,
  pub unit_operations: BTreeMap<String, UnitResult>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub mass_balance: Option<MassBalance>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub energy_balance: Option<EnergyBalance>,
}

/// State of one stream after convergence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamState {
  pub name: String,
  /// Source unit tag, or `none` for a feed.
  pub from: String,
  /// Destination unit tag, or `none` for a product/outlet.
  pub to: String,
  pub temperature: f64,
  pub temperature_unit: String,
  pub pressure: f64,
  pub pressure_unit: String,
  pub total_flow: f64,
  pub flow_unit: String,
  pub phase: String,
  pub components: BTreeMap<String, ComponentState>,
}

impl StreamState {
  /// Stream enters the flowsheet from outside.
  pub fn is_inlet(&self) -> bool {
    is_boundary_endpoint(&self.from)
  }

  /// Stream leaves the flowsheet.
  pub fn is_outlet(&self) -> bool {
    !self.is_inlet() && is_boundary_endpoint(&self.to)
  }

  /// Finds a component by name or formula (case-insensitive).
  pub fn component(&self, name: &str, formula: &str) -> Option<&ComponentState> {
    self.components.iter().find_map(|(key, c)| {
      let matches = key.eq_ignore_ascii_case(name)
        || key.eq_ignore_ascii_case(formula)
        || c
          .formula
          .as_deref()
          .is_some_and(|f| !formula.is_empty() && f.eq_ignore_ascii_case(formula));
      matches.then_some(c)
    })
  }
}

/// Per-component state within a stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentState {
  pub formula: Option<String>,
  pub mole_fraction: Option<f64>,
  pub mass_fraction: Option<f64>,
  pub mole_flow: Option<f64>,
  pub mass_flow: Option<f64>,
}

/// Derived quantities of one unit operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitResult {
  pub name: String,
  #[serde(rename = "type")]
  pub unit_type: String,
  pub inputs: Vec<String>,
  pub outputs: Vec<String>,
  pub parameters: UnitParameters,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitParameters {
  pub pressure_drop: Option<f64>,
  pub temperature_change: Option<f64>,
  pub heating_demand: Option<f64>,
  pub cooling_demand: Option<f64>,
  pub efficiency: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MassBalance {
  pub total_input_mass: f64,
  pub total_output_mass: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyBalance {
  pub total_energy_in: f64,
  pub total_energy_out: f64,
}

impl SimulationResult {
  /// Mass totals: the reported aggregate, else summed over boundary streams.
  /// None when the result carries neither.
  pub fn mass_totals(&self) -> Option<MassBalance> {
    if let Some(mb) = self.mass_balance {
      return Some(mb);
    }
    if self.streams.is_empty() {
      return None;
    }
    let total_input_mass = self
      .streams
      .values()
      .filter(|s| s.is_inlet())
      .map(|s| s.total_flow)
      .sum();
    let total_output_mass = self
      .streams
      .values()
      .filter(|s| s.is_outlet())
      .map(|s| s.total_flow)
      .sum();
    Some(MassBalance {
      total_input_mass,
      total_output_mass,
    })
  }

  /// Energy totals: the reported aggregate, else heating demand (in) and cooling
  /// demand (out) summed over units. None when the result carries neither.
  pub fn energy_totals(&self) -> Option<EnergyBalance> {
    if let Some(eb) = self.energy_balance {
      return Some(eb);
    }
    if self.unit_operations.is_empty() {
      return None;
    }
    let total_energy_in = self
      .unit_operations
      .values()
      .filter_map(|u| u.parameters.heating_demand)
      .sum();
    let total_energy_out = self
      .unit_operations
      .values()
      .filter_map(|u| u.parameters.cooling_demand)
      .sum();
    Some(EnergyBalance {
      total_energy_in,
      total_energy_out,
    })
  }

  pub fn outlet_streams(&self) -> impl Iterator<Item = (&String, &StreamState)> {
    self.streams.iter().filter(|(_, s)| s.is_outlet())
  }
}
