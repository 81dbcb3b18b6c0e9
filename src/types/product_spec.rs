//! Run inputs: raw materials available and products required.

use serde::{Deserialize, Serialize};

/// Raw materials document (`{"materials": [...]}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMaterials {
  pub materials: Vec<RawMaterial>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMaterial {
  pub name: String,
  pub formula: String,
  pub amount: f64,
  pub unit: String,
  /// solid / liquid / gas.
  pub state: String,
}

/// Product specifications document (`{"products": [...]}`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductSpecs {
  pub products: Vec<ProductSpec>,
}

/// Required product: minimum purity and yield (fractions) and a target rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSpec {
  pub name: String,
  pub formula: String,
  pub min_purity: f64,
  pub min_yield: f64,
  pub target_production_rate: f64,
  /// Unit of `target_production_rate` (e.g. `kg/h`).
  pub unit: String,
  /// Optional delivery temperature of the product stream, in `temperature_unit` (K if unset).
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub temperature: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub temperature_unit: Option<String>,
  /// Optional delivery pressure of the product stream, in `pressure_unit` (Pa if unset).
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub pressure: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub pressure_unit: Option<String>,
}

impl ProductSpec {
  /// Spec with only the required purity, yield and rate targets.
  pub fn new(
    name: impl Into<String>,
    formula: impl Into<String>,
    min_purity: f64,
    min_yield: f64,
    target_production_rate: f64,
    unit: impl Into<String>,
  ) -> Self {
    Self {
      name: name.into(),
      formula: formula.into(),
      min_purity,
      min_yield,
      target_production_rate,
      unit: unit.into(),
      temperature: None,
      temperature_unit: None,
      pressure: None,
      pressure_unit: None,
    }
  }
}
