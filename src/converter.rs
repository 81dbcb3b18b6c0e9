//! Design → simulator-native model.
//!
//! [XmlModelConverter] checks the flowsheet structure before anything is simulated and
//! emits a DWSIM-style XML document.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::ConversionError;
use crate::types::{Design, Stream, Unit, is_boundary_endpoint};
use crate::units;

/// File name of the model inside an iteration directory.
pub const MODEL_FILE_NAME: &str = "model.dwxml";
pub const FALLBACK_PROPERTY_PACKAGE: &str = "NRTL";
pub const SUPPORTED_PROPERTY_PACKAGES: [&str; 4] =
  ["NRTL", "UNIQUAC", "Peng-Robinson", "Soave-Redlich-Kwong"];

const DEFAULT_TEMPERATURE_K: f64 = 298.15;
const DEFAULT_PRESSURE_PA: f64 = 101_325.0;
const DEFAULT_TRAYS: f64 = 10.0;
const DEFAULT_REFLUX_RATIO: f64 = 1.5;

/// Serialized model ready to hand to a simulator.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelArtifact {
  pub file_name: String,
  pub content: String,
}

/// Structural transform from [Design] to a simulator model.
pub trait ModelConverter: Send + Sync {
  fn convert(&self, design: &Design) -> Result<ModelArtifact, ConversionError>;
}

/// Simulator block a design unit maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
  Reactor,
  Column,
  HeatExchanger,
  Pump,
  Custom,
}

impl UnitKind {
  pub fn classify(unit_type: &str) -> Self {
    let t = unit_type.trim().to_lowercase().replace(['-', ' '], "_");
    if t.contains("reactor") || t == "cstr" || t == "pfr" {
      UnitKind::Reactor
    } else if t.contains("distillation") || t.contains("column") {
      UnitKind::Column
    } else if t.contains("exchanger") {
      UnitKind::HeatExchanger
    } else if t == "pump" {
      UnitKind::Pump
    } else {
      UnitKind::Custom
    }
  }

  pub fn simulator_type(self) -> &'static str {
    match self {
      UnitKind::Reactor => "CSTR",
      UnitKind::Column => "DistillationColumn",
      UnitKind::HeatExchanger => "HeatExchanger",
      UnitKind::Pump => "Pump",
      UnitKind::Custom => "CustomUnit",
    }
  }
}

/// Converter emitting DWSIM-style XML.
#[derive(Debug, Clone)]
pub struct XmlModelConverter {
  default_property_package: String,
  calculation_mode: String,
}

impl XmlModelConverter {
  pub fn new(
    default_property_package: impl Into<String>,
    calculation_mode: impl Into<String>,
  ) -> Self {
    Self {
      default_property_package: default_property_package.into(),
      calculation_mode: calculation_mode.into(),
    }
  }

  /// The design's package when supported, then the configured default, then NRTL.
  pub fn resolve_property_package(&self, design: &Design) -> String {
    let supported = |p: &str| SUPPORTED_PROPERTY_PACKAGES.contains(&p);
    let requested = design.property_package.trim();
    if supported(requested) {
      return requested.to_string();
    }
    if !requested.is_empty() {
      warn!(requested, "unsupported property package");
    }
    if supported(&self.default_property_package) {
      self.default_property_package.clone()
    } else {
      FALLBACK_PROPERTY_PACKAGE.to_string()
    }
  }
}

impl ModelConverter for XmlModelConverter {
  #[instrument(level = "trace", skip(self, design), fields(process = %design.process_name))]
  fn convert(&self, design: &Design) -> Result<ModelArtifact, ConversionError> {
    validate(design)?;

    let units = design
      .unit_operations
      .iter()
      .map(|u| unit_xml(u, &design.streams))
      .collect::<Result<Vec<_>, _>>()?;
    let streams = design
      .streams
      .iter()
      .map(stream_xml)
      .collect::<Result<Vec<_>, _>>()?;

    let doc = ModelXml {
      version: "5.0",
      info: SimulationInfoXml {
        name: if design.process_name.is_empty() {
          "Agent Generated Process".to_string()
        } else {
          design.process_name.clone()
        },
        description: design.description.clone(),
        id: Uuid::new_v4().to_string(),
        calculation_mode: self.calculation_mode.clone(),
      },
      property_packages: PropertyPackagesXml {
        package: PropertyPackageXml {
          name: self.resolve_property_package(design),
        },
      },
      compounds: CompoundsXml {
        items: compounds(design),
      },
      unit_operations: UnitOperationsXml { items: units },
      streams: StreamsXml { items: streams },
    };

    let content = quick_xml::se::to_string_with_root("DWSIM", &doc)
      .map_err(|e| ConversionError::Serialize(e.to_string()))?;
    info!(
      units = design.unit_operations.len(),
      streams = design.streams.len(),
      "converted design to simulator model"
    );
    Ok(ModelArtifact {
      file_name: MODEL_FILE_NAME.to_string(),
      content,
    })
  }
}

/// Structural checks that must hold before simulation.
pub fn validate(design: &Design) -> Result<(), ConversionError> {
  if design.unit_operations.is_empty() {
    return Err(ConversionError::NoUnits);
  }

  let mut unit_ids = HashSet::new();
  for u in &design.unit_operations {
    if !unit_ids.insert(u.id.as_str()) {
      return Err(ConversionError::DuplicateId {
        kind: "unit",
        id: u.id.clone(),
      });
    }
  }
  let mut stream_ids = HashSet::new();
  for s in &design.streams {
    if !stream_ids.insert(s.id.as_str()) {
      return Err(ConversionError::DuplicateId {
        kind: "stream",
        id: s.id.clone(),
      });
    }
    for endpoint in [&s.source, &s.destination] {
      if !is_boundary_endpoint(endpoint) && !unit_ids.contains(endpoint.as_str()) {
        return Err(ConversionError::UnknownEndpoint {
          stream: s.id.clone(),
          unit: endpoint.clone(),
        });
      }
    }
  }

  for u in &design.unit_operations {
    let inlets = design.streams.iter().filter(|s| s.destination == u.id).count();
    let outlets = design.streams.iter().filter(|s| s.source == u.id).count();
    match UnitKind::classify(&u.unit_type) {
      UnitKind::Reactor => {
        positive(u, &["volume", "volume_m3", "reactor_volume"], "volume")?;
        connected(u, inlets, outlets)?;
      }
      UnitKind::Column => {
        positive(
          u,
          &["num_trays", "number_of_trays", "trays", "num_stages", "stages"],
          "number of trays",
        )?;
        connected(u, inlets, outlets)?;
      }
      UnitKind::HeatExchanger => connected(u, inlets, outlets)?,
      UnitKind::Pump if inlets == 0 || outlets != 1 => {
        return Err(ConversionError::Disconnected {
          unit: u.id.clone(),
          detail: format!(
            "pump needs an inlet and exactly one outlet, found {} in / {} out",
            inlets, outlets
          ),
        });
      }
      _ => {}
    }
  }
  Ok(())
}

/// A declared value under any of `keys` must be positive.
fn positive(unit: &Unit, keys: &[&str], what: &str) -> Result<(), ConversionError> {
  match unit.number(keys) {
    Some(v) if v <= 0.0 || !v.is_finite() => Err(ConversionError::InvalidParameter {
      unit: unit.id.clone(),
      detail: format!("{} must be positive, got {}", what, v),
    }),
    _ => Ok(()),
  }
}

fn connected(unit: &Unit, inlets: usize, outlets: usize) -> Result<(), ConversionError> {
  if inlets == 0 || outlets == 0 {
    return Err(ConversionError::Disconnected {
      unit: unit.id.clone(),
      detail: format!("needs an inlet and an outlet, found {} in / {} out", inlets, outlets),
    });
  }
  Ok(())
}

fn compounds(design: &Design) -> Vec<CompoundXml> {
  let mut seen = HashSet::new();
  design
    .streams
    .iter()
    .flat_map(|s| s.specifications.composition.iter())
    .filter(|c| !c.component.trim().is_empty())
    .filter(|c| seen.insert(c.component.clone()))
    .map(|c| CompoundXml {
      name: c.component.clone(),
      formula: c.component.clone(),
    })
    .collect()
}

fn to_kelvin(value: Option<f64>, unit: Option<&str>) -> Result<f64, ConversionError> {
  match value {
    Some(v) => units::convert(v, unit.unwrap_or("K"), "K").map_err(ConversionError::Units),
    None => Ok(DEFAULT_TEMPERATURE_K),
  }
}

fn to_pascal(value: Option<f64>, unit: Option<&str>) -> Result<f64, ConversionError> {
  match value {
    Some(v) => units::convert(v, unit.unwrap_or("Pa"), "Pa").map_err(ConversionError::Units),
    None => Ok(DEFAULT_PRESSURE_PA),
  }
}

fn unit_xml(unit: &Unit, streams: &[Stream]) -> Result<UnitXml, ConversionError> {
  let kind = UnitKind::classify(&unit.unit_type);
  let (temperature, pressure) = match &unit.operating_conditions {
    Some(oc) => (
      oc.temperature
        .map(|t| to_kelvin(Some(t), oc.temperature_unit.as_deref()))
        .transpose()?,
      oc.pressure
        .map(|p| to_pascal(Some(p), oc.pressure_unit.as_deref()))
        .transpose()?,
    ),
    None => (None, None),
  };

  let mut xml = UnitXml {
    id: unit.id.clone(),
    unit_type: kind.simulator_type().to_string(),
    name: unit.name.clone(),
    temperature,
    pressure,
    volume: None,
    number_of_trays: None,
    reflux_ratio: None,
    heat_duty: None,
    parameters: unit
      .specifications
      .iter()
      .map(|(k, v)| ParameterXml {
        name: k.clone(),
        value: match v {
          serde_json::Value::String(s) => s.clone(),
          other => other.to_string(),
        },
      })
      .collect(),
    inlets: port_list(streams, |s| s.destination == unit.id),
    outlets: port_list(streams, |s| s.source == unit.id),
  };
  match kind {
    UnitKind::Reactor => {
      xml.volume = unit.number(&["volume", "volume_m3", "reactor_volume"]);
    }
    UnitKind::Column => {
      xml.number_of_trays = Some(
        unit
          .number(&["num_trays", "number_of_trays", "trays", "num_stages", "stages"])
          .unwrap_or(DEFAULT_TRAYS),
      );
      xml.reflux_ratio = Some(
        unit
          .number(&["reflux_ratio", "reflux"])
          .unwrap_or(DEFAULT_REFLUX_RATIO),
      );
    }
    UnitKind::HeatExchanger => {
      xml.heat_duty = Some(unit.number(&["heat_duty", "duty"]).unwrap_or(0.0));
    }
    UnitKind::Pump | UnitKind::Custom => {}
  }
  Ok(xml)
}

fn port_list(streams: &[Stream], pred: impl Fn(&Stream) -> bool) -> Vec<PortXml> {
  streams
    .iter()
    .filter(|s| pred(s))
    .map(|s| PortXml {
      stream_id: s.id.clone(),
    })
    .collect()
}

fn stream_xml(stream: &Stream) -> Result<StreamXml, ConversionError> {
  let spec = &stream.specifications;
  let mass_flow = match spec.flow_rate {
    Some(f) => units::convert(f, spec.flow_rate_unit.as_deref().unwrap_or("kg/h"), "kg/h")
      .map_err(ConversionError::Units)?,
    None => 0.0,
  };
  Ok(StreamXml {
    id: stream.id.clone(),
    name: stream.name.clone(),
    from: stream.source.clone(),
    to: stream.destination.clone(),
    phase: spec.phase.clone(),
    temperature: to_kelvin(spec.temperature, spec.temperature_unit.as_deref())?,
    pressure: to_pascal(spec.pressure, spec.pressure_unit.as_deref())?,
    mass_flow,
    composition: CompositionXml {
      items: spec
        .composition
        .iter()
        .map(|c| FractionXml {
          name: c.component.clone(),
          basis: c.fraction_type.clone().unwrap_or_else(|| "mole".to_string()),
          fraction: c.fraction,
        })
        .collect(),
    },
  })
}

#[derive(Debug, Serialize)]
struct ModelXml {
  #[serde(rename = "@Version")]
  version: &'static str,
  #[serde(rename = "SimulationInfo")]
  info: SimulationInfoXml,
  #[serde(rename = "PropertyPackages")]
  property_packages: PropertyPackagesXml,
  #[serde(rename = "Compounds")]
  compounds: CompoundsXml,
  #[serde(rename = "UnitOperations")]
  unit_operations: UnitOperationsXml,
  #[serde(rename = "Streams")]
  streams: StreamsXml,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct SimulationInfoXml {
  name: String,
  description: String,
  #[serde(rename = "ID")]
  id: String,
  calculation_mode: String,
}

#[derive(Debug, Serialize)]
struct PropertyPackagesXml {
  #[serde(rename = "PropertyPackage")]
  package: PropertyPackageXml,
}

#[derive(Debug, Serialize)]
struct PropertyPackageXml {
  #[serde(rename = "Name")]
  name: String,
}

#[derive(Debug, Serialize)]
struct CompoundsXml {
  #[serde(rename = "Compound")]
  items: Vec<CompoundXml>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct CompoundXml {
  name: String,
  formula: String,
}

#[derive(Debug, Serialize)]
struct UnitOperationsXml {
  #[serde(rename = "UnitOperation")]
  items: Vec<UnitXml>,
}

#[derive(Debug, Serialize)]
struct UnitXml {
  #[serde(rename = "@ID")]
  id: String,
  #[serde(rename = "@Type")]
  unit_type: String,
  #[serde(rename = "@Name")]
  name: String,
  #[serde(rename = "Temperature", skip_serializing_if = "Option::is_none")]
  temperature: Option<f64>,
  #[serde(rename = "Pressure", skip_serializing_if = "Option::is_none")]
  pressure: Option<f64>,
  #[serde(rename = "Volume", skip_serializing_if = "Option::is_none")]
  volume: Option<f64>,
  #[serde(rename = "NumberOfTrays", skip_serializing_if = "Option::is_none")]
  number_of_trays: Option<f64>,
  #[serde(rename = "RefluxRatio", skip_serializing_if = "Option::is_none")]
  reflux_ratio: Option<f64>,
  #[serde(rename = "HeatDuty", skip_serializing_if = "Option::is_none")]
  heat_duty: Option<f64>,
  #[serde(rename = "Parameter")]
  parameters: Vec<ParameterXml>,
  #[serde(rename = "Inlet")]
  inlets: Vec<PortXml>,
  #[serde(rename = "Outlet")]
  outlets: Vec<PortXml>,
}

#[derive(Debug, Serialize)]
struct ParameterXml {
  #[serde(rename = "@Name")]
  name: String,
  #[serde(rename = "$text")]
  value: String,
}

#[derive(Debug, Serialize)]
struct PortXml {
  #[serde(rename = "@StreamID")]
  stream_id: String,
}

#[derive(Debug, Serialize)]
struct StreamsXml {
  #[serde(rename = "Stream")]
  items: Vec<StreamXml>,
}

#[derive(Debug, Serialize)]
struct StreamXml {
  #[serde(rename = "@ID")]
  id: String,
  #[serde(rename = "@Name")]
  name: String,
  #[serde(rename = "@From")]
  from: String,
  #[serde(rename = "@To")]
  to: String,
  #[serde(rename = "Phase", skip_serializing_if = "Option::is_none")]
  phase: Option<String>,
  /// K
  #[serde(rename = "Temperature")]
  temperature: f64,
  /// Pa
  #[serde(rename = "Pressure")]
  pressure: f64,
  /// kg/h
  #[serde(rename = "MassFlow")]
  mass_flow: f64,
  #[serde(rename = "Composition")]
  composition: CompositionXml,
}

#[derive(Debug, Serialize)]
struct CompositionXml {
  #[serde(rename = "Compound")]
  items: Vec<FractionXml>,
}

#[derive(Debug, Serialize)]
struct FractionXml {
  #[serde(rename = "@Name")]
  name: String,
  #[serde(rename = "@Basis")]
  basis: String,
  #[serde(rename = "@Fraction")]
  fraction: f64,
}
