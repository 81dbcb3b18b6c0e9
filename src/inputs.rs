//! Loading and validation of the raw-material and product-spec documents.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::{info, instrument};

use crate::error::InputError;
use crate::types::{ProductSpecs, RawMaterials};

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, InputError> {
  let text = fs::read_to_string(path).map_err(|source| InputError::Read {
    path: path.to_path_buf(),
    source,
  })?;
  serde_json::from_str(&text).map_err(|source| InputError::Parse {
    path: path.to_path_buf(),
    source,
  })
}

#[instrument(level = "trace")]
pub fn load_raw_materials(path: &Path) -> Result<RawMaterials, InputError> {
  let raw: RawMaterials = load_json(path)?;
  validate_raw_materials(&raw)?;
  info!(count = raw.materials.len(), "loaded raw materials");
  Ok(raw)
}

#[instrument(level = "trace")]
pub fn load_product_specs(path: &Path) -> Result<ProductSpecs, InputError> {
  let specs: ProductSpecs = load_json(path)?;
  validate_product_specs(&specs)?;
  info!(count = specs.products.len(), "loaded product specifications");
  Ok(specs)
}

pub fn validate_raw_materials(raw: &RawMaterials) -> Result<(), InputError> {
  if raw.materials.is_empty() {
    return Err(InputError::Invalid("no raw materials given".to_string()));
  }
  for (i, m) in raw.materials.iter().enumerate() {
    if m.name.trim().is_empty() {
      return Err(InputError::Invalid(format!("material {} has no name", i)));
    }
    if !m.amount.is_finite() || m.amount < 0.0 {
      return Err(InputError::Invalid(format!(
        "material {} ({}) has invalid amount {}",
        i, m.name, m.amount
      )));
    }
  }
  Ok(())
}

pub fn validate_product_specs(specs: &ProductSpecs) -> Result<(), InputError> {
  for (i, p) in specs.products.iter().enumerate() {
    if p.name.trim().is_empty() {
      return Err(InputError::Invalid(format!("product {} has no name", i)));
    }
    let fraction = |v: f64| v.is_finite() && (0.0..=1.0).contains(&v);
    if !fraction(p.min_purity) {
      return Err(InputError::Invalid(format!(
        "product {} ({}) min_purity {} is not in [0, 1]",
        i, p.name, p.min_purity
      )));
    }
    if !fraction(p.min_yield) {
      return Err(InputError::Invalid(format!(
        "product {} ({}) min_yield {} is not in [0, 1]",
        i, p.name, p.min_yield
      )));
    }
    if !p.target_production_rate.is_finite() || p.target_production_rate < 0.0 {
      return Err(InputError::Invalid(format!(
        "product {} ({}) has invalid target_production_rate {}",
        i, p.name, p.target_production_rate
      )));
    }
  }
  Ok(())
}
