//! Constraint and product-specification checks on a simulation result.
//!
//! Pure functions: the same result, specs and tolerances always give the same
//! [Evaluation]. An absent result is not an error here; it evaluates to unsatisfied
//! balances with sentinel errors and unmet products.

use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use crate::types::{
  BALANCE_ERROR_SENTINEL, ConstraintResult, Evaluation, IssueKind, ProductEvaluation, ProductIssue,
  ProductResult, ProductSpec, ProductSpecs, SimulationResult, StreamState,
};
use crate::units;

/// Closeness weights for the normalized product score.
const PURITY_WEIGHT: f64 = 0.4;
const YIELD_WEIGHT: f64 = 0.3;
const RATE_WEIGHT: f64 = 0.3;
/// Highest normalized score a product with any issue can get.
const UNMET_SCORE_CAP: f64 = 0.99;

/// Flow unit assumed when the simulator does not report one.
const DEFAULT_FLOW_UNIT: &str = "kg/h";

/// Acceptance thresholds. Balance tolerances are in percent; purity and yield
/// tolerances are absolute fractions; rate and condition tolerances are relative to target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerances {
  pub mass_balance_tolerance: f64,
  pub energy_balance_tolerance: f64,
  pub purity_tolerance: f64,
  pub yield_tolerance: f64,
  pub production_rate_tolerance: f64,
  /// Relative tolerance on product delivery temperature/pressure. Delivery conditions
  /// are only checked when this is set.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub conditions_tolerance: Option<f64>,
}

/// Runs both checks.
#[instrument(level = "trace", skip(result, specs))]
pub fn evaluate(
  result: Option<&SimulationResult>,
  specs: &ProductSpecs,
  tolerances: &Tolerances,
) -> Evaluation {
  Evaluation {
    constraint_check: check_constraints(result, tolerances),
    product_evaluation: evaluate_products(result, specs, tolerances),
  }
}

/// Relative balance error in percent; None when the input side is zero or the totals
/// are not finite numbers.
fn balance_error_pct(input: f64, output: f64) -> Option<f64> {
  if !input.is_finite() || !output.is_finite() || input <= 0.0 {
    return None;
  }
  Some((input - output).abs() / input * 100.0)
}

/// Mass and energy balance verdict.
#[instrument(level = "trace", skip(result))]
pub fn check_constraints(
  result: Option<&SimulationResult>,
  tolerances: &Tolerances,
) -> ConstraintResult {
  let Some(result) = result else {
    return ConstraintResult::unavailable();
  };

  let (mass_balance_satisfied, mass_balance_error_pct) = match result.mass_totals() {
    Some(mb) => match balance_error_pct(mb.total_input_mass, mb.total_output_mass) {
      Some(err) => (err <= tolerances.mass_balance_tolerance, err),
      None => (false, BALANCE_ERROR_SENTINEL),
    },
    None => {
      warn!("simulation result has no mass totals");
      (false, BALANCE_ERROR_SENTINEL)
    }
  };

  // Heating and cooling duties stand in for energy in/out. A flowsheet with no duties
  // at all has nothing to balance.
  let (energy_balance_satisfied, energy_balance_error_pct) = match result.energy_totals() {
    Some(eb) if eb.total_energy_in == 0.0 && eb.total_energy_out == 0.0 => (true, 0.0),
    Some(eb) => match balance_error_pct(eb.total_energy_in, eb.total_energy_out) {
      Some(err) => (err <= tolerances.energy_balance_tolerance, err),
      None => (false, BALANCE_ERROR_SENTINEL),
    },
    None => {
      warn!("simulation result has no energy totals");
      (false, BALANCE_ERROR_SENTINEL)
    }
  };

  ConstraintResult {
    mass_balance_satisfied,
    mass_balance_error_pct,
    energy_balance_satisfied,
    energy_balance_error_pct,
  }
}

/// Per-product purity / yield / rate verdicts in spec order.
#[instrument(level = "trace", skip(result, specs))]
pub fn evaluate_products(
  result: Option<&SimulationResult>,
  specs: &ProductSpecs,
  tolerances: &Tolerances,
) -> ProductEvaluation {
  let products: Vec<ProductResult> = specs
    .products
    .iter()
    .map(|spec| evaluate_product(result, spec, tolerances))
    .collect();
  ProductEvaluation {
    all_specifications_met: products.iter().all(|p| p.specifications_met),
    products,
  }
}

/// Finds the outlet stream carrying `spec`: one named after the product first, otherwise
/// the outlet with the highest fraction of the product component.
pub(crate) fn match_outlet<'a>(
  result: &'a SimulationResult,
  spec: &ProductSpec,
) -> Option<(&'a str, &'a StreamState)> {
  let named = |key: &str, s: &StreamState| {
    [key, s.name.as_str()].iter().any(|n| {
      n.eq_ignore_ascii_case(&spec.name)
        || (!spec.formula.is_empty() && n.eq_ignore_ascii_case(&spec.formula))
    })
  };
  if let Some((key, s)) = result.outlet_streams().find(|(k, s)| named(k, s)) {
    return Some((key.as_str(), s));
  }
  result
    .outlet_streams()
    .filter_map(|(k, s)| {
      let frac = component_fraction(s, spec)?;
      Some((k.as_str(), s, frac))
    })
    .filter(|(_, _, frac)| *frac > 0.0)
    .max_by(|a, b| a.2.total_cmp(&b.2))
    .map(|(k, s, _)| (k, s))
}

/// Mole fraction of the product component, mass fraction if moles are not reported.
fn component_fraction(stream: &StreamState, spec: &ProductSpec) -> Option<f64> {
  let c = stream.component(&spec.name, &spec.formula)?;
  c.mole_fraction.or(c.mass_fraction)
}

/// Flow of the product component in `stream`, in the stream's flow unit.
fn component_flow(stream: &StreamState, spec: &ProductSpec) -> f64 {
  let Some(c) = stream.component(&spec.name, &spec.formula) else {
    return 0.0;
  };
  c.mass_flow
    .or_else(|| c.mass_fraction.map(|f| f * stream.total_flow))
    .or_else(|| c.mole_fraction.map(|f| f * stream.total_flow))
    .unwrap_or(0.0)
}

fn flow_unit(stream: &StreamState) -> &str {
  if stream.flow_unit.is_empty() {
    DEFAULT_FLOW_UNIT
  } else {
    &stream.flow_unit
  }
}

/// Closeness to a lower-bound target in [0, 1].
fn closeness_at_least(actual: f64, target: f64, met: bool) -> f64 {
  if met || target <= 0.0 {
    return 1.0;
  }
  (actual / target).clamp(0.0, 1.0)
}

/// Closeness to a point target in [0, 1].
fn closeness_to(actual: f64, target: f64, met: bool) -> f64 {
  if met {
    return 1.0;
  }
  if target <= 0.0 {
    return 0.0;
  }
  (1.0 - (actual - target).abs() / target).clamp(0.0, 1.0)
}

fn not_found(spec: &ProductSpec, detail: &str) -> ProductResult {
  ProductResult {
    name: spec.name.clone(),
    stream: None,
    target_purity: spec.min_purity,
    actual_purity: None,
    target_yield: spec.min_yield,
    actual_yield: None,
    target_production_rate: spec.target_production_rate,
    actual_production_rate: None,
    production_rate_unit: spec.unit.clone(),
    specifications_met: false,
    score: 0.0,
    issues: vec![ProductIssue {
      kind: IssueKind::NotFound,
      detail: detail.to_string(),
    }],
  }
}

fn evaluate_product(
  result: Option<&SimulationResult>,
  spec: &ProductSpec,
  tol: &Tolerances,
) -> ProductResult {
  let Some(result) = result else {
    return not_found(spec, "not found: no simulation result");
  };
  let Some((stream_id, stream)) = match_outlet(result, spec) else {
    return not_found(spec, "not found: no outlet stream carries this product");
  };

  let purity = component_fraction(stream, spec).unwrap_or(0.0);
  let in_stream = component_flow(stream, spec);
  let leaving: f64 = result
    .outlet_streams()
    .map(|(_, s)| component_flow(s, spec))
    .sum();
  let product_yield = if leaving > 0.0 {
    in_stream / leaving
  } else {
    0.0
  };
  let rate = match units::convert(in_stream, flow_unit(stream), &spec.unit) {
    Ok(r) => r,
    Err(e) => {
      warn!(product = %spec.name, error = %e, "production rate compared without conversion");
      in_stream
    }
  };

  let purity_met = purity >= spec.min_purity - tol.purity_tolerance;
  let yield_met = product_yield >= spec.min_yield - tol.yield_tolerance;
  let target = spec.target_production_rate;
  let rate_met = (rate - target).abs() <= tol.production_rate_tolerance * target.abs();

  let mut issues = Vec::new();
  if !purity_met {
    issues.push(ProductIssue {
      kind: IssueKind::Purity,
      detail: format!("actual {:.4} below target {:.4}", purity, spec.min_purity),
    });
  }
  if !yield_met {
    issues.push(ProductIssue {
      kind: IssueKind::Yield,
      detail: format!("actual {:.4} below target {:.4}", product_yield, spec.min_yield),
    });
  }
  if !rate_met {
    issues.push(ProductIssue {
      kind: IssueKind::ProductionRate,
      detail: format!(
        "actual {:.2} {} vs target {:.2} {}",
        rate, spec.unit, target, spec.unit
      ),
    });
  }
  let mut conditions = 1.0;
  if let Some(rel) = tol.conditions_tolerance {
    let check = check_conditions(stream, spec, rel);
    conditions = check.closeness;
    issues.extend(check.issues);
  }

  let mut score = ((PURITY_WEIGHT * closeness_at_least(purity, spec.min_purity, purity_met)
    + YIELD_WEIGHT * closeness_at_least(product_yield, spec.min_yield, yield_met)
    + RATE_WEIGHT * closeness_to(rate, target, rate_met))
    * conditions)
    .clamp(0.0, 1.0);
  // An unmet product never reaches the full score.
  if !issues.is_empty() {
    score = score.min(UNMET_SCORE_CAP);
  }

  ProductResult {
    name: spec.name.clone(),
    stream: Some(stream_id.to_string()),
    target_purity: spec.min_purity,
    actual_purity: Some(purity),
    target_yield: spec.min_yield,
    actual_yield: Some(product_yield),
    target_production_rate: target,
    actual_production_rate: Some(rate),
    production_rate_unit: spec.unit.clone(),
    specifications_met: issues.is_empty(),
    score,
    issues,
  }
}

struct ConditionCheck {
  issues: Vec<ProductIssue>,
  /// Mean closeness of the declared conditions, 1.0 when none are declared.
  closeness: f64,
}

/// Delivery temperature / pressure checks for products that declare them.
fn check_conditions(stream: &StreamState, spec: &ProductSpec, rel: f64) -> ConditionCheck {
  let mut issues = Vec::new();
  let mut closeness = Vec::new();
  let checks = [
    (
      IssueKind::Temperature,
      spec.temperature,
      spec.temperature_unit.as_deref().unwrap_or("K"),
      stream.temperature,
      stream.temperature_unit.as_str(),
    ),
    (
      IssueKind::Pressure,
      spec.pressure,
      spec.pressure_unit.as_deref().unwrap_or("Pa"),
      stream.pressure,
      stream.pressure_unit.as_str(),
    ),
  ];
  for (kind, target, target_unit, actual, actual_unit) in checks {
    let Some(target) = target else { continue };
    let actual_unit = if actual_unit.is_empty() {
      target_unit
    } else {
      actual_unit
    };
    let actual = match units::convert(actual, actual_unit, target_unit) {
      Ok(v) => v,
      Err(e) => {
        warn!(product = %spec.name, error = %e, "delivery condition not comparable");
        continue;
      }
    };
    let met = (actual - target).abs() <= rel * target.abs();
    closeness.push(closeness_to(actual, target, met));
    if !met {
      issues.push(ProductIssue {
        kind,
        detail: format!(
          "actual {:.2} {} vs target {:.2} {}",
          actual, target_unit, target, target_unit
        ),
      });
    }
  }
  let closeness = if closeness.is_empty() {
    1.0
  } else {
    closeness.iter().sum::<f64>() / closeness.len() as f64
  };
  ConditionCheck { issues, closeness }
}
