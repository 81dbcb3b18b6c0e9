//! Unit conversion for temperatures, pressures and flows.

use tracing::warn;

/// Rough molar mass (kg/kmol) used for kmol/h <-> kg/h when no molecular weight is known.
const NOMINAL_MOLAR_MASS: f64 = 20.0;

/// Canonical spelling of a unit name (`°C` and `c` become `C`, `kg/hr` becomes `kg/h`).
fn canonical(unit: &str) -> &str {
  let u = unit.trim().trim_start_matches('°');
  match u.to_ascii_lowercase().as_str() {
    "c" | "degc" | "celsius" => "C",
    "k" | "kelvin" => "K",
    "f" | "degf" | "fahrenheit" => "F",
    "pa" => "Pa",
    "kpa" => "kPa",
    "bar" => "bar",
    "psi" | "psia" => "psi",
    "kg/h" | "kg/hr" => "kg/h",
    "kmol/h" | "kmol/hr" => "kmol/h",
    _ => u,
  }
}

/// Converts `value` from `from` to `to` (`C`, `K`, `F`, `Pa`, `kPa`, `bar`, `psi`,
/// `kg/h`, `kmol/h`; common spellings accepted).
pub fn convert(value: f64, from: &str, to: &str) -> Result<f64, String> {
  let (from, to) = (canonical(from), canonical(to));
  if from == to {
    return Ok(value);
  }
  let v = match (from, to) {
    ("C", "K") => value + 273.15,
    ("K", "C") => value - 273.15,
    ("F", "K") => (value + 459.67) * 5.0 / 9.0,
    ("K", "F") => value * 9.0 / 5.0 - 459.67,
    ("F", "C") => (value - 32.0) * 5.0 / 9.0,
    ("C", "F") => value * 9.0 / 5.0 + 32.0,

    ("kPa", "bar") => value / 100.0,
    ("bar", "kPa") => value * 100.0,
    ("psi", "kPa") => value * 6.89476,
    ("kPa", "psi") => value / 6.89476,
    ("bar", "psi") => value * 14.5038,
    ("psi", "bar") => value / 14.5038,
    ("Pa", "kPa") => value / 1000.0,
    ("kPa", "Pa") => value * 1000.0,
    ("Pa", "bar") => value / 100_000.0,
    ("bar", "Pa") => value * 100_000.0,
    ("psi", "Pa") => value * 6894.76,
    ("Pa", "psi") => value / 6894.76,

    ("kmol/h", "kg/h") => {
      warn!("converting kmol/h to kg/h without a molecular weight");
      value * NOMINAL_MOLAR_MASS
    }
    ("kg/h", "kmol/h") => {
      warn!("converting kg/h to kmol/h without a molecular weight");
      value / NOMINAL_MOLAR_MASS
    }
    _ => return Err(format!("unsupported unit conversion: {} to {}", from, to)),
  };
  Ok(v)
}
