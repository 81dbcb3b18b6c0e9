//! Prompt text sent to the design generator.
//!
//! Kept apart from [Feedback]: the typed feedback is what gets persisted, this module only
//! decides how it reads to the model.

use crate::types::{Feedback, ProductSpecs, RawMaterials};

pub const NO_FEEDBACK: &str = "No feedback available from previous iterations.";

/// Design request for `iteration` of `max_iterations`.
pub fn format_design_context(
  raw_materials: &RawMaterials,
  product_specs: &ProductSpecs,
  property_package: &str,
  iteration: u32,
  max_iterations: u32,
) -> String {
  let raw = serde_json::to_string_pretty(raw_materials).unwrap_or_default();
  let specs = serde_json::to_string_pretty(product_specs).unwrap_or_default();
  format!(
    r#"
# Chemical Process Design Task

## Raw Materials
{raw}

## Product Specifications
{specs}

## Process Design Requirements
1. Design a complete chemical process that converts the given raw materials into the specified products.
2. The process should satisfy all product specifications including purity, yield, and production rate.
3. The process must satisfy mass and energy balance constraints.
4. All unit operations must be fully specified with appropriate parameters.
5. Include material and energy streams between unit operations.
6. Specify operating conditions (temperature, pressure) for each unit.
7. Use {pkg} as the thermodynamic property package for this design.

## Iteration Information
This is iteration {iteration} of a maximum {max_iterations} iterations.

## Output Format
Please provide your process design in JSON format with the following structure:
```json
{{
  "process_name": "Name of the process",
  "description": "Brief description of the process",
  "property_package": "{pkg}",
  "unit_operations": [
    {{
      "id": "unit-1",
      "name": "Descriptive name",
      "type": "reactor/distillation/heat-exchanger/etc.",
      "specifications": {{
        // Unit-specific parameters
      }},
      "operating_conditions": {{
        "temperature": value,
        "temperature_unit": "C/K/F",
        "pressure": value,
        "pressure_unit": "kPa/bar/psi",
        "additional_parameters": {{}}
      }}
    }}
  ],
  "streams": [
    {{
      "id": "stream-1",
      "name": "Descriptive name",
      "type": "feed/intermediate/product/utility",
      "source": "unit-id or 'feed'",
      "destination": "unit-id or 'product'",
      "specifications": {{
        "phase": "liquid/gas/mixed",
        "temperature": value,
        "temperature_unit": "C/K/F",
        "pressure": value,
        "pressure_unit": "kPa/bar/psi",
        "flow_rate": value,
        "flow_rate_unit": "kmol/h or kg/h",
        "composition": [
          {{
            "component": "component name or formula",
            "fraction": value,
            "fraction_type": "mole/mass"
          }}
        ]
      }}
    }}
  ],
  "rationale": "Explanation of design choices and expected performance"
}}
```

Please provide your detailed process design now.
"#,
    pkg = property_package,
  )
}

/// Feedback section for the iteration after `previous_iteration`.
pub fn format_feedback_context(previous_iteration: u32, feedback: Option<&Feedback>) -> String {
  let Some(feedback) = feedback else {
    return NO_FEEDBACK.to_string();
  };
  let message = if feedback.message.is_empty() {
    "No specific issues found."
  } else {
    feedback.message.as_str()
  };
  let mut out = format!(
    "\n## Feedback from Previous Iteration (Iteration {})\n\n### Status: {}\n\n### Issues Found:\n{}\n\n### Specific Feedback:\n",
    previous_iteration, feedback.status, message
  );
  push_list(&mut out, "\n#### Constraint Issues:\n", &feedback.constraint_issues);
  push_list(
    &mut out,
    "\n#### Product Specification Issues:\n",
    &feedback.product_issues,
  );
  push_list(&mut out, "\n### Improvement Suggestions:\n", &feedback.suggestions);
  out
}

fn push_list(out: &mut String, heading: &str, items: &[String]) {
  if items.is_empty() {
    return;
  }
  out.push_str(heading);
  for item in items {
    out.push_str("- ");
    out.push_str(item);
    out.push('\n');
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::types::{FeedbackStatus, ProductSpec, RawMaterial};

  fn inputs() -> (RawMaterials, ProductSpecs) {
    (
      RawMaterials {
        materials: vec![RawMaterial {
          name: "Ethane".to_string(),
          formula: "C2H6".to_string(),
          amount: 1000.0,
          unit: "kg/h".to_string(),
          state: "gas".to_string(),
        }],
      },
      ProductSpecs {
        products: vec![ProductSpec::new("Ethylene", "C2H4", 0.99, 0.9, 100.0, "kg/h")],
      },
    )
  }

  #[test]
  fn design_context_carries_inputs_and_iteration() {
    let (raw, specs) = inputs();
    let ctx = format_design_context(&raw, &specs, "Peng-Robinson", 2, 5);
    assert!(ctx.contains("\"formula\": \"C2H6\""));
    assert!(ctx.contains("\"min_purity\": 0.99"));
    assert!(ctx.contains("Use Peng-Robinson as the thermodynamic property package"));
    assert!(ctx.contains("\"property_package\": \"Peng-Robinson\""));
    assert!(ctx.contains("This is iteration 2 of a maximum 5 iterations."));
    assert!(ctx.contains("```json\n{\n  \"process_name\""));
  }

  #[test]
  fn missing_feedback_is_tolerated() {
    assert_eq!(format_feedback_context(3, None), NO_FEEDBACK);
  }

  #[test]
  fn feedback_sections_only_when_present() {
    let mut fb = Feedback::new(FeedbackStatus::ConstraintViolation, "violates");
    fb.constraint_issues.push("Mass balance error: 10.00%".to_string());
    fb.suggestions.push("Adjust flow rates".to_string());
    let text = format_feedback_context(1, Some(&fb));
    assert!(text.contains("(Iteration 1)"));
    assert!(text.contains("### Status: constraint_violation"));
    assert!(text.contains("#### Constraint Issues:\n- Mass balance error: 10.00%\n"));
    assert!(!text.contains("Product Specification Issues"));
    assert!(text.contains("### Improvement Suggestions:\n- Adjust flow rates\n"));
  }

  #[test]
  fn empty_message_falls_back() {
    let fb = Feedback::new(FeedbackStatus::Error, "");
    assert!(format_feedback_context(4, Some(&fb)).contains("No specific issues found."));
  }
}
