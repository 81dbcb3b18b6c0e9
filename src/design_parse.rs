//! Extracts a [Design] from model output.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, instrument};

use crate::error::GenerationError;
use crate::types::Design;

static FENCED_JSON: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?s)```json[ \t]*\r?\n(.*?)\r?\n[ \t]*```").unwrap()
});

/// Parses `raw` as a design: the whole text as a JSON object first, then the first
/// fenced ```json block.
#[instrument(level = "trace", skip(raw))]
pub fn parse_design_response(raw: &str) -> Result<Design, GenerationError> {
  let trimmed = raw.trim();
  if trimmed.starts_with('{') {
    match serde_json::from_str::<Design>(trimmed) {
      Ok(design) => return Ok(design),
      Err(e) => debug!(error = %e, "whole response is not a design document"),
    }
  }

  let Some(block) = FENCED_JSON.captures(raw).and_then(|c| c.get(1)) else {
    return Err(GenerationError::Unparseable {
      raw: raw.to_string(),
      reason: "no JSON document or fenced json block found".to_string(),
    });
  };
  serde_json::from_str::<Design>(block.as_str()).map_err(|e| GenerationError::Unparseable {
    raw: raw.to_string(),
    reason: e.to_string(),
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn whole_text_json() {
    let d = parse_design_response(r#"  {"process_name": "Cracker", "unit_operations": []} "#)
      .unwrap();
    assert_eq!(d.process_name, "Cracker");
  }

  #[test]
  fn fenced_block() {
    let raw = "Here is the design:\n```json\n{\"process_name\": \"Cracker\",\n \"streams\": []}\n```\nThanks.";
    let d = parse_design_response(raw).unwrap();
    assert_eq!(d.process_name, "Cracker");
  }

  #[test]
  fn first_fenced_block_wins() {
    let raw = "```json\n{\"process_name\": \"A\"}\n```\n```json\n{\"process_name\": \"B\"}\n```";
    assert_eq!(parse_design_response(raw).unwrap().process_name, "A");
  }

  #[test]
  fn prose_is_unparseable_and_keeps_raw() {
    let err = parse_design_response("I would use a cracker and a column.").unwrap_err();
    assert_eq!(err.raw_response(), Some("I would use a cracker and a column."));
  }

  #[test]
  fn broken_fenced_json_is_unparseable() {
    let raw = "```json\n{\"process_name\": \n```";
    assert!(matches!(
      parse_design_response(raw),
      Err(GenerationError::Unparseable { .. })
    ));
  }
}
