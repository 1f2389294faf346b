//! Validation of structured (schema-constrained) model output

use crate::{Error, OutputSchema, Result};

/// Decode a structured reply and check it against its schema.
///
/// Providers that enforce a schema natively still occasionally return text
/// around the JSON or drop required fields, so the reply is validated here
/// rather than trusted.
pub fn decode_structured(text: &str, schema: &OutputSchema) -> Result<serde_json::Value> {
    let value = parse_json_reply(text).ok_or_else(|| {
        Error::SchemaViolation(format!(
            "response for '{}' is not valid JSON: {}",
            schema.name,
            preview(text)
        ))
    })?;
    validate(&value, schema)?;
    Ok(value)
}

/// Validate a JSON value against an output schema
pub fn validate(value: &serde_json::Value, schema: &OutputSchema) -> Result<()> {
    let validator = jsonschema::validator_for(&schema.schema).map_err(|e| {
        Error::InvalidConfig(format!("invalid output schema '{}': {}", schema.name, e))
    })?;

    let errors: Vec<String> = validator
        .iter_errors(value)
        .map(|e| {
            let path = e.instance_path.to_string();
            if path.is_empty() {
                e.to_string()
            } else {
                format!("{}: {}", path, e)
            }
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(Error::SchemaViolation(format!(
            "'{}' failed validation:\n{}",
            schema.name,
            errors.join("\n")
        )))
    }
}

/// Parse a reply that should be JSON, tolerating a markdown code fence.
fn parse_json_reply(text: &str) -> Option<serde_json::Value> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }

    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))?
        .strip_suffix("```")?;
    serde_json::from_str(unfenced.trim()).ok()
}

fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(120).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
