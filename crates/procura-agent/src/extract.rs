//! Best-effort extraction of a JSON object from free-form model output.

use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;

/// Why a reply produced no extraction
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("no JSON object found in reply")]
    NoObject,

    #[error("malformed JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// The substring from the first `{` to the last `}` inclusive, if both exist
/// in that order.
pub fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&raw[start..=end])
}

/// Decode a model reply into flat key/value requirement pairs.
///
/// Strings are kept as-is, numbers and booleans are stringified, arrays are
/// joined with `", "` and nested objects become JSON text. `null` and blank
/// values carry no information and are skipped.
pub fn extract_requirements(raw: &str) -> Result<BTreeMap<String, String>, ExtractError> {
    let candidate = extract_json_object(raw).ok_or(ExtractError::NoObject)?;
    let map: serde_json::Map<String, Value> = serde_json::from_str(candidate)?;

    Ok(map
        .into_iter()
        .filter_map(|(key, value)| {
            let key = key.trim().to_string();
            if key.is_empty() {
                return None;
            }
            value_to_text(&value).map(|text| (key, text))
        })
        .collect())
}

/// Render a JSON value as requirement text. `None` for values that say nothing.
pub fn value_to_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::String(s) => s.trim().to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(value_to_text)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => value.to_string(),
    };

    (!text.is_empty()).then_some(text)
}
