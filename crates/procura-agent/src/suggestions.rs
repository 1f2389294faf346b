//! Line-item suggestions for an RFQ, generated from the buyer's request.

use std::collections::HashSet;

use procura_ai::OutputSchema;
use serde::Deserialize;
use serde_json::json;

use crate::completion::{Completion, complete_as};
use crate::error::{Error, Result};

#[derive(Debug, Deserialize)]
struct Suggestions {
    suggestions: Vec<String>,
}

pub fn suggestions_schema() -> OutputSchema {
    OutputSchema::new(
        "line_item_suggestions",
        json!({
            "type": "object",
            "properties": {
                "suggestions": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Suggested items or services, e.g. 'Delivery & Setup', 'On-site Technician'"
                }
            },
            "required": ["suggestions"]
        }),
    )
}

pub fn suggestions_prompt(initial_query: &str) -> String {
    format!(
        "Based on '{}', suggest specific line items for a procurement request. Include \
         related services (delivery, installation, support) where they make sense.",
        initial_query
    )
}

/// Suggest line items for a request. Blank and repeated entries are dropped.
pub async fn generate_suggestions(
    completion: &dyn Completion,
    initial_query: &str,
) -> Result<Vec<String>> {
    let initial_query = initial_query.trim();
    if initial_query.is_empty() {
        return Err(Error::Precondition("initial query is empty".into()));
    }

    let reply: Suggestions = complete_as(
        completion,
        &suggestions_prompt(initial_query),
        &suggestions_schema(),
    )
    .await?;

    let mut seen = HashSet::new();
    let suggestions: Vec<String> = reply
        .suggestions
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && seen.insert(s.to_lowercase()))
        .collect();

    tracing::debug!(count = suggestions.len(), "generated line-item suggestions");
    Ok(suggestions)
}
