//! Checklist generation: classify the request and decide what to ask for.

use std::collections::HashSet;

use procura_ai::OutputSchema;
use serde_json::json;

use crate::completion::{Completion, complete_as};
use crate::error::{Error, Result};
use crate::state::{ConversationState, RequirementChecklist};

/// Schema the checklist reply must match
pub fn checklist_schema() -> OutputSchema {
    OutputSchema::new(
        "requirement_checklist",
        json!({
            "type": "object",
            "properties": {
                "category": {
                    "type": "string",
                    "minLength": 1,
                    "description": "The general category of the item, e.g. 'Car', 'Laptop'"
                },
                "essential_checklist": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Attributes that must be known before the request can proceed, in snake_case"
                },
                "optional_checklist": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Nice-to-have attributes, in snake_case"
                }
            },
            "required": ["category", "essential_checklist", "optional_checklist"]
        }),
    )
}

/// Prompt asking for the category and both attribute lists
pub fn checklist_prompt(initial_query: &str) -> String {
    format!(
        "The user wants to buy an item. Here is their request: '{}'.\n\
         What is the category of this item? What is the checklist of absolutely essential \
         requirements I must ask for before the request can be processed? And what is a \
         checklist of optional, nice-to-have requirements?\n\
         For a car, essentials might be car_type and price_range, and optionals make, model \
         and color. Use short snake_case keys.",
        initial_query
    )
}

/// Lowercase snake_case form of a checklist key
pub fn normalize_key(raw: &str) -> String {
    let mut key = String::with_capacity(raw.len());
    for c in raw.trim().chars() {
        if c.is_alphanumeric() {
            key.extend(c.to_lowercase());
        } else if !key.is_empty() && !key.ends_with('_') {
            key.push('_');
        }
    }
    key.trim_end_matches('_').to_string()
}

impl RequirementChecklist {
    /// Normalize keys, drop duplicates and keep shared keys essential only
    pub fn normalized(self) -> Self {
        let mut seen = HashSet::new();
        let mut dedup = |keys: Vec<String>| -> Vec<String> {
            keys.iter()
                .map(|k| normalize_key(k))
                .filter(|k| !k.is_empty() && seen.insert(k.clone()))
                .collect()
        };

        let essential_checklist = dedup(self.essential_checklist);
        let optional_checklist = dedup(self.optional_checklist);

        Self {
            category: self.category.trim().to_string(),
            essential_checklist,
            optional_checklist,
        }
    }
}

/// Generate the checklist for a fresh conversation and install it in `state`.
pub async fn generate_checklist(
    completion: &dyn Completion,
    state: &mut ConversationState,
) -> Result<()> {
    if state.has_checklist() {
        return Err(Error::Precondition(
            "checklist has already been generated for this conversation".to_string(),
        ));
    }

    let prompt = checklist_prompt(state.initial_query());
    let checklist: RequirementChecklist =
        complete_as(completion, &prompt, &checklist_schema()).await?;
    let checklist = checklist.normalized();

    if checklist.category.is_empty() {
        return Err(Error::SchemaViolation(
            "checklist reply has an empty category".to_string(),
        ));
    }

    tracing::debug!(
        category = %checklist.category,
        essential = checklist.essential_checklist.len(),
        optional = checklist.optional_checklist.len(),
        "generated checklist"
    );

    let note = format!(
        "Generated checklist for {}. Essentials: [{}].",
        checklist.category,
        checklist.essential_checklist.join(", ")
    );
    state.set_checklist(checklist)?;
    state.push_system(note);
    Ok(())
}
