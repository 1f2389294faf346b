//! Finalization: the deterministic requirement summary.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::state::{ControlSignal, ConversationState};

/// `primary_use` -> `Primary Use`
pub fn humanize_key(key: &str) -> String {
    key.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Checklist keys that have values, essential then optional, with their values
pub fn ordered_requirements(state: &ConversationState) -> Vec<(String, String)> {
    let extracted = state.extracted_requirements();
    state
        .checklist_keys()
        .filter_map(|key| extracted.get(key).map(|v| (key.to_string(), v.clone())))
        .collect()
}

/// Render the summary message for a state whose checklist exists
pub fn render_summary(state: &ConversationState) -> Result<String> {
    let category = state
        .category()
        .ok_or_else(|| Error::Precondition("cannot summarize before the checklist exists".into()))?;

    let mut summary = format!(
        "Great! Your requirement for a '{}' is ready to be sent for processing. Here is the summary:\n",
        category
    );
    for (key, value) in ordered_requirements(state) {
        summary.push_str(&format!("- {}: {}\n", humanize_key(&key), value));
    }
    Ok(summary)
}

/// Append the summary and mark the conversation complete
pub fn finalize(state: &mut ConversationState) -> Result<()> {
    let summary = render_summary(state)?;
    tracing::debug!(category = ?state.category(), "conversation complete");
    state.push_system(summary);
    state.set_control_signal(ControlSignal::ConversationComplete);
    Ok(())
}

/// The record handed downstream once a conversation completes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizedRequirement {
    pub initial_query: String,
    pub category: String,
    /// Key/value pairs in checklist order
    pub requirements: Vec<(String, String)>,
    pub summary: String,
}

impl FinalizedRequirement {
    /// Build the record from a completed conversation
    pub fn from_state(state: &ConversationState) -> Result<Self> {
        if !state.is_complete() {
            return Err(Error::Precondition(
                "conversation has not been finalized".into(),
            ));
        }
        let category = state
            .category()
            .ok_or_else(|| Error::Precondition("completed state has no category".into()))?;

        Ok(Self {
            initial_query: state.initial_query().to_string(),
            category: category.to_string(),
            requirements: ordered_requirements(state),
            summary: render_summary(state)?,
        })
    }

    /// `Label: value` lines, as used when scoring vendor quotes
    pub fn finalized_items(&self) -> Vec<String> {
        self.requirements
            .iter()
            .map(|(k, v)| format!("{}: {}", humanize_key(k), v))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn laptop_state() -> ConversationState {
        let mut state = ConversationState::with_checklist(
            "I need a new laptop",
            "Laptop",
            &["primary_use", "budget"],
            &["brand", "screen_size"],
        );
        let values: BTreeMap<String, String> = [
            ("brand", "Any"),
            ("budget", "max 1500 dollars"),
            ("primary_use", "gaming"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        state.merge_requirements(values);
        state
    }

    #[test]
    fn test_humanize_key() {
        assert_eq!(humanize_key("primary_use"), "Primary Use");
        assert_eq!(humanize_key("BUDGET"), "Budget");
        assert_eq!(humanize_key("ram_gb"), "Ram Gb");
        assert_eq!(humanize_key("_screen__size_"), "Screen Size");
    }

    #[test]
    fn test_summary_format() {
        let summary = render_summary(&laptop_state()).unwrap();
        assert_eq!(
            summary,
            "Great! Your requirement for a 'Laptop' is ready to be sent for processing. \
             Here is the summary:\n\
             - Primary Use: gaming\n\
             - Budget: max 1500 dollars\n\
             - Brand: Any\n"
        );
    }

    #[test]
    fn test_summary_is_idempotent() {
        let state = laptop_state();
        assert_eq!(render_summary(&state).unwrap(), render_summary(&state).unwrap());
    }

    #[test]
    fn test_finalize_marks_complete() {
        let mut state = laptop_state();
        finalize(&mut state).unwrap();
        assert!(state.is_complete());
        assert!(state.latest_system_message().unwrap().starts_with("Great!"));
    }

    #[test]
    fn test_summary_with_no_values() {
        let state = ConversationState::with_checklist("pens", "Stationery", &[], &["color"]);
        let summary = render_summary(&state).unwrap();
        assert_eq!(summary.lines().count(), 1);
    }

    #[test]
    fn test_finalized_requirement() {
        let mut state = laptop_state();
        assert!(FinalizedRequirement::from_state(&state).is_err());

        finalize(&mut state).unwrap();
        let record = FinalizedRequirement::from_state(&state).unwrap();
        assert_eq!(record.category, "Laptop");
        assert_eq!(
            record.requirements[0],
            ("primary_use".to_string(), "gaming".to_string())
        );
        assert_eq!(
            record.finalized_items(),
            vec!["Primary Use: gaming", "Budget: max 1500 dollars", "Brand: Any"]
        );
        assert_eq!(Some(record.summary.as_str()), state.latest_system_message());
    }
}
