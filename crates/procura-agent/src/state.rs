//! Conversation state carried between turns.
//!
//! The state is owned by the caller and passed back in full on every turn.
//! Fields are read through accessors; only the workflow steps in this crate
//! mutate them, which keeps the checklist fixed once generated and the
//! extracted requirements limited to checklist keys.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::checklist::normalize_key;
use crate::error::{Error, Result};

/// Who said something in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    System,
}

/// One entry of the message log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnMessage {
    pub role: Role,
    pub content: String,
}

impl TurnMessage {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// Whether the caller should keep the conversation going
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlSignal {
    #[default]
    AwaitUserInput,
    ConversationComplete,
}

/// Category plus essential/optional keys produced by checklist generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementChecklist {
    pub category: String,
    pub essential_checklist: Vec<String>,
    #[serde(default)]
    pub optional_checklist: Vec<String>,
}

/// What a merge did to the extracted requirements
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Keys that had no value before
    pub added: Vec<String>,
    /// Keys whose value changed
    pub updated: Vec<String>,
    /// Keys that are not on either checklist
    pub discarded: Vec<String>,
}

impl MergeReport {
    /// True when the state did not change
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty()
    }
}

/// The full state of one requirement-gathering conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    initial_query: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    essential_checklist: Vec<String>,
    #[serde(default)]
    optional_checklist: Vec<String>,
    #[serde(default)]
    extracted_requirements: BTreeMap<String, String>,
    #[serde(default)]
    message_log: Vec<TurnMessage>,
    #[serde(default)]
    control_signal: ControlSignal,
}

impl ConversationState {
    /// Fresh state for a first turn: the query is the only message
    pub fn new(initial_query: impl Into<String>) -> Self {
        let initial_query = initial_query.into();
        Self {
            message_log: vec![TurnMessage::user(initial_query.clone())],
            initial_query,
            category: None,
            essential_checklist: Vec::new(),
            optional_checklist: Vec::new(),
            extracted_requirements: BTreeMap::new(),
            control_signal: ControlSignal::AwaitUserInput,
        }
    }

    pub fn initial_query(&self) -> &str {
        &self.initial_query
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn essential_checklist(&self) -> &[String] {
        &self.essential_checklist
    }

    pub fn optional_checklist(&self) -> &[String] {
        &self.optional_checklist
    }

    pub fn extracted_requirements(&self) -> &BTreeMap<String, String> {
        &self.extracted_requirements
    }

    pub fn message_log(&self) -> &[TurnMessage] {
        &self.message_log
    }

    pub fn control_signal(&self) -> ControlSignal {
        self.control_signal
    }

    /// Whether checklist generation has run for this conversation
    pub fn has_checklist(&self) -> bool {
        self.category.is_some()
    }

    pub fn is_complete(&self) -> bool {
        self.control_signal == ControlSignal::ConversationComplete
    }

    /// Essential keys first, then optional, in checklist order
    pub fn checklist_keys(&self) -> impl Iterator<Item = &str> {
        self.essential_checklist
            .iter()
            .chain(self.optional_checklist.iter())
            .map(String::as_str)
    }

    pub fn is_recognized(&self, key: &str) -> bool {
        self.checklist_keys().any(|k| k == key)
    }

    /// Essential keys with no extracted value, in checklist order
    pub fn missing_essential(&self) -> Vec<String> {
        self.essential_checklist
            .iter()
            .filter(|k| !self.extracted_requirements.contains_key(k.as_str()))
            .cloned()
            .collect()
    }

    /// Optional keys with no extracted value, in checklist order
    pub fn missing_optional(&self) -> Vec<String> {
        self.optional_checklist
            .iter()
            .filter(|k| !self.extracted_requirements.contains_key(k.as_str()))
            .cloned()
            .collect()
    }

    /// Content of the most recent user message
    pub fn latest_user_message(&self) -> Option<&str> {
        self.message_log
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }

    /// Content of the most recent system message
    pub fn latest_system_message(&self) -> Option<&str> {
        self.message_log
            .iter()
            .rev()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
    }

    /// Install the generated checklist. Fails if one is already set.
    pub(crate) fn set_checklist(&mut self, checklist: RequirementChecklist) -> Result<()> {
        if self.has_checklist() {
            return Err(Error::Precondition(
                "checklist has already been generated for this conversation".to_string(),
            ));
        }
        self.category = Some(checklist.category);
        self.essential_checklist = checklist.essential_checklist;
        self.optional_checklist = checklist.optional_checklist;
        Ok(())
    }

    /// Merge newly extracted values. Keys are normalized the same way as
    /// checklist keys. Later values win; keys that are not on the checklist
    /// are dropped.
    pub(crate) fn merge_requirements(
        &mut self,
        extracted: BTreeMap<String, String>,
    ) -> MergeReport {
        let recognized: BTreeSet<&str> = self.checklist_keys().collect();
        let mut accepted = Vec::new();
        let mut report = MergeReport::default();

        for (raw, value) in extracted {
            let key = normalize_key(&raw);
            if recognized.contains(key.as_str()) {
                accepted.push((key, value));
            } else {
                report.discarded.push(raw);
            }
        }

        for (key, value) in accepted {
            match self.extracted_requirements.get(&key) {
                Some(existing) if *existing == value => {}
                Some(_) => {
                    report.updated.push(key.clone());
                    self.extracted_requirements.insert(key, value);
                }
                None => {
                    report.added.push(key.clone());
                    self.extracted_requirements.insert(key, value);
                }
            }
        }

        report
    }

    pub(crate) fn push_user(&mut self, content: impl Into<String>) {
        self.message_log.push(TurnMessage::user(content));
    }

    pub(crate) fn push_system(&mut self, content: impl Into<String>) {
        self.message_log.push(TurnMessage::system(content));
    }

    pub(crate) fn set_control_signal(&mut self, signal: ControlSignal) {
        self.control_signal = signal;
    }

    #[cfg(test)]
    pub(crate) fn with_checklist(
        initial_query: &str,
        category: &str,
        essential: &[&str],
        optional: &[&str],
    ) -> Self {
        let mut state = Self::new(initial_query);
        state.category = Some(category.to_string());
        state.essential_checklist = essential.iter().map(|s| s.to_string()).collect();
        state.optional_checklist = optional.iter().map(|s| s.to_string()).collect();
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_new_state_starts_with_query() {
        let state = ConversationState::new("I need a laptop");
        assert_eq!(state.message_log(), &[TurnMessage::user("I need a laptop")]);
        assert_eq!(state.control_signal(), ControlSignal::AwaitUserInput);
        assert!(!state.has_checklist());
        assert_eq!(state.latest_user_message(), Some("I need a laptop"));
        assert_eq!(state.latest_system_message(), None);
    }

    #[test]
    fn test_set_checklist_only_once() {
        let mut state = ConversationState::new("I need a laptop");
        let checklist = RequirementChecklist {
            category: "Laptop".into(),
            essential_checklist: vec!["use_case".into()],
            optional_checklist: vec![],
        };
        state.set_checklist(checklist.clone()).unwrap();
        assert_eq!(state.category(), Some("Laptop"));

        let err = state.set_checklist(checklist).unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
    }

    #[test]
    fn test_empty_essential_checklist_still_counts_as_generated() {
        let state = ConversationState::with_checklist("pens", "Stationery", &[], &["color"]);
        assert!(state.has_checklist());
        assert!(state.missing_essential().is_empty());
    }

    #[test]
    fn test_merge_last_write_wins_and_discards_unknown() {
        let mut state = ConversationState::with_checklist(
            "laptop",
            "Laptop",
            &["use_case", "budget"],
            &["brand"],
        );

        let report = state.merge_requirements(values(&[
            ("use_case", "gaming"),
            ("budget", "1500"),
            ("color", "red"),
        ]));
        assert_eq!(report.added, vec!["budget", "use_case"]);
        assert_eq!(report.discarded, vec!["color"]);

        let report = state.merge_requirements(values(&[("budget", "2000"), ("brand", "any")]));
        assert_eq!(report.added, vec!["brand"]);
        assert_eq!(report.updated, vec!["budget"]);
        assert_eq!(state.extracted_requirements()["budget"], "2000");
        assert!(!state.extracted_requirements().contains_key("color"));
    }

    #[test]
    fn test_merge_normalizes_keys() {
        let mut state =
            ConversationState::with_checklist("laptop", "Laptop", &["use_case", "budget"], &[]);
        let report =
            state.merge_requirements(values(&[("use-case", "gaming"), (" BUDGET ", "1500")]));
        assert!(report.discarded.is_empty());
        assert_eq!(state.extracted_requirements()["use_case"], "gaming");
        assert_eq!(state.extracted_requirements()["budget"], "1500");
        assert!(state.missing_essential().is_empty());
    }

    #[test]
    fn test_merge_never_removes_keys() {
        let mut state =
            ConversationState::with_checklist("laptop", "Laptop", &["use_case", "budget"], &[]);
        state.merge_requirements(values(&[("use_case", "gaming")]));
        let report = state.merge_requirements(BTreeMap::new());
        assert!(report.is_noop());
        assert_eq!(state.extracted_requirements()["use_case"], "gaming");
    }

    #[test]
    fn test_missing_essential_in_checklist_order() {
        let mut state = ConversationState::with_checklist(
            "laptop",
            "Laptop",
            &["use_case", "budget", "screen_size"],
            &["brand"],
        );
        state.merge_requirements(values(&[("budget", "1500")]));
        assert_eq!(state.missing_essential(), vec!["use_case", "screen_size"]);
        assert_eq!(state.missing_optional(), vec!["brand"]);
    }

    #[test]
    fn test_latest_messages_by_role() {
        let mut state = ConversationState::new("laptop");
        state.push_system("What will you use it for?");
        state.push_user("gaming");
        state.push_system("What's your budget?");
        assert_eq!(state.latest_user_message(), Some("gaming"));
        assert_eq!(state.latest_system_message(), Some("What's your budget?"));
    }

    #[test]
    fn test_serialized_shape() {
        let mut state =
            ConversationState::with_checklist("laptop", "Laptop", &["use_case"], &["brand"]);
        state.set_control_signal(ControlSignal::ConversationComplete);

        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["control_signal"], "conversation_complete");
        assert_eq!(value["category"], "Laptop");
        assert_eq!(value["message_log"][0], json!({"role": "user", "content": "laptop"}));

        let back: ConversationState = serde_json::from_value(value).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_deserialize_minimal_state() {
        let state: ConversationState =
            serde_json::from_value(json!({"initial_query": "chairs"})).unwrap();
        assert!(!state.has_checklist());
        assert!(state.message_log().is_empty());
        assert_eq!(state.control_signal(), ControlSignal::AwaitUserInput);
    }
}
