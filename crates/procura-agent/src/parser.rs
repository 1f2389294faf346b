//! Response parsing: pull requirement values out of the latest user message.
//!
//! Parsing never fails a turn. A reply that cannot be decoded, or a
//! completion error, leaves the state as it was and the router simply asks
//! again.

use crate::completion::Completion;
use crate::error::{Error, Result};
use crate::extract::extract_requirements;
use crate::state::{ConversationState, MergeReport};

/// Result of one parse step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    /// Values were decoded and merged
    Merged(MergeReport),
    /// Nothing usable came back; state is unchanged
    NoExtraction(String),
}

/// Extraction prompt for one user message
pub fn parse_prompt(category: &str, keys: &[&str], latest_message: &str) -> String {
    format!(
        r#"You are a data extraction assistant. Your sole job is to extract information from the user's message and return it as a JSON object.
The user wants to buy a: {category}.
The fields you must look for are: {fields}.
Only include a field when the message lets you infer it with confidence.
--- EXAMPLES ---
User Message: "I need a family-friendly SUV, maybe for around 30 lakhs"
Your JSON Output: {{"car_type": "SUV", "price_range": "around 30 lakhs"}}
User Message: "I want a gaming laptop under $1500. Not sure about the brand, any is fine."
Your JSON Output: {{"primary_use": "gaming", "budget": "under $1500", "brand": "Any"}}
--- END OF EXAMPLES ---
Now, perform the same task. The user's latest message is: "{latest_message}"
Return ONLY the JSON object. Do not wrap it in markdown."#,
        fields = keys.join(", "),
    )
}

/// Parse the most recent user message and merge what it says into `state`.
pub async fn parse_latest_reply(
    completion: &dyn Completion,
    state: &mut ConversationState,
) -> Result<ParseOutcome> {
    let category = state
        .category()
        .ok_or_else(|| Error::Precondition("cannot parse before the checklist exists".into()))?;
    let latest = state
        .latest_user_message()
        .ok_or_else(|| Error::Precondition("no user message to parse".into()))?;
    let keys: Vec<&str> = state.checklist_keys().collect();

    if keys.is_empty() {
        return Ok(ParseOutcome::NoExtraction("checklist has no keys".into()));
    }

    let prompt = parse_prompt(category, &keys, latest);

    let reply = match completion.complete(&prompt).await {
        Ok(reply) => reply,
        Err(e) => {
            tracing::warn!("Requirement extraction call failed, keeping state: {}", e);
            return Ok(ParseOutcome::NoExtraction(e.to_string()));
        }
    };

    let extracted = match extract_requirements(&reply) {
        Ok(extracted) => extracted,
        Err(e) => {
            tracing::warn!(
                "Could not decode extraction reply ({}): {}",
                e,
                crate::truncate(&reply, 200)
            );
            return Ok(ParseOutcome::NoExtraction(e.to_string()));
        }
    };

    let report = state.merge_requirements(extracted);
    if !report.discarded.is_empty() {
        tracing::debug!(keys = ?report.discarded, "discarded keys outside the checklist");
    }
    tracing::debug!(added = ?report.added, updated = ?report.updated, "merged requirements");
    Ok(ParseOutcome::Merged(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedCompletion, fail, text};

    fn laptop_state() -> ConversationState {
        ConversationState::with_checklist(
            "I need a new laptop",
            "Laptop",
            &["primary_use", "budget"],
            &["brand"],
        )
    }

    #[test]
    fn test_parse_prompt_lists_keys_and_message() {
        let prompt = parse_prompt("Laptop", &["primary_use", "budget"], "for gaming");
        assert!(prompt.contains("The user wants to buy a: Laptop."));
        assert!(prompt.contains("look for are: primary_use, budget."));
        assert!(prompt.contains(r#"The user's latest message is: "for gaming""#));
        assert!(prompt.contains(r#"{"car_type": "SUV""#));
    }

    #[tokio::test]
    async fn test_merges_extracted_values() {
        let completion = ScriptedCompletion::new(vec![text(
            r#"{"primary_use": "gaming", "budget": "max 1500 dollars", "brand": "Any"}"#,
        )]);
        let mut state = laptop_state();

        let outcome = parse_latest_reply(completion.as_ref(), &mut state)
            .await
            .unwrap();

        assert!(matches!(outcome, ParseOutcome::Merged(_)));
        assert_eq!(state.extracted_requirements()["primary_use"], "gaming");
        assert_eq!(state.extracted_requirements()["budget"], "max 1500 dollars");
        assert_eq!(state.extracted_requirements()["brand"], "Any");
        assert!(completion.prompts()[0].1.contains("\"I need a new laptop\""));
    }

    #[tokio::test]
    async fn test_uses_latest_user_message_not_system() {
        let completion = ScriptedCompletion::new(vec![text("{}")]);
        let mut state = laptop_state();
        state.push_system("What will you use it for?");
        state.push_user("mostly gaming");
        state.push_system("Anything else?");

        parse_latest_reply(completion.as_ref(), &mut state)
            .await
            .unwrap();
        assert!(completion.prompts()[0].1.contains("\"mostly gaming\""));
    }

    #[tokio::test]
    async fn test_reply_keys_are_normalized() {
        let completion = ScriptedCompletion::new(vec![text(
            r#"{"Primary Use": "gaming", "Budget": "1500", "screen-size": "15 inch"}"#,
        )]);
        let mut state = laptop_state();

        let outcome = parse_latest_reply(completion.as_ref(), &mut state)
            .await
            .unwrap();

        assert_eq!(state.extracted_requirements()["primary_use"], "gaming");
        assert_eq!(state.extracted_requirements()["budget"], "1500");
        match outcome {
            ParseOutcome::Merged(report) => {
                assert_eq!(report.added, vec!["budget", "primary_use"]);
                assert_eq!(report.discarded, vec!["screen-size"]);
            }
            other => panic!("expected a merge, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_reply_is_noop() {
        let completion = ScriptedCompletion::new(vec![text("Sorry, I couldn't find anything.")]);
        let mut state = laptop_state();
        let before = state.clone();

        let outcome = parse_latest_reply(completion.as_ref(), &mut state)
            .await
            .unwrap();
        assert!(matches!(outcome, ParseOutcome::NoExtraction(_)));
        assert_eq!(state, before);
    }

    #[tokio::test]
    async fn test_llm_failure_is_noop() {
        let completion = ScriptedCompletion::new(vec![fail("overloaded")]);
        let mut state = laptop_state();
        let before = state.clone();

        let outcome = parse_latest_reply(completion.as_ref(), &mut state)
            .await
            .unwrap();
        assert!(matches!(outcome, ParseOutcome::NoExtraction(_)));
        assert_eq!(state, before);
    }

    #[tokio::test]
    async fn test_extraction_is_monotonic() {
        let completion = ScriptedCompletion::new(vec![
            text(r#"{"primary_use": "gaming"}"#),
            text(r#"{"budget": "1500", "warranty": "3 years"}"#),
            text("not json"),
        ]);
        let mut state = laptop_state();

        let mut previous: Vec<String> = Vec::new();
        for _ in 0..3 {
            parse_latest_reply(completion.as_ref(), &mut state)
                .await
                .unwrap();
            let keys: Vec<String> = state.extracted_requirements().keys().cloned().collect();
            assert!(previous.iter().all(|k| keys.contains(k)));
            previous = keys;
        }

        assert_eq!(previous, vec!["budget", "primary_use"]);
        assert!(!state.extracted_requirements().contains_key("warranty"));
    }

    #[tokio::test]
    async fn test_requires_checklist() {
        let completion = ScriptedCompletion::new(vec![]);
        let mut state = ConversationState::new("I need a laptop");
        let err = parse_latest_reply(completion.as_ref(), &mut state)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
    }

    #[tokio::test]
    async fn test_empty_checklist_skips_call() {
        let completion = ScriptedCompletion::new(vec![]);
        let mut state = ConversationState::with_checklist("pens", "Stationery", &[], &[]);
        let outcome = parse_latest_reply(completion.as_ref(), &mut state)
            .await
            .unwrap();
        assert!(matches!(outcome, ParseOutcome::NoExtraction(_)));
        assert_eq!(completion.calls(), 0);
    }
}
