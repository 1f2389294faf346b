//! Question formulation for missing requirements.

use std::collections::BTreeMap;

use crate::completion::Completion;
use crate::error::{Error, Result};
use crate::state::{ControlSignal, ConversationState};

pub fn question_prompt(
    category: &str,
    known: &BTreeMap<String, String>,
    missing_essential: &[String],
    missing: &[String],
) -> String {
    let known = if known.is_empty() {
        "nothing yet".to_string()
    } else {
        known
            .iter()
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect::<Vec<_>>()
            .join("; ")
    };

    format!(
        "Based on the conversation so far and the user's goal to buy a {}, formulate the next \
         question to ask.\n\
         The user has already provided this information: {}.\n\
         You still need to find out about the following, most important first: {}.\n\
         The request cannot be processed until these are known: {}.\n\
         Ask for one or two pieces of information at a time. Make your question friendly and \
         conversational. Reply with the question only.",
        category,
        known,
        missing.join(", "),
        missing_essential.join(", ")
    )
}

/// Ask the model for the next question and append it to the log.
///
/// `missing` is every unknown key, essential first; `missing_essential` is
/// the subset that blocks finalization.
pub async fn ask_question(
    completion: &dyn Completion,
    state: &mut ConversationState,
    missing_essential: &[String],
    missing: &[String],
) -> Result<()> {
    let category = state
        .category()
        .ok_or_else(|| Error::Precondition("cannot ask before the checklist exists".into()))?;

    let prompt = question_prompt(
        category,
        state.extracted_requirements(),
        missing_essential,
        missing,
    );
    let reply = completion.complete(&prompt).await?;
    let question = reply.trim();
    if question.is_empty() {
        return Err(Error::EmptyResponse("formulating the next question"));
    }

    tracing::debug!(missing_essential = ?missing_essential, "asking follow-up question");
    state.push_system(question);
    state.set_control_signal(ControlSignal::AwaitUserInput);
    Ok(())
}
