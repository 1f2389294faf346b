//! Turn driver for the requirement-gathering conversation.
//!
//! One call runs a single turn: it takes the caller's state, runs steps until
//! a halting point, and hands back a new state. The caller's copy is never
//! touched, so a failed turn can simply be retried with the same input.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::checklist::generate_checklist;
use crate::completion::Completion;
use crate::error::{Error, Result};
use crate::parser::{ParseOutcome, parse_latest_reply};
use crate::question::ask_question;
use crate::router::{Route, route};
use crate::state::{ControlSignal, ConversationState};
use crate::summary::finalize;

/// A unit of work inside a turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    GenerateChecklist,
    Parse,
    Route,
    AskQuestion {
        missing_essential: Vec<String>,
        missing: Vec<String>,
    },
    Finalize,
    Halt(ControlSignal),
}

impl Step {
    /// Where a turn starts for a given state
    pub fn entry(state: &ConversationState) -> Step {
        if state.has_checklist() {
            Step::Parse
        } else {
            Step::GenerateChecklist
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Step::GenerateChecklist => "generate_checklist",
            Step::Parse => "parse",
            Step::Route => "route",
            Step::AskQuestion { .. } => "ask_question",
            Step::Finalize => "finalize",
            Step::Halt(_) => "halt",
        }
    }
}

/// What a turn hands back to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnOutcome {
    /// The latest system message: a question or the final summary
    pub message: String,
    /// The updated state to pass into the next turn
    pub state: ConversationState,
    /// True once the conversation reached its terminal state
    pub complete: bool,
}

/// The requirement-gathering state machine.
///
/// Holds no per-conversation data, so one workflow can serve any number of
/// conversations concurrently.
#[derive(Clone)]
pub struct RequirementWorkflow {
    completion: Arc<dyn Completion>,
}

impl RequirementWorkflow {
    pub fn new(completion: Arc<dyn Completion>) -> Self {
        Self { completion }
    }

    /// First turn: generate the checklist, parse the query itself, then ask or finalize.
    pub async fn start_conversation(&self, initial_query: &str) -> Result<TurnOutcome> {
        let initial_query = initial_query.trim();
        if initial_query.is_empty() {
            return Err(Error::Precondition("initial query is empty".into()));
        }

        tracing::info!(query = %crate::truncate(initial_query, 80), "starting conversation");
        self.run_turn(ConversationState::new(initial_query)).await
    }

    /// Any later turn: append the user's reply and continue from parsing.
    pub async fn continue_conversation(
        &self,
        state: &ConversationState,
        user_input: &str,
    ) -> Result<TurnOutcome> {
        if state.is_complete() {
            return Err(Error::ConversationComplete);
        }
        if !state.has_checklist() {
            return Err(Error::Precondition(
                "state has no checklist; start a new conversation instead".into(),
            ));
        }
        if state.message_log().is_empty() {
            return Err(Error::Precondition("state has an empty message log".into()));
        }
        let user_input = user_input.trim();
        if user_input.is_empty() {
            return Err(Error::Precondition("user input is empty".into()));
        }

        let mut next = state.clone();
        next.push_user(user_input);
        self.run_turn(next).await
    }

    async fn run_turn(&self, mut state: ConversationState) -> Result<TurnOutcome> {
        let mut step = Step::entry(&state);

        let signal = loop {
            tracing::debug!(step = step.name(), "running step");
            step = match step {
                Step::GenerateChecklist => {
                    generate_checklist(self.completion.as_ref(), &mut state).await?;
                    Step::Parse
                }
                Step::Parse => {
                    match parse_latest_reply(self.completion.as_ref(), &mut state).await? {
                        ParseOutcome::Merged(report) if report.is_noop() => {
                            tracing::debug!("reply added no new requirements");
                        }
                        ParseOutcome::Merged(_) => {}
                        ParseOutcome::NoExtraction(reason) => {
                            tracing::debug!(%reason, "nothing extracted this turn");
                        }
                    }
                    Step::Route
                }
                Step::Route => match route(&state) {
                    Route::Finalize => Step::Finalize,
                    Route::AskQuestion {
                        missing_essential,
                        missing,
                    } => Step::AskQuestion {
                        missing_essential,
                        missing,
                    },
                },
                Step::AskQuestion {
                    missing_essential,
                    missing,
                } => {
                    ask_question(
                        self.completion.as_ref(),
                        &mut state,
                        &missing_essential,
                        &missing,
                    )
                    .await?;
                    Step::Halt(ControlSignal::AwaitUserInput)
                }
                Step::Finalize => {
                    finalize(&mut state)?;
                    Step::Halt(ControlSignal::ConversationComplete)
                }
                Step::Halt(signal) => break signal,
            };
        };

        let message = state
            .latest_system_message()
            .ok_or_else(|| Error::Other("turn ended without a system message".into()))?
            .to_string();

        Ok(TurnOutcome {
            message,
            complete: signal == ControlSignal::ConversationComplete,
            state,
        })
    }
}
