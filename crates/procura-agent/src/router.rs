//! Decide whether to ask another question or finalize.

use crate::state::ConversationState;

/// Where a turn goes after parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Some essential keys are still unknown
    AskQuestion {
        /// Missing essential keys, checklist order
        missing_essential: Vec<String>,
        /// Missing essential keys followed by missing optional keys
        missing: Vec<String>,
    },
    /// Every essential key has a value
    Finalize,
}

pub fn route(state: &ConversationState) -> Route {
    let missing_essential = state.missing_essential();
    if missing_essential.is_empty() {
        return Route::Finalize;
    }

    let mut missing = missing_essential.clone();
    missing.extend(state.missing_optional());
    Route::AskQuestion {
        missing_essential,
        missing,
    }
}
