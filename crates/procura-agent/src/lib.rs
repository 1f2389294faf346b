//! procura-agent: requirement-gathering conversation workflow
//!
//! This crate turns a buyer's free-text request into a structured
//! requirement over several turns. It builds a checklist for the product
//! category, extracts values from each reply, asks for what is missing and
//! produces a final summary. Quote scoring and line-item suggestions reuse
//! the same completion seam.

pub mod checklist;
pub mod completion;
pub mod error;
pub mod extract;
pub mod parser;
pub mod question;
pub mod router;
pub mod scoring;
pub mod state;
pub mod suggestions;
pub mod summary;
pub mod workflow;

#[cfg(test)]
mod testing;

pub use completion::{Completion, CompletionConfig, ProviderCompletion, RetryConfig};
pub use error::{Error, Result};
pub use scoring::{ScoredQuote, VendorQuote, VendorScores, score_quote, score_quotes, shortlist};
pub use state::{ControlSignal, ConversationState, RequirementChecklist, Role, TurnMessage};
pub use suggestions::generate_suggestions;
pub use summary::FinalizedRequirement;
pub use workflow::{RequirementWorkflow, Step, TurnOutcome};

/// Truncate to at most `max_chars` characters, marking the cut with "..."
pub(crate) fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
