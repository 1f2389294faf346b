//! Error types for procura-agent

use thiserror::Error;

/// Result type alias using procura-agent Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running a conversation turn
#[derive(Error, Debug)]
pub enum Error {
    /// An error from the completion provider layer
    #[error(transparent)]
    Ai(#[from] procura_ai::Error),

    /// A structured reply could not be mapped onto the expected type
    #[error("Schema violation: {0}")]
    SchemaViolation(String),

    /// The caller passed a state or input the workflow cannot accept
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// The conversation already reached its terminal state
    #[error("Conversation is already complete")]
    ConversationComplete,

    /// The completion service returned no usable text
    #[error("Empty response from completion service while {0}")]
    EmptyResponse(&'static str),

    /// A generic agent error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Check if this error means the reply did not match the requested schema
    pub fn is_schema_violation(&self) -> bool {
        matches!(
            self,
            Error::SchemaViolation(_) | Error::Ai(procura_ai::Error::SchemaViolation(_))
        )
    }

    /// Check if retrying the same turn could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Ai(e) => e.is_retryable(),
            Error::EmptyResponse(_) => true,
            _ => false,
        }
    }

    /// Check if this error is the caller's fault rather than the service's
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Error::Precondition(_) | Error::ConversationComplete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_violation_from_either_layer() {
        assert!(Error::SchemaViolation("bad".into()).is_schema_violation());
        assert!(Error::Ai(procura_ai::Error::SchemaViolation("bad".into())).is_schema_violation());
        assert!(!Error::ConversationComplete.is_schema_violation());
    }

    #[test]
    fn test_retryable_delegates_to_provider_error() {
        assert!(Error::Ai(procura_ai::Error::RateLimited { retry_after: None }).is_retryable());
        assert!(!Error::Ai(procura_ai::Error::InvalidApiKey).is_retryable());
        assert!(!Error::Precondition("no checklist".into()).is_retryable());
    }

    #[test]
    fn test_caller_errors() {
        assert!(Error::ConversationComplete.is_caller_error());
        assert!(Error::Precondition("empty input".into()).is_caller_error());
        assert!(!Error::EmptyResponse("asking a question").is_caller_error());
    }
}
