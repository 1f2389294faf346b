//! Error types for procura-ai

use thiserror::Error;

/// Result type alias using procura-ai Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when calling an LLM provider
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed (includes client-side timeouts)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// API returned an error response
    #[error("API error: {message} (status: {status})")]
    Api { status: u16, message: String },

    /// Rate limit exceeded
    #[error("Rate limited: retry after {retry_after:?} seconds")]
    RateLimited { retry_after: Option<u64> },

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Invalid API key
    #[error("Invalid or missing API key")]
    InvalidApiKey,

    /// Unexpected response format
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Structured output did not match the requested schema
    #[error("Schema violation: {0}")]
    SchemaViolation(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Create an API error from status and message
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Map a non-success HTTP status and body to an error
    pub fn from_status(status: u16, body: String, retry_after: Option<u64>) -> Self {
        match status {
            401 | 403 => Error::Auth(body),
            429 => Error::RateLimited { retry_after },
            _ => Error::api(status, body),
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(_) | Error::RateLimited { .. } => true,
            Error::Api { status, message } => {
                let msg = message.to_lowercase();
                *status >= 500
                    || msg.contains("overloaded")
                    || msg.contains("rate limit")
                    || msg.contains("too many requests")
                    || msg.contains("resource_exhausted")
            }
            _ => false,
        }
    }

    /// Server-requested delay before retrying, in seconds
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Error::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}
