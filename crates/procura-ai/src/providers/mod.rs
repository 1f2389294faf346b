//! LLM Provider implementations

pub mod google;
pub mod openai;

use std::sync::Arc;
use std::time::Duration;

use crate::{Api, CompletionRequest, CompletionResponse, Error, Model, OutputSchema, Result};
use async_trait::async_trait;

/// Trait for LLM providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Request a single, non-streamed completion
    async fn complete(
        &self,
        model: &Model,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse>;
}

/// Get an API key from a provided value or the environment
pub fn get_api_key(provided: Option<&str>, env_var: &str) -> Result<String> {
    if let Some(key) = provided {
        return Ok(key.to_string());
    }

    std::env::var(env_var).map_err(|_| Error::InvalidApiKey)
}

/// Create the provider that speaks `model.api`.
///
/// When `api_key` is `None` the provider reads its key from the environment.
/// Fails if the model has no base URL, which is the case for custom
/// providers until one is configured.
pub fn provider_for(
    model: &Model,
    api_key: Option<&str>,
    timeout: Option<Duration>,
) -> Result<Arc<dyn LlmProvider>> {
    if model.base_url.trim().is_empty() {
        return Err(Error::InvalidConfig(format!(
            "no base URL for {} model '{}'",
            model.provider.name(),
            model.id
        )));
    }

    match model.api {
        Api::GoogleGenerativeAI => {
            let provider = match api_key {
                Some(key) => google::GoogleProvider::new(key),
                None => google::GoogleProvider::from_env()?,
            };
            Ok(Arc::new(provider.with_timeout(timeout)))
        }
        Api::OpenAICompletions => {
            let key = match (api_key, model.provider.api_key_env_var()) {
                (Some(key), _) => key.to_string(),
                (None, Some(var)) => get_api_key(None, var)?,
                // Local servers (ollama) accept any bearer token
                (None, None) => String::new(),
            };
            Ok(Arc::new(
                openai::OpenAIProvider::new(key).with_timeout(timeout),
            ))
        }
    }
}

/// Instruction appended to prompts for models that cannot enforce a schema natively.
pub(crate) fn schema_instruction(schema: &OutputSchema) -> String {
    format!(
        "\n\nRespond ONLY with a JSON object that conforms to this JSON Schema, \
         with no markdown and no commentary:\n{}",
        schema.schema
    )
}

/// Read an error body and map it to a provider error.
pub(crate) async fn error_from_response(response: reqwest::Response) -> Error {
    let status = response.status().as_u16();
    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    let body = response.text().await.unwrap_or_default();
    let message = extract_error_message(&body).unwrap_or(body);
    Error::from_status(status, message, retry_after)
}

/// Both Gemini and OpenAI wrap errors as `{"error": {"message": ...}}`.
fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("error")?
        .get("message")?
        .as_str()
        .map(|s| s.to_string())
}
