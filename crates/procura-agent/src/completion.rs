//! The completion-service seam used by every LLM-backed step.
//!
//! Workflow steps only see [`Completion`]: prompt in, text or a schema-checked
//! JSON value out. [`ProviderCompletion`] backs it with a `procura-ai`
//! provider and owns retry policy, so the workflow itself never retries.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use procura_ai::{
    CompletionRequest, CompletionResponse, LlmProvider, Model, OutputSchema, StopReason, Usage,
    structured,
};
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// An LLM text-completion capability
#[async_trait]
pub trait Completion: Send + Sync {
    /// Free-text mode
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Structured mode: the returned value has been validated against `schema`
    async fn complete_structured(
        &self,
        prompt: &str,
        schema: &OutputSchema,
    ) -> Result<serde_json::Value>;
}

/// Structured completion deserialized into `T`.
pub async fn complete_as<T: DeserializeOwned>(
    completion: &dyn Completion,
    prompt: &str,
    schema: &OutputSchema,
) -> Result<T> {
    let value = completion.complete_structured(prompt, schema).await?;
    serde_json::from_value(value)
        .map_err(|e| Error::SchemaViolation(format!("'{}': {}", schema.name, e)))
}

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Initial delay between retries
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// No retries at all
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Calculate delay for a given attempt (0-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay_secs =
            self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(attempt as i32);
        Duration::from_secs_f64(delay_secs.min(self.max_delay.as_secs_f64()))
    }
}

/// Request settings applied to every call made through a [`ProviderCompletion`]
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    /// Model to use
    pub model: Model,
    /// System instruction sent with every request
    pub system_prompt: Option<String>,
    /// Maximum tokens per response
    pub max_tokens: Option<u32>,
    /// Temperature
    pub temperature: Option<f32>,
    /// Retry policy for transient failures
    pub retry: RetryConfig,
}

impl CompletionConfig {
    /// Default settings for a model
    pub fn new(model: Model) -> Self {
        Self {
            model,
            system_prompt: None,
            max_tokens: Some(2048),
            temperature: None,
            retry: RetryConfig::default(),
        }
    }
}

/// [`Completion`] backed by a `procura-ai` provider
pub struct ProviderCompletion {
    provider: Arc<dyn LlmProvider>,
    config: CompletionConfig,
    total_usage: Mutex<Usage>,
}

impl ProviderCompletion {
    /// Create a completion client
    pub fn new(provider: Arc<dyn LlmProvider>, config: CompletionConfig) -> Self {
        Self {
            provider,
            config,
            total_usage: Mutex::new(Usage::default()),
        }
    }

    /// Build the provider for `config.model` and wrap it
    pub fn from_config(
        config: CompletionConfig,
        api_key: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let provider = procura_ai::providers::provider_for(&config.model, api_key, timeout)?;
        Ok(Self::new(provider, config))
    }

    /// Get the config
    pub fn config(&self) -> &CompletionConfig {
        &self.config
    }

    /// Usage accumulated over every successful call
    pub fn total_usage(&self) -> Usage {
        self.total_usage.lock().clone()
    }

    fn build_request(&self, prompt: &str, schema: Option<&OutputSchema>) -> CompletionRequest {
        let mut request = match schema {
            Some(schema) => CompletionRequest::structured(prompt, schema.clone()),
            None => CompletionRequest::text(prompt),
        };
        if let Some(ref system_prompt) = self.config.system_prompt {
            request = request.with_system(system_prompt.clone());
        }
        CompletionRequest {
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            ..request
        }
    }

    /// Send a request, retrying transient failures with exponential backoff
    async fn send(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let retry = &self.config.retry;
        let mut attempt = 0u32;

        loop {
            match self.provider.complete(&self.config.model, request).await {
                Ok(response) => {
                    self.total_usage.lock().accumulate(&response.usage);
                    match response.stop_reason {
                        Some(StopReason::Length) => tracing::warn!(
                            model = %self.config.model.id,
                            max_tokens = ?self.config.max_tokens,
                            "Completion was cut off at the token limit"
                        ),
                        Some(StopReason::ContentFilter) => tracing::warn!(
                            model = %self.config.model.id,
                            "Completion was stopped by the provider's content filter"
                        ),
                        _ => {}
                    }
                    return Ok(response);
                }
                Err(e) if e.is_retryable() && attempt < retry.max_retries => {
                    let backoff = retry.delay_for_attempt(attempt);
                    let delay = e
                        .retry_after()
                        .map(Duration::from_secs)
                        .map_or(backoff, |server| server.max(backoff));
                    tracing::warn!(
                        "Completion attempt {}/{} failed: {}. Retrying in {:?}",
                        attempt + 1,
                        retry.max_retries + 1,
                        e,
                        delay
                    );
                    attempt += 1;
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[async_trait]
impl Completion for ProviderCompletion {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = self.build_request(prompt, None);
        let response = self.send(&request).await?;
        Ok(response.text)
    }

    async fn complete_structured(
        &self,
        prompt: &str,
        schema: &OutputSchema,
    ) -> Result<serde_json::Value> {
        let request = self.build_request(prompt, Some(schema));
        let response = self.send(&request).await?;
        Ok(structured::decode_structured(&response.text, schema)?)
    }
}
