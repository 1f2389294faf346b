//! Core types for LLM completion requests

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Supported API types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Api {
    OpenAICompletions,
    GoogleGenerativeAI,
}

/// Known LLM providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Google,
    OpenAI,
    Groq,
    OpenRouter,
    Ollama,
    Custom,
}

impl Provider {
    /// Get a human-readable name for this provider
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Google => "Google",
            Provider::OpenAI => "OpenAI",
            Provider::Groq => "Groq",
            Provider::OpenRouter => "OpenRouter",
            Provider::Ollama => "Ollama",
            Provider::Custom => "Custom",
        }
    }

    /// Get the environment variable name for this provider's API key
    pub fn api_key_env_var(&self) -> Option<&'static str> {
        match self {
            Provider::Google => Some("GOOGLE_API_KEY"),
            Provider::OpenAI => Some("OPENAI_API_KEY"),
            Provider::Groq => Some("GROQ_API_KEY"),
            Provider::OpenRouter => Some("OPENROUTER_API_KEY"),
            Provider::Ollama => None,
            Provider::Custom => None,
        }
    }

    /// Parse a provider from a config or command-line string
    pub fn parse(s: &str) -> Option<Provider> {
        match s.to_lowercase().as_str() {
            "google" | "gemini" => Some(Provider::Google),
            "openai" => Some(Provider::OpenAI),
            "groq" => Some(Provider::Groq),
            "openrouter" => Some(Provider::OpenRouter),
            "ollama" => Some(Provider::Ollama),
            "custom" => Some(Provider::Custom),
            _ => None,
        }
    }

    /// Default API base URL and wire protocol for this provider
    pub fn default_endpoint(&self) -> (Api, &'static str) {
        match self {
            Provider::Google => (
                Api::GoogleGenerativeAI,
                "https://generativelanguage.googleapis.com/v1beta",
            ),
            Provider::OpenAI => (Api::OpenAICompletions, "https://api.openai.com/v1"),
            Provider::Groq => (Api::OpenAICompletions, "https://api.groq.com/openai/v1"),
            Provider::OpenRouter => (Api::OpenAICompletions, "https://openrouter.ai/api/v1"),
            Provider::Ollama => (Api::OpenAICompletions, "http://localhost:11434/v1"),
            Provider::Custom => (Api::OpenAICompletions, ""),
        }
    }
}

/// Cost information for a model (per million tokens)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CostInfo {
    pub input: f64,
    pub output: f64,
}

/// Model definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    /// Model identifier (e.g., "gemini-2.5-pro")
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// API type to use
    pub api: Api,
    /// Provider
    pub provider: Provider,
    /// Base URL for API calls
    pub base_url: String,
    /// Whether the provider can constrain output to a JSON schema
    pub structured_output: bool,
    /// Cost per million tokens
    pub cost: CostInfo,
    /// Context window size in tokens
    pub context_window: u32,
    /// Maximum output tokens
    pub max_tokens: u32,
    /// Additional headers for API calls
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl Model {
    /// Build a model definition for an id the registry does not know about
    pub fn custom(provider: Provider, id: impl Into<String>) -> Self {
        let id = id.into();
        let (api, base_url) = provider.default_endpoint();
        Self {
            name: id.clone(),
            id,
            api,
            provider,
            base_url: base_url.to_string(),
            structured_output: matches!(provider, Provider::Google | Provider::OpenAI),
            cost: CostInfo::default(),
            context_window: 128_000,
            max_tokens: 8192,
            headers: HashMap::new(),
        }
    }
}

/// Token usage information
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input: u32,
    pub output: u32,
}

impl Usage {
    /// Calculate cost in dollars for this usage given a model
    pub fn calculate_cost(&self, model: &Model) -> f64 {
        let input = (self.input as f64 / 1_000_000.0) * model.cost.input;
        let output = (self.output as f64 / 1_000_000.0) * model.cost.output;
        input + output
    }

    /// Add another usage record to this one
    pub fn accumulate(&mut self, other: &Usage) {
        self.input = self.input.saturating_add(other.input);
        self.output = self.output.saturating_add(other.output);
    }
}

/// Reason why generation stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Natural end of response
    Stop,
    /// Maximum tokens reached
    Length,
    /// Provider refused or filtered the output
    ContentFilter,
}

/// A JSON Schema the response must conform to (structured output mode)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSchema {
    /// Schema name, sent to providers that require one
    pub name: String,
    /// The JSON Schema document
    pub schema: serde_json::Value,
}

impl OutputSchema {
    /// Create a new output schema
    pub fn new(name: impl Into<String>, schema: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }
}

/// A single completion request
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    /// System instruction
    pub system_prompt: Option<String>,
    /// User prompt
    pub prompt: String,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// Temperature (0.0 - 2.0)
    pub temperature: Option<f32>,
    /// Constrain output to this schema
    pub output_schema: Option<OutputSchema>,
}

impl CompletionRequest {
    /// Create a free-text request
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    /// Create a structured-output request
    pub fn structured(prompt: impl Into<String>, schema: OutputSchema) -> Self {
        Self {
            prompt: prompt.into(),
            output_schema: Some(schema),
            ..Default::default()
        }
    }

    /// Set the system instruction
    pub fn with_system(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }
}

/// The provider's reply to a completion request
#[derive(Debug, Clone, Default)]
pub struct CompletionResponse {
    /// Concatenated text of the first candidate
    pub text: String,
    /// Token usage
    pub usage: Usage,
    /// Why generation stopped, if reported
    pub stop_reason: Option<StopReason>,
}
