//! Model registry with public lookup API.

use crate::{Api, CostInfo, Model, Provider};

struct ModelEntry {
    id: &'static str,
    name: &'static str,
    provider: Provider,
    structured_output: bool,
    cost_input: f64,
    cost_output: f64,
    context_window: u32,
    max_tokens: u32,
}

const MODEL_ENTRIES: &[ModelEntry] = &[
    ModelEntry {
        id: "gemini-2.5-pro",
        name: "Gemini 2.5 Pro",
        provider: Provider::Google,
        structured_output: true,
        cost_input: 1.25,
        cost_output: 10.0,
        context_window: 1_048_576,
        max_tokens: 65_536,
    },
    ModelEntry {
        id: "gemini-2.5-flash",
        name: "Gemini 2.5 Flash",
        provider: Provider::Google,
        structured_output: true,
        cost_input: 0.30,
        cost_output: 2.50,
        context_window: 1_048_576,
        max_tokens: 65_536,
    },
    ModelEntry {
        id: "gpt-4o",
        name: "GPT-4o",
        provider: Provider::OpenAI,
        structured_output: true,
        cost_input: 2.50,
        cost_output: 10.0,
        context_window: 128_000,
        max_tokens: 16_384,
    },
    ModelEntry {
        id: "gpt-4o-mini",
        name: "GPT-4o mini",
        provider: Provider::OpenAI,
        structured_output: true,
        cost_input: 0.15,
        cost_output: 0.60,
        context_window: 128_000,
        max_tokens: 16_384,
    },
    ModelEntry {
        id: "llama-3.3-70b-versatile",
        name: "Llama 3.3 70B (Groq)",
        provider: Provider::Groq,
        structured_output: false,
        cost_input: 0.59,
        cost_output: 0.79,
        context_window: 131_072,
        max_tokens: 32_768,
    },
];

/// Model used when neither config nor flags name one.
pub const DEFAULT_MODEL_ID: &str = "gemini-2.5-pro";

impl ModelEntry {
    fn to_model(&self) -> Model {
        let (api, base_url): (Api, &str) = self.provider.default_endpoint();
        Model {
            id: self.id.to_string(),
            name: self.name.to_string(),
            api,
            provider: self.provider,
            base_url: base_url.to_string(),
            structured_output: self.structured_output,
            cost: CostInfo {
                input: self.cost_input,
                output: self.cost_output,
            },
            context_window: self.context_window,
            max_tokens: self.max_tokens,
            headers: Default::default(),
        }
    }
}

/// Look up a model by provider and ID.
pub fn get_model(provider: Provider, id: &str) -> Option<Model> {
    MODEL_ENTRIES
        .iter()
        .find(|e| e.id == id && e.provider == provider)
        .map(|e| e.to_model())
}

/// Get all models for a specific provider.
pub fn get_models(provider: Provider) -> Vec<Model> {
    MODEL_ENTRIES
        .iter()
        .filter(|e| e.provider == provider)
        .map(|e| e.to_model())
        .collect()
}

/// Resolve a model id for a provider, falling back to a custom definition.
pub fn resolve(provider: Provider, id: &str) -> Model {
    get_model(provider, id).unwrap_or_else(|| Model::custom(provider, id))
}
