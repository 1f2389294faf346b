//! OpenAI Chat Completions API provider (also used for OpenAI-compatible servers)

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{LlmProvider, error_from_response, schema_instruction};
use crate::{
    error::{Error, Result},
    types::{CompletionRequest, CompletionResponse, Model, StopReason, Usage},
};

/// OpenAI API client
pub struct OpenAIProvider {
    client: reqwest::Client,
    api_key: String,
    timeout: Option<Duration>,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider with an API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            timeout: None,
        }
    }

    /// Set a per-request timeout
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn build_request(&self, model: &Model, request: &CompletionRequest) -> OpenAIRequest {
        let mut messages = Vec::new();

        if let Some(ref system_prompt) = request.system_prompt {
            messages.push(OpenAIMessage {
                role: "system".to_string(),
                content: system_prompt.clone(),
            });
        }

        let mut prompt = request.prompt.clone();
        let response_format = match request.output_schema {
            Some(ref schema) if model.structured_output => Some(ResponseFormat {
                format_type: "json_schema".to_string(),
                json_schema: Some(JsonSchemaFormat {
                    name: schema.name.clone(),
                    schema: schema.schema.clone(),
                    strict: false,
                }),
            }),
            Some(ref schema) => {
                prompt.push_str(&schema_instruction(schema));
                Some(ResponseFormat {
                    format_type: "json_object".to_string(),
                    json_schema: None,
                })
            }
            None => None,
        };

        messages.push(OpenAIMessage {
            role: "user".to_string(),
            content: prompt,
        });

        OpenAIRequest {
            model: model.id.clone(),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            response_format,
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAIProvider {
    async fn complete(
        &self,
        model: &Model,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse> {
        let body = self.build_request(model, request);
        let url = format!("{}/chat/completions", model.base_url);

        let mut builder = self.client.post(&url).json(&body);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }
        for (key, value) in &model.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        tracing::debug!(model = %model.id, structured = request.output_schema.is_some(), "chat completion");
        let response = builder.send().await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let parsed: OpenAIResponse = response.json().await?;
        into_completion(parsed)
    }
}

fn into_completion(response: OpenAIResponse) -> Result<CompletionResponse> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| Error::UnexpectedResponse("no choices returned".to_string()))?;

    if let Some(refusal) = choice.message.refusal {
        return Err(Error::UnexpectedResponse(format!("model refused: {}", refusal)));
    }

    let stop_reason = match choice.finish_reason.as_deref() {
        Some("stop") => Some(StopReason::Stop),
        Some("length") => Some(StopReason::Length),
        Some("content_filter") => Some(StopReason::ContentFilter),
        _ => None,
    };

    let usage = response
        .usage
        .map(|u| Usage {
            input: u.prompt_tokens,
            output: u.completion_tokens,
        })
        .unwrap_or_default();

    Ok(CompletionResponse {
        text: choice.message.content.unwrap_or_default(),
        usage,
        stop_reason,
    })
}

// Request types

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    json_schema: Option<JsonSchemaFormat>,
}

#[derive(Debug, Serialize)]
struct JsonSchemaFormat {
    name: String,
    schema: serde_json::Value,
    strict: bool,
}

// Response types

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
    #[serde(default)]
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{OutputSchema, Provider};
    use serde_json::json;

    #[test]
    fn test_build_request_json_schema() {
        let provider = OpenAIProvider::new("sk-test");
        let model = Model::custom(Provider::OpenAI, "gpt-test");
        let schema = OutputSchema::new("vendor_scores", json!({"type": "object"}));
        let request = CompletionRequest::structured("score it", schema).with_system("judge");

        let body = serde_json::to_value(provider.build_request(&model, &request)).unwrap();
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "score it");
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(body["response_format"]["json_schema"]["name"], "vendor_scores");
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn test_build_request_json_object_fallback() {
        let provider = OpenAIProvider::new("");
        let model = Model::custom(Provider::Ollama, "qwen3:8b");
        let schema = OutputSchema::new("vendor_scores", json!({"type": "object"}));
        let request = CompletionRequest::structured("score it", schema);

        let body = serde_json::to_value(provider.build_request(&model, &request)).unwrap();
        assert_eq!(body["response_format"]["type"], "json_object");
        assert!(body["response_format"].get("json_schema").is_none());
        let prompt = body["messages"][0]["content"].as_str().unwrap();
        assert!(prompt.contains("JSON Schema"));
    }

    #[test]
    fn test_build_request_free_text() {
        let provider = OpenAIProvider::new("sk-test");
        let model = Model::custom(Provider::OpenAI, "gpt-test");
        let body =
            serde_json::to_value(provider.build_request(&model, &CompletionRequest::text("hi")))
                .unwrap();
        assert!(body.get("response_format").is_none());
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_into_completion() {
        let response: OpenAIResponse = serde_json::from_value(json!({
            "choices": [{
                "message": {"role": "assistant", "content": "{\"a\": 1}"},
                "finish_reason": "length"
            }],
            "usage": {"prompt_tokens": 20, "completion_tokens": 5, "total_tokens": 25}
        }))
        .unwrap();

        let completion = into_completion(response).unwrap();
        assert_eq!(completion.text, "{\"a\": 1}");
        assert_eq!(completion.stop_reason, Some(StopReason::Length));
        assert_eq!(completion.usage.input, 20);
    }

    #[test]
    fn test_into_completion_refusal() {
        let response: OpenAIResponse = serde_json::from_value(json!({
            "choices": [{
                "message": {"role": "assistant", "content": null, "refusal": "I can't help with that"},
                "finish_reason": "stop"
            }]
        }))
        .unwrap();
        assert!(matches!(
            into_completion(response),
            Err(Error::UnexpectedResponse(_))
        ));
    }
}
