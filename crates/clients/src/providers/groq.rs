//! Groq generation provider (OpenAI-compatible chat completions).
//!
//! API reference: https://console.groq.com/docs/api-reference

use crate::generation::{Generation, GenerationClient, GenerationRequest, TokenUsage};
use crate::retry::{transient_status, with_retry, RetryPolicy};
use minirag_core::{RagError, RagResult, Stage};
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

#[derive(Debug, Serialize)]
struct ChatApiRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatApiResponse {
    model: String,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// Groq chat completion client.
pub struct GroqGenerator {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    retry: RetryPolicy,
}

impl GroqGenerator {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, retry: RetryPolicy) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
            retry,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn generate_once(&self, request: &GenerationRequest) -> RagResult<Generation> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.prompt,
        });

        let body = ChatApiRequest {
            model: &self.model,
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| RagError::generation_transient(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            let message = format!("Groq API error ({}): {}", status, detail);
            return Err(if transient_status(status) {
                RagError::generation_transient(message)
            } else {
                RagError::generation(message)
            });
        }

        let parsed: ChatApiResponse = response
            .json()
            .await
            .map_err(|e| RagError::generation(format!("Failed to parse response: {}", e)))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .ok_or_else(|| RagError::generation("Response contained no choices"))?;

        let usage = parsed
            .usage
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        Ok(Generation {
            text,
            model: parsed.model,
            usage,
        })
    }
}

#[async_trait::async_trait]
impl GenerationClient for GroqGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerationRequest) -> RagResult<Generation> {
        tracing::debug!(
            "Generating with {} (temperature {}, max_tokens {})",
            self.model,
            request.temperature,
            request.max_tokens
        );

        with_retry(&self.retry, Stage::Generate, || self.generate_once(request)).await
    }
}
