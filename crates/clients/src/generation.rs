//! Answer generation collaborator interface.

use minirag_core::RagResult;
use serde::{Deserialize, Serialize};

/// Generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The user prompt
    pub prompt: String,

    /// System prompt (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum tokens to generate
    pub max_tokens: u32,
}

impl GenerationRequest {
    /// Create a request with the given prompt and bounded, low-temperature
    /// defaults suitable for factual answering.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system: None,
            temperature: 0.1,
            max_tokens: 1000,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Token usage reported by the generation call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u32,

    #[serde(default)]
    pub completion_tokens: u32,

    #[serde(default)]
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }

    /// Whether the provider actually reported usage.
    pub fn is_empty(&self) -> bool {
        self.prompt_tokens == 0 && self.completion_tokens == 0
    }
}

/// Generation response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Generation {
    /// The generated text
    pub text: String,

    /// Model that produced it
    pub model: String,

    /// Reported usage (may be empty for providers that omit it)
    pub usage: TokenUsage,
}

/// Trait for generation providers.
#[async_trait::async_trait]
pub trait GenerationClient: Send + Sync {
    /// Model identifier.
    fn model_name(&self) -> &str;

    /// Perform a completion.
    async fn generate(&self, request: &GenerationRequest) -> RagResult<Generation>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = GenerationRequest::new("hello")
            .with_system("be brief")
            .with_temperature(0.2)
            .with_max_tokens(64);

        assert_eq!(request.prompt, "hello");
        assert_eq!(request.system.as_deref(), Some("be brief"));
        assert_eq!(request.temperature, 0.2);
        assert_eq!(request.max_tokens, 64);
    }

    #[test]
    fn test_usage_totals() {
        let usage = TokenUsage::new(120, 30);
        assert_eq!(usage.total_tokens, 150);
        assert!(!usage.is_empty());
        assert!(TokenUsage::default().is_empty());
    }
}
