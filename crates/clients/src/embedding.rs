//! Embedding collaborator interface.

use minirag_core::{RagError, RagResult};

/// Embedding input type. Some providers produce asymmetric embeddings and
/// need to know whether the text is being indexed or used as a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingInput {
    Document,
    Query,
}

impl EmbeddingInput {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbeddingInput::Document => "search_document",
            EmbeddingInput::Query => "search_query",
        }
    }
}

/// Trait for embedding providers.
///
/// Implementations own their connection handles; they are constructed once
/// at process start and shared across requests.
#[async_trait::async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Model identifier.
    fn model_name(&self) -> &str;

    /// Fixed output dimension D. Must match the vector store collection.
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts. Output order matches input
    /// order; every vector has length `dimensions()`.
    async fn embed_batch(
        &self,
        texts: &[String],
        input: EmbeddingInput,
    ) -> RagResult<Vec<Vec<f32>>>;

    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str, input: EmbeddingInput) -> RagResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()], input).await?;
        results
            .pop()
            .ok_or_else(|| RagError::embedding("Provider returned no embedding"))
    }
}
