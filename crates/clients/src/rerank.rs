//! Reranking collaborator interface.

use minirag_core::RagResult;
use serde::{Deserialize, Serialize};

/// A single rerank result: the index of the document in the submitted list
/// and its relevance score to the query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reranked {
    pub index: usize,
    pub score: f32,
}

/// Trait for rerank providers.
///
/// Reranking is a refinement stage: callers are expected to treat failures
/// as degradable and fall back to their pre-rerank ordering.
#[async_trait::async_trait]
pub trait RerankClient: Send + Sync {
    /// Model identifier.
    fn model_name(&self) -> &str;

    /// Re-score `documents` against `query` and return the top `top_n`
    /// entries ordered by descending relevance. Indices refer to the
    /// submitted document list.
    async fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_n: usize,
    ) -> RagResult<Vec<Reranked>>;
}
