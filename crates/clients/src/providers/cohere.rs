//! Cohere embedding and rerank providers.
//!
//! API reference: https://docs.cohere.com/reference/embed and
//! https://docs.cohere.com/reference/rerank

use crate::embedding::{EmbeddingClient, EmbeddingInput};
use crate::rerank::{Reranked, RerankClient};
use crate::retry::{transient_status, with_retry, RetryPolicy};
use minirag_core::{RagError, RagResult, Stage};
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.cohere.com";

/// Maximum texts per embed call accepted by the Cohere API.
const EMBED_BATCH_LIMIT: usize = 96;

#[derive(Debug, Serialize)]
struct EmbedApiRequest<'a> {
    model: &'a str,
    texts: &'a [String],
    input_type: &'a str,
    embedding_types: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct EmbedApiResponse {
    embeddings: EmbedVectors,
}

#[derive(Debug, Deserialize)]
struct EmbedVectors {
    #[serde(rename = "float")]
    float_vectors: Vec<Vec<f32>>,
}

/// Cohere embedding client.
pub struct CohereEmbedder {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
    retry: RetryPolicy,
}

impl CohereEmbedder {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        dimensions: usize,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
            dimensions,
            retry,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn embed_one_batch(
        &self,
        texts: &[String],
        input: EmbeddingInput,
    ) -> RagResult<Vec<Vec<f32>>> {
        let body = EmbedApiRequest {
            model: &self.model,
            texts,
            input_type: input.as_str(),
            embedding_types: ["float"],
        };

        let response = self
            .client
            .post(format!("{}/v2/embed", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| RagError::embedding_transient(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            let message = format!("Cohere embed API error ({}): {}", status, detail);
            return Err(if transient_status(status) {
                RagError::embedding_transient(message)
            } else {
                RagError::embedding(message)
            });
        }

        let parsed: EmbedApiResponse = response
            .json()
            .await
            .map_err(|e| RagError::embedding(format!("Failed to parse embed response: {}", e)))?;

        Ok(parsed.embeddings.float_vectors)
    }
}

#[async_trait::async_trait]
impl EmbeddingClient for CohereEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(
        &self,
        texts: &[String],
        input: EmbeddingInput,
    ) -> RagResult<Vec<Vec<f32>>> {
        let mut all = Vec::with_capacity(texts.len());

        for batch in texts.chunks(EMBED_BATCH_LIMIT) {
            let vectors = with_retry(&self.retry, Stage::Embed, || {
                self.embed_one_batch(batch, input)
            })
            .await?;

            if vectors.len() != batch.len() {
                return Err(RagError::embedding(format!(
                    "Embed API returned {} vectors for {} texts",
                    vectors.len(),
                    batch.len()
                )));
            }
            all.extend(vectors);
        }

        tracing::debug!("Embedded {} texts with {}", all.len(), self.model);
        Ok(all)
    }
}

#[derive(Debug, Serialize)]
struct RerankApiRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: &'a [String],
    top_n: usize,
}

#[derive(Debug, Deserialize)]
struct RerankApiResponse {
    results: Vec<RerankApiResult>,
}

#[derive(Debug, Deserialize)]
struct RerankApiResult {
    index: usize,
    relevance_score: f32,
}

/// Cohere rerank client.
pub struct CohereReranker {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    retry: RetryPolicy,
}

impl CohereReranker {
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

    async fn rerank_once(
        &self,
        query: &str,
        documents: &[String],
        top_n: usize,
    ) -> RagResult<Vec<Reranked>> {
        let body = RerankApiRequest {
            model: &self.model,
            query,
            documents,
            top_n,
        };

        let response = self
            .client
            .post(format!("{}/v2/rerank", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| RagError::rerank_transient(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            let message = format!("Cohere rerank API error ({}): {}", status, detail);
            return Err(if transient_status(status) {
                RagError::rerank_transient(message)
            } else {
                RagError::rerank(message)
            });
        }

        let parsed: RerankApiResponse = response
            .json()
            .await
            .map_err(|e| RagError::rerank(format!("Failed to parse rerank response: {}", e)))?;

        Ok(parsed
            .results
            .into_iter()
            .map(|r| Reranked {
                index: r.index,
                score: r.relevance_score,
            })
            .collect())
    }
}

#[async_trait::async_trait]
impl RerankClient for CohereReranker {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_n: usize,
    ) -> RagResult<Vec<Reranked>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let top_n = top_n.min(documents.len());
        let results = with_retry(&self.retry, Stage::Rerank, || {
            self.rerank_once(query, documents, top_n)
        })
        .await?;

        validate_rerank_indices(&results, documents.len())?;
        Ok(results)
    }
}

/// Reject responses whose indices fall outside the submitted document list
/// or repeat an entry; either would corrupt the caller's candidate set.
fn validate_rerank_indices(results: &[Reranked], document_count: usize) -> RagResult<()> {
    let mut seen = std::collections::HashSet::with_capacity(results.len());
    for r in results {
        if r.index >= document_count {
            return Err(RagError::rerank(format!(
                "Rerank API returned out-of-range index {}",
                r.index
            )));
        }
        if !seen.insert(r.index) {
            return Err(RagError::rerank(format!(
                "Rerank API returned duplicate index {}",
                r.index
            )));
        }
    }
    Ok(())
}
