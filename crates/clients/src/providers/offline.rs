//! Deterministic in-process collaborators.
//!
//! These implement the same traits as the remote providers but run without
//! network access or credentials. They back the `--offline` mode and the
//! end-to-end tests: embeddings are content-derived hash vectors, the store
//! is an in-memory cosine index, the reranker re-scores by embedding
//! similarity, and the generator emits a fixed cited answer.

use crate::embedding::{EmbeddingClient, EmbeddingInput};
use crate::generation::{Generation, GenerationClient, GenerationRequest, TokenUsage};
use crate::rerank::{Reranked, RerankClient};
use crate::similarity::cosine_similarity;
use crate::store::{ScoredPoint, StoredChunk, StoreHealth, VectorStore};
use minirag_core::{RagError, RagResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

/// Deterministic content-hash embedder.
///
/// Each word contributes its own hash bucket plus one bucket per character
/// trigram, and the result is normalized to a unit vector. Not semantic,
/// but stable: identical text always maps to an identical vector, and
/// overlapping vocabulary yields higher cosine similarity.
#[derive(Debug)]
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];

        for raw in text.split_whitespace() {
            let word: String = raw
                .chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase();
            if word.is_empty() {
                continue;
            }

            vector[bucket(word.as_bytes(), 31, self.dimensions)] += 1.0;

            let bytes = word.as_bytes();
            for window in bytes.windows(3) {
                vector[bucket(window, 37, self.dimensions)] += 0.5;
            }
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

fn bucket(bytes: &[u8], seed: u64, dimensions: usize) -> usize {
    let hash = bytes
        .iter()
        .fold(seed, |acc, &b| acc.wrapping_mul(seed).wrapping_add(b as u64));
    (hash as usize) % dimensions
}

#[async_trait::async_trait]
impl EmbeddingClient for HashEmbedder {
    fn model_name(&self) -> &str {
        "hash-v1"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(
        &self,
        texts: &[String],
        _input: EmbeddingInput,
    ) -> RagResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

/// In-memory vector store with exact cosine search.
#[derive(Debug, Default)]
pub struct MemoryStore {
    points: RwLock<Vec<StoredChunk>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl VectorStore for MemoryStore {
    async fn upsert(&self, chunks: Vec<StoredChunk>) -> RagResult<()> {
        let mut points = self
            .points
            .write()
            .map_err(|_| RagError::store("Store lock poisoned"))?;

        for chunk in chunks {
            if let Some(existing) = points.iter_mut().find(|p| p.id == chunk.id) {
                *existing = chunk;
            } else {
                points.push(chunk);
            }
        }
        Ok(())
    }

    async fn search(&self, vector: &[f32], limit: usize) -> RagResult<Vec<ScoredPoint>> {
        let points = self
            .points
            .read()
            .map_err(|_| RagError::store("Store lock poisoned"))?;

        let mut hits: Vec<ScoredPoint> = points
            .iter()
            .map(|p| ScoredPoint {
                id: p.id.clone(),
                score: cosine_similarity(vector, &p.vector),
                vector: p.vector.clone(),
                payload: p.payload.clone(),
            })
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn count(&self) -> RagResult<u64> {
        let points = self
            .points
            .read()
            .map_err(|_| RagError::store("Store lock poisoned"))?;
        Ok(points.len() as u64)
    }

    async fn health(&self) -> StoreHealth {
        StoreHealth {
            connected: true,
            collection_exists: true,
            point_count: self.count().await.unwrap_or(0),
        }
    }
}

/// Reranker that re-scores documents by embedding cosine similarity.
///
/// Shares the embedder used by the rest of the pipeline so its scores are
/// directly comparable to vector search scores. A failure switch supports
/// exercising the degraded-rerank path in tests.
pub struct SimilarityReranker {
    embedder: Arc<dyn EmbeddingClient>,
    fail: AtomicBool,
}

impl SimilarityReranker {
    pub fn new(embedder: Arc<dyn EmbeddingClient>) -> Self {
        Self {
            embedder,
            fail: AtomicBool::new(false),
        }
    }

    /// Make every subsequent rerank call fail with a transient error.
    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl RerankClient for SimilarityReranker {
    fn model_name(&self) -> &str {
        "similarity-rerank-v1"
    }

    async fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_n: usize,
    ) -> RagResult<Vec<Reranked>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(RagError::rerank_transient("Simulated rerank outage"));
        }

        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed(query, EmbeddingInput::Query).await?;
        let doc_vectors = self
            .embedder
            .embed_batch(documents, EmbeddingInput::Document)
            .await?;

        let mut results: Vec<Reranked> = doc_vectors
            .iter()
            .enumerate()
            .map(|(index, v)| Reranked {
                index,
                score: cosine_similarity(&query_vector, v),
            })
            .collect();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(top_n.min(documents.len()));
        Ok(results)
    }
}

/// Decline phrase emitted when the prompt carries no usable snippets.
pub const OFFLINE_DECLINE: &str = "I don't have enough information to answer this question.";

/// Deterministic generator for offline mode and tests.
///
/// Emits a fixed answer citing the first snippet, or the decline phrase
/// when the prompt contains no numbered snippets. Usage is approximated
/// from whitespace token counts.
#[derive(Debug, Default)]
pub struct TemplateGenerator;

impl TemplateGenerator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl GenerationClient for TemplateGenerator {
    fn model_name(&self) -> &str {
        "template-v1"
    }

    async fn generate(&self, request: &GenerationRequest) -> RagResult<Generation> {
        let has_snippets = request.prompt.contains("[1]");

        let text = if has_snippets {
            "The provided material addresses this directly [1].".to_string()
        } else {
            OFFLINE_DECLINE.to_string()
        };

        let prompt_tokens = request.prompt.split_whitespace().count() as u32;
        let completion_tokens = text.split_whitespace().count() as u32;

        Ok(Generation {
            text,
            model: self.model_name().to_string(),
            usage: TokenUsage::new(prompt_tokens, completion_tokens),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ChunkPayload;

    fn payload(text: &str, index: u32) -> ChunkPayload {
        ChunkPayload {
            text: text.to_string(),
            document_id: "doc-1".to_string(),
            chunk_index: index,
            title: None,
            source: None,
            token_count: text.split_whitespace().count() as u32,
        }
    }

    #[tokio::test]
    async fn test_hash_embedder_deterministic_unit_vectors() {
        let embedder = HashEmbedder::new(256);
        let a = embedder.embed("machine learning", EmbeddingInput::Query).await.unwrap();
        let b = embedder.embed("machine learning", EmbeddingInput::Document).await.unwrap();

        assert_eq!(a.len(), 256);
        assert_eq!(a, b);

        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-3);
    }

    #[tokio::test]
    async fn test_hash_embedder_related_text_scores_higher() {
        let embedder = HashEmbedder::new(256);
        let query = embedder.embed("machine learning systems", EmbeddingInput::Query).await.unwrap();
        let related = embedder
            .embed("machine learning enables systems to learn", EmbeddingInput::Document)
            .await
            .unwrap();
        let unrelated = embedder
            .embed("grilled cheese sandwich recipe", EmbeddingInput::Document)
            .await
            .unwrap();

        assert!(
            cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated),
            "related text should score higher"
        );
    }

    #[tokio::test]
    async fn test_memory_store_upsert_and_search() {
        let store = MemoryStore::new();
        store
            .upsert(vec![
                StoredChunk {
                    id: "a".to_string(),
                    vector: vec![1.0, 0.0],
                    payload: payload("first", 0),
                },
                StoredChunk {
                    id: "b".to_string(),
                    vector: vec![0.0, 1.0],
                    payload: payload("second", 1),
                },
            ])
            .await
            .unwrap();

        let hits = store.search(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "a");
        assert!((hits[0].score - 1.0).abs() < 1e-6);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_memory_store_upsert_replaces_by_id() {
        let store = MemoryStore::new();
        store
            .upsert(vec![StoredChunk {
                id: "a".to_string(),
                vector: vec![1.0, 0.0],
                payload: payload("old", 0),
            }])
            .await
            .unwrap();
        store
            .upsert(vec![StoredChunk {
                id: "a".to_string(),
                vector: vec![0.0, 1.0],
                payload: payload("new", 0),
            }])
            .await
            .unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        let hits = store.search(&[0.0, 1.0], 1).await.unwrap();
        assert_eq!(hits[0].payload.text, "new");
    }

    #[tokio::test]
    async fn test_similarity_reranker_orders_by_relevance() {
        let embedder = Arc::new(HashEmbedder::new(256));
        let reranker = SimilarityReranker::new(embedder);

        let documents = vec![
            "a recipe for grilled cheese".to_string(),
            "machine learning is a subset of AI".to_string(),
        ];

        let results = reranker
            .rerank("what is machine learning", &documents, 2)
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].index, 1);
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn test_similarity_reranker_failure_switch() {
        let embedder = Arc::new(HashEmbedder::new(64));
        let reranker = SimilarityReranker::new(embedder);
        reranker.set_failing(true);

        let result = reranker.rerank("query", &["doc".to_string()], 1).await;
        assert!(matches!(result, Err(e) if e.is_transient()));
    }

    #[tokio::test]
    async fn test_template_generator_cites_or_declines() {
        let generator = TemplateGenerator::new();

        let with_context = GenerationRequest::new("Sources:\n[1] Some snippet\n\nQuestion: x");
        let answer = generator.generate(&with_context).await.unwrap();
        assert!(answer.text.contains("[1]"));
        assert!(answer.usage.prompt_tokens > 0);

        let without_context = GenerationRequest::new("Question: x");
        let answer = generator.generate(&without_context).await.unwrap();
        assert_eq!(answer.text, OFFLINE_DECLINE);
    }
}
