//! Collaborator client factory.
//!
//! Builds the full set of collaborator handles from configuration. Clients
//! are constructed once at process start, shared across requests as
//! `Arc<dyn Trait>`, and dropped at process exit.

use crate::embedding::EmbeddingClient;
use crate::generation::GenerationClient;
use crate::providers::{
    CohereEmbedder, CohereReranker, GroqGenerator, HashEmbedder, MemoryStore, QdrantStore,
    SimilarityReranker, TemplateGenerator,
};
use crate::rerank::RerankClient;
use crate::retry::RetryPolicy;
use crate::store::VectorStore;
use minirag_core::{AppConfig, RagError, RagResult};
use std::sync::Arc;

/// The full set of external collaborators consumed by the pipeline.
pub struct Clients {
    pub embedder: Arc<dyn EmbeddingClient>,
    pub store: Arc<dyn VectorStore>,
    pub reranker: Arc<dyn RerankClient>,
    pub generator: Arc<dyn GenerationClient>,
}

impl Clients {
    /// Build collaborators from configuration.
    ///
    /// Offline mode wires the deterministic in-process providers; otherwise
    /// Cohere (embed + rerank), Qdrant, and Groq clients are created with
    /// the configured retry policy.
    pub async fn build(config: &AppConfig) -> RagResult<Clients> {
        if config.offline {
            tracing::info!("Using offline collaborators (deterministic, in-process)");
            return Ok(Self::offline(config.embedding_dim));
        }

        let retry = RetryPolicy::from_config(&config.retry);

        let cohere_key = config
            .cohere_api_key
            .clone()
            .ok_or_else(|| RagError::Config("COHERE_API_KEY is not set".to_string()))?;
        let groq_key = config
            .groq_api_key
            .clone()
            .ok_or_else(|| RagError::Config("GROQ_API_KEY is not set".to_string()))?;

        let embedder = Arc::new(CohereEmbedder::new(
            cohere_key.clone(),
            config.embedding_model.clone(),
            config.embedding_dim,
            retry,
        ));

        let store = Arc::new(
            QdrantStore::connect(
                config.qdrant_url.clone(),
                config.qdrant_api_key.clone(),
                config.collection.clone(),
                config.embedding_dim,
                retry,
            )
            .await?,
        );

        let reranker = Arc::new(CohereReranker::new(
            cohere_key,
            config.rerank_model.clone(),
            retry,
        ));

        let generator = Arc::new(GroqGenerator::new(
            groq_key,
            config.generation.model.clone(),
            retry,
        ));

        Ok(Clients {
            embedder,
            store,
            reranker,
            generator,
        })
    }

    /// Deterministic in-process collaborators (no network, no credentials).
    pub fn offline(dimensions: usize) -> Clients {
        let embedder: Arc<dyn EmbeddingClient> = Arc::new(HashEmbedder::new(dimensions));
        Clients {
            embedder: embedder.clone(),
            store: Arc::new(MemoryStore::new()),
            reranker: Arc::new(SimilarityReranker::new(embedder)),
            generator: Arc::new(TemplateGenerator::new()),
        }
    }
}
