//! External collaborator clients for the minirag pipeline.
//!
//! Defines the four collaborator interfaces the pipeline consumes
//! (embedding, vector store, reranking, and generation) together with the
//! remote providers (Cohere, Qdrant, Groq), deterministic offline
//! providers, and the shared retry policy.

pub mod embedding;
pub mod factory;
pub mod generation;
pub mod providers;
pub mod rerank;
pub mod retry;
pub mod similarity;
pub mod store;

// Re-export commonly used types
pub use embedding::{EmbeddingClient, EmbeddingInput};
pub use factory::Clients;
pub use generation::{Generation, GenerationClient, GenerationRequest, TokenUsage};
pub use rerank::{Reranked, RerankClient};
pub use retry::RetryPolicy;
pub use similarity::cosine_similarity;
pub use store::{ChunkPayload, ScoredPoint, StoredChunk, StoreHealth, VectorStore};
