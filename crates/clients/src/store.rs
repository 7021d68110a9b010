//! Vector store collaborator interface.

use minirag_core::RagResult;
use serde::{Deserialize, Serialize};

/// Metadata stored alongside each chunk vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkPayload {
    /// Chunk text
    pub text: String,

    /// Owning document id
    pub document_id: String,

    /// 0-based position within the document
    pub chunk_index: u32,

    /// Optional document title
    #[serde(default)]
    pub title: Option<String>,

    /// Optional source label
    #[serde(default)]
    pub source: Option<String>,

    /// Token count of the chunk text
    #[serde(default)]
    pub token_count: u32,
}

/// A chunk ready for upsert: id, embedding, metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredChunk {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: ChunkPayload,
}

/// A search hit with its similarity score and stored embedding.
#[derive(Debug, Clone)]
pub struct ScoredPoint {
    pub id: String,
    pub score: f32,
    pub vector: Vec<f32>,
    pub payload: ChunkPayload,
}

/// Connectivity summary for health pass-through.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreHealth {
    pub connected: bool,
    pub collection_exists: bool,
    pub point_count: u64,
}

/// Trait for vector store backends.
///
/// The store is the only shared mutable resource in the system; backends
/// must be safe under concurrent upsert/search from independent requests.
#[async_trait::async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or update chunk vectors with their metadata.
    async fn upsert(&self, chunks: Vec<StoredChunk>) -> RagResult<()>;

    /// Approximate nearest-neighbor search. Returns up to `limit` points
    /// ordered by descending similarity, with stored vectors included.
    async fn search(&self, vector: &[f32], limit: usize) -> RagResult<Vec<ScoredPoint>>;

    /// Number of points in the collection.
    async fn count(&self) -> RagResult<u64>;

    /// Connectivity and collection status. Never fails; an unreachable
    /// store reports `connected: false`.
    async fn health(&self) -> StoreHealth;
}
