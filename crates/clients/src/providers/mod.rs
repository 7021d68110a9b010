//! Collaborator provider implementations.

pub mod cohere;
pub mod groq;
pub mod offline;
pub mod qdrant;

pub use cohere::{CohereEmbedder, CohereReranker};
pub use groq::GroqGenerator;
pub use offline::{HashEmbedder, MemoryStore, SimilarityReranker, TemplateGenerator};
pub use qdrant::QdrantStore;
