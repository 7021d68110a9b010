//! Retrieval-augmented answering pipeline.
//!
//! Orchestrates the full flow over the collaborator clients: document
//! chunking and ingestion on one side, and query answering on the other
//! (embed, vector search, MMR selection, rerank, prompt assembly,
//! generation, citation mapping). Every query carries per-stage timing and
//! a cost estimate.

pub mod chunker;
pub mod citations;
pub mod metrics;
pub mod mmr;
pub mod pipeline;
pub mod prompt;
pub mod types;


pub use chunker::{ChunkDraft, ChunkingEngine};
pub use citations::{map_citations, CitationMap};
pub use metrics::MetricsCollector;
pub use pipeline::Pipeline;
pub use types::{
    Document, HealthReport, IngestOutcome, IngestRequest, QueryOutcome, QueryRequest,
    SourceChunk,
};
