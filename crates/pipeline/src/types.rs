//! Pipeline type definitions: request/response shapes and the ephemeral
//! candidate representation used between retrieval stages.

use chrono::{DateTime, Utc};
use minirag_clients::{ChunkPayload, ScoredPoint};
use minirag_core::{RagError, RagResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A document accepted for ingestion. Immutable once created; this core
/// never mutates or deletes documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Opaque identifier
    pub id: String,

    /// Optional title
    pub title: Option<String>,

    /// Optional source label
    pub source: Option<String>,

    /// Raw text as submitted
    pub raw_text: String,

    /// When the document was ingested
    pub created_at: DateTime<Utc>,
}

/// Ingestion request, validated at the boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestRequest {
    /// Text content to ingest (required, non-empty)
    pub text: String,

    /// Optional document title
    #[serde(default)]
    pub title: Option<String>,

    /// Optional document source
    #[serde(default)]
    pub source: Option<String>,
}

impl IngestRequest {
    pub fn validate(&self) -> RagResult<()> {
        if self.text.trim().is_empty() {
            return Err(RagError::InvalidRequest(
                "Ingest text must be non-empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Ingestion response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestOutcome {
    pub message: String,
    pub chunks_created: usize,
    pub document_id: String,
}

/// Query request, validated at the boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// User question (required, non-empty)
    pub query: String,
}

impl QueryRequest {
    pub fn validate(&self) -> RagResult<()> {
        if self.query.trim().is_empty() {
            return Err(RagError::InvalidRequest(
                "Query must be non-empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// A retrieval candidate: chunk metadata, its embedding, and the current
/// relevance score. Ephemeral, produced per query, never persisted. The
/// score field is rewritten as the candidate moves through the stages
/// (vector similarity, then rerank relevance).
#[derive(Debug, Clone)]
pub struct Candidate {
    pub id: String,
    pub payload: ChunkPayload,
    pub score: f32,
    pub embedding: Vec<f32>,
}

impl From<ScoredPoint> for Candidate {
    fn from(point: ScoredPoint) -> Self {
        Self {
            id: point.id,
            payload: point.payload,
            score: point.score,
            embedding: point.vector,
        }
    }
}

/// A source snippet returned with the answer, in prompt order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceChunk {
    pub text: String,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub source: Option<String>,

    /// 0-based position of the chunk within its document
    pub chunk_index: u32,

    /// Relevance score from the final selection stage
    pub score: f32,

    /// Whether the answer actually cited this snippet
    pub cited: bool,
}

/// Token accounting and price estimate for one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostEstimate {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    pub estimated_cost_usd: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Query response: answer, audit-ready source list, per-stage timing and
/// cost accounting, and the answerability signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryOutcome {
    pub answer: String,
    pub sources: Vec<SourceChunk>,

    /// Flat metric map: stage name -> seconds, plus flag entries
    pub timing: BTreeMap<String, f64>,

    pub cost_estimate: CostEstimate,
    pub has_answer: bool,
}

/// Health pass-through for the vector store collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub vector_store_connected: bool,
    pub collection_exists: bool,
    pub document_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_request_validation() {
        let request = IngestRequest {
            text: "some content".to_string(),
            title: None,
            source: None,
        };
        assert!(request.validate().is_ok());

        let empty = IngestRequest {
            text: "   \n\t ".to_string(),
            title: None,
            source: None,
        };
        assert!(matches!(
            empty.validate(),
            Err(RagError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_query_request_validation() {
        assert!(QueryRequest {
            query: "what is this?".to_string()
        }
        .validate()
        .is_ok());

        assert!(QueryRequest {
            query: "".to_string()
        }
        .validate()
        .is_err());
    }

    #[test]
    fn test_candidate_from_scored_point() {
        let point = ScoredPoint {
            id: "p1".to_string(),
            score: 0.8,
            vector: vec![1.0, 0.0],
            payload: ChunkPayload {
                text: "chunk".to_string(),
                document_id: "d1".to_string(),
                chunk_index: 2,
                title: None,
                source: None,
                token_count: 1,
            },
        };

        let candidate = Candidate::from(point);
        assert_eq!(candidate.id, "p1");
        assert_eq!(candidate.score, 0.8);
        assert_eq!(candidate.payload.chunk_index, 2);
    }
}
