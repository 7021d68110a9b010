//! Error types for the minirag pipeline.
//!
//! Every failure is tagged with the pipeline stage at which it occurred so
//! that timing and metrics reflect exactly how far a request progressed.
//! Errors from external collaborators additionally carry a transience flag
//! driving the retry policy: transient failures (network errors, rate
//! limits, server errors) are retried, non-transient ones are not.

use std::fmt;
use thiserror::Error;

/// Named pipeline stages, used for error tagging and timing keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Chunk,
    Embed,
    Retrieve,
    Rerank,
    Generate,
}

impl Stage {
    /// Stable lowercase name used as a timing/metric key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Chunk => "chunk",
            Stage::Embed => "embed",
            Stage::Retrieve => "retrieve",
            Stage::Rerank => "rerank",
            Stage::Generate => "generate",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified error type for the retrieval-and-answer pipeline.
#[derive(Error, Debug)]
pub enum RagError {
    /// Malformed ingestion input (empty or whitespace-only text)
    #[error("Chunking error: {0}")]
    Chunking(String),

    /// Embedding collaborator failure
    #[error("Embedding error: {message}")]
    Embedding { message: String, transient: bool },

    /// Vector store collaborator failure
    #[error("Vector store error: {message}")]
    Store { message: String, transient: bool },

    /// Reranking collaborator failure (degradable: callers may fall back
    /// to the pre-rerank ordering instead of aborting)
    #[error("Rerank error: {message}")]
    Rerank { message: String, transient: bool },

    /// Generation collaborator failure (fatal for the request)
    #[error("Generation error: {message}")]
    Generation { message: String, transient: bool },

    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Request rejected at the boundary before entering the pipeline
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A stage exceeded the remaining request time budget
    #[error("Stage '{stage}' timed out after {elapsed_secs:.1}s")]
    Timeout { stage: Stage, elapsed_secs: f64 },

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl RagError {
    pub fn embedding(message: impl Into<String>) -> Self {
        RagError::Embedding {
            message: message.into(),
            transient: false,
        }
    }

    pub fn embedding_transient(message: impl Into<String>) -> Self {
        RagError::Embedding {
            message: message.into(),
            transient: true,
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        RagError::Store {
            message: message.into(),
            transient: false,
        }
    }

    pub fn store_transient(message: impl Into<String>) -> Self {
        RagError::Store {
            message: message.into(),
            transient: true,
        }
    }

    pub fn rerank(message: impl Into<String>) -> Self {
        RagError::Rerank {
            message: message.into(),
            transient: false,
        }
    }

    pub fn rerank_transient(message: impl Into<String>) -> Self {
        RagError::Rerank {
            message: message.into(),
            transient: true,
        }
    }

    pub fn generation(message: impl Into<String>) -> Self {
        RagError::Generation {
            message: message.into(),
            transient: false,
        }
    }

    pub fn generation_transient(message: impl Into<String>) -> Self {
        RagError::Generation {
            message: message.into(),
            transient: true,
        }
    }

    /// Whether the failure is worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            RagError::Embedding { transient, .. }
            | RagError::Store { transient, .. }
            | RagError::Rerank { transient, .. }
            | RagError::Generation { transient, .. } => *transient,
            _ => false,
        }
    }

    /// The pipeline stage this error is associated with, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            RagError::Chunking(_) => Some(Stage::Chunk),
            RagError::Embedding { .. } => Some(Stage::Embed),
            RagError::Store { .. } => Some(Stage::Retrieve),
            RagError::Rerank { .. } => Some(Stage::Rerank),
            RagError::Generation { .. } => Some(Stage::Generate),
            RagError::Timeout { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for RagError {
    fn from(err: serde_json::Error) -> Self {
        RagError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for RagError {
    fn from(err: serde_yaml::Error) -> Self {
        RagError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with RagError.
pub type RagResult<T> = Result<T, RagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(RagError::embedding_transient("rate limited").is_transient());
        assert!(!RagError::embedding("bad request").is_transient());
        assert!(!RagError::Config("missing key".to_string()).is_transient());
    }

    #[test]
    fn test_stage_tagging() {
        assert_eq!(RagError::embedding("x").stage(), Some(Stage::Embed));
        assert_eq!(RagError::store("x").stage(), Some(Stage::Retrieve));
        assert_eq!(RagError::rerank("x").stage(), Some(Stage::Rerank));
        assert_eq!(RagError::generation("x").stage(), Some(Stage::Generate));
        assert_eq!(RagError::Config("x".to_string()).stage(), None);

        let timeout = RagError::Timeout {
            stage: Stage::Generate,
            elapsed_secs: 30.0,
        };
        assert_eq!(timeout.stage(), Some(Stage::Generate));
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::Embed.as_str(), "embed");
        assert_eq!(Stage::Retrieve.as_str(), "retrieve");
        assert_eq!(Stage::Rerank.as_str(), "rerank");
        assert_eq!(Stage::Generate.as_str(), "generate");
        assert_eq!(format!("{}", Stage::Embed), "embed");
    }

    #[test]
    fn test_error_display() {
        let err = RagError::rerank("upstream 500");
        assert_eq!(err.to_string(), "Rerank error: upstream 500");

        let err = RagError::Chunking("empty input".to_string());
        assert!(err.to_string().contains("Chunking error"));
    }
}
