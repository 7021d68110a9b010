//! Configuration management for the minirag pipeline.
//!
//! Configuration is merged from three layers, later layers winning:
//! - Built-in defaults
//! - Optional YAML config file (`minirag.yaml` or `MINIRAG_CONFIG`)
//! - Environment variables (secrets are only ever read from the environment)
//!
//! Collaborator credentials are intentionally not part of the YAML schema so
//! that config files can be committed without leaking secrets.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{RagError, RagResult};

/// Text chunking parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Minimum tokens per chunk (soft target; the final chunk of a
    /// document and inputs shorter than the minimum may fall below it)
    #[serde(default = "default_min_tokens")]
    pub min_tokens: usize,

    /// Maximum tokens per chunk (hard bound, overlap included)
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Fraction of a chunk repeated at the start of its successor, in [0, 1)
    #[serde(default = "default_overlap_fraction")]
    pub overlap_fraction: f64,
}

fn default_min_tokens() -> usize {
    100
}

fn default_max_tokens() -> usize {
    1000
}

fn default_overlap_fraction() -> f64 {
    0.1
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            min_tokens: default_min_tokens(),
            max_tokens: default_max_tokens(),
            overlap_fraction: default_overlap_fraction(),
        }
    }
}

/// Retrieval and selection parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Candidate count at the initial vector search stage
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Final candidate count after reranking
    #[serde(default = "default_rerank_top_n")]
    pub rerank_top_n: usize,

    /// MMR trade-off: 1.0 is pure relevance, 0.0 is pure novelty
    #[serde(default = "default_mmr_lambda")]
    pub mmr_lambda: f32,

    /// Top scores below this mark the response as low-confidence
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
}

fn default_top_k() -> usize {
    10
}

fn default_rerank_top_n() -> usize {
    5
}

fn default_mmr_lambda() -> f32 {
    0.5
}

fn default_confidence_threshold() -> f32 {
    0.30
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            rerank_top_n: default_rerank_top_n(),
            mmr_lambda: default_mmr_lambda(),
            confidence_threshold: default_confidence_threshold(),
        }
    }
}

/// Answer generation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Chat model identifier
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Sampling temperature (low for factual answers)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum completion tokens
    #[serde(default = "default_max_completion_tokens")]
    pub max_tokens: u32,

    /// Price per 1000 tokens in USD (may be zero for free-tier models)
    #[serde(default = "default_price_per_1k")]
    pub price_per_1k_tokens_usd: f64,

    /// Optional note attached to cost estimates
    #[serde(default)]
    pub pricing_note: Option<String>,
}

fn default_llm_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_max_completion_tokens() -> u32 {
    1000
}

fn default_price_per_1k() -> f64 {
    0.0001
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: default_llm_model(),
            temperature: default_temperature(),
            max_tokens: default_max_completion_tokens(),
            price_per_1k_tokens_usd: default_price_per_1k(),
            pricing_note: None,
        }
    }
}

/// Retry behavior for external collaborator calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per call, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base backoff in milliseconds, doubled after each failed attempt
    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_backoff_ms() -> u64 {
    250
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_backoff_ms: default_base_backoff_ms(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Qdrant instance URL
    #[serde(default = "default_qdrant_url")]
    pub qdrant_url: String,

    /// Qdrant API key (environment only)
    #[serde(skip)]
    pub qdrant_api_key: Option<String>,

    /// Qdrant collection name
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Cohere API key for embeddings and reranking (environment only)
    #[serde(skip)]
    pub cohere_api_key: Option<String>,

    /// Groq API key for generation (environment only)
    #[serde(skip)]
    pub groq_api_key: Option<String>,

    /// Embedding model identifier
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Embedding vector dimension; must match the store collection
    #[serde(default = "default_embedding_dim")]
    pub embedding_dim: usize,

    /// Rerank model identifier
    #[serde(default = "default_rerank_model")]
    pub rerank_model: String,

    #[serde(default)]
    pub chunking: ChunkingConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    /// Request-level wall-clock budget in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Use deterministic in-process collaborators instead of remote APIs
    #[serde(default)]
    pub offline: bool,

    /// Log level override
    #[serde(skip)]
    pub log_level: Option<String>,
}

fn default_qdrant_url() -> String {
    "http://localhost:6333".to_string()
}

fn default_collection() -> String {
    "rag_documents".to_string()
}

fn default_embedding_model() -> String {
    "embed-english-v3.0".to_string()
}

fn default_embedding_dim() -> usize {
    1024
}

fn default_rerank_model() -> String {
    "rerank-english-v3.0".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            qdrant_url: default_qdrant_url(),
            qdrant_api_key: None,
            collection: default_collection(),
            cohere_api_key: None,
            groq_api_key: None,
            embedding_model: default_embedding_model(),
            embedding_dim: default_embedding_dim(),
            rerank_model: default_rerank_model(),
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            generation: GenerationConfig::default(),
            retry: RetryConfig::default(),
            request_timeout_secs: default_request_timeout_secs(),
            offline: false,
            log_level: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from the config file and environment variables.
    ///
    /// Environment variables:
    /// - `MINIRAG_CONFIG`: path to a YAML config file
    /// - `QDRANT_URL`, `QDRANT_API_KEY`, `QDRANT_COLLECTION`
    /// - `COHERE_API_KEY`, `GROQ_API_KEY`
    /// - `MINIRAG_OFFLINE`: any value enables offline collaborators
    /// - `RUST_LOG`: log level
    pub fn load() -> RagResult<Self> {
        let mut config = Self::default();

        // YAML file first so environment variables can override it
        let config_path = std::env::var("MINIRAG_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("minirag.yaml"));

        if config_path.exists() {
            config = Self::from_file(&config_path)?;
        }

        if let Ok(url) = std::env::var("QDRANT_URL") {
            config.qdrant_url = url;
        }
        if let Ok(collection) = std::env::var("QDRANT_COLLECTION") {
            config.collection = collection;
        }
        config.qdrant_api_key = std::env::var("QDRANT_API_KEY").ok();
        config.cohere_api_key = std::env::var("COHERE_API_KEY").ok();
        config.groq_api_key = std::env::var("GROQ_API_KEY").ok();
        config.log_level = std::env::var("RUST_LOG").ok();

        if std::env::var("MINIRAG_OFFLINE").is_ok() {
            config.offline = true;
        }

        Ok(config)
    }

    /// Parse configuration from a YAML file.
    pub fn from_file(path: &PathBuf) -> RagResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            RagError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config: AppConfig = serde_yaml::from_str(&contents).map_err(|e| {
            RagError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        Ok(config)
    }

    /// Validate parameter ranges and, for remote collaborators, the
    /// presence of credentials.
    pub fn validate(&self) -> RagResult<()> {
        if self.chunking.min_tokens == 0 || self.chunking.max_tokens < self.chunking.min_tokens {
            return Err(RagError::Config(format!(
                "Invalid chunk token range [{}, {}]",
                self.chunking.min_tokens, self.chunking.max_tokens
            )));
        }

        if !(0.0..1.0).contains(&self.chunking.overlap_fraction) {
            return Err(RagError::Config(format!(
                "Overlap fraction must be in [0, 1): {}",
                self.chunking.overlap_fraction
            )));
        }

        if !(0.0..=1.0).contains(&self.retrieval.mmr_lambda) {
            return Err(RagError::Config(format!(
                "MMR lambda must be in [0, 1]: {}",
                self.retrieval.mmr_lambda
            )));
        }

        if self.retrieval.top_k == 0 || self.retrieval.rerank_top_n == 0 {
            return Err(RagError::Config(
                "top_k and rerank_top_n must be positive".to_string(),
            ));
        }

        if self.embedding_dim == 0 {
            return Err(RagError::Config(
                "Embedding dimension must be positive".to_string(),
            ));
        }

        if !self.offline {
            if self.cohere_api_key.is_none() {
                return Err(RagError::Config(
                    "COHERE_API_KEY is required unless running offline".to_string(),
                ));
            }
            if self.groq_api_key.is_none() {
                return Err(RagError::Config(
                    "GROQ_API_KEY is required unless running offline".to_string(),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.collection, "rag_documents");
        assert_eq!(config.embedding_dim, 1024);
        assert_eq!(config.retrieval.top_k, 10);
        assert_eq!(config.retrieval.rerank_top_n, 5);
        assert_eq!(config.generation.model, "llama-3.3-70b-versatile");
        assert!(!config.offline);
    }

    #[test]
    fn test_default_config_validates_offline() {
        let config = AppConfig {
            offline: true,
            ..AppConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_requires_keys_online() {
        let config = AppConfig::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_chunk_range() {
        let mut config = AppConfig {
            offline: true,
            ..AppConfig::default()
        };
        config.chunking.min_tokens = 500;
        config.chunking.max_tokens = 100;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_overlap_fraction() {
        let mut config = AppConfig {
            offline: true,
            ..AppConfig::default()
        };
        config.chunking.overlap_fraction = 1.0;
        assert!(config.validate().is_err());

        config.chunking.overlap_fraction = 0.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_lambda_range() {
        let mut config = AppConfig {
            offline: true,
            ..AppConfig::default()
        };
        config.retrieval.mmr_lambda = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_partial_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "collection: test_docs\nretrieval:\n  top_k: 20\nchunking:\n  max_tokens: 512"
        )
        .unwrap();

        let config = AppConfig::from_file(&file.path().to_path_buf()).unwrap();
        assert_eq!(config.collection, "test_docs");
        assert_eq!(config.retrieval.top_k, 20);
        assert_eq!(config.chunking.max_tokens, 512);
        // Unspecified fields keep their defaults
        assert_eq!(config.retrieval.rerank_top_n, 5);
        assert_eq!(config.embedding_dim, 1024);
    }
}
