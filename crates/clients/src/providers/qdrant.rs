//! Qdrant vector store provider (REST API).
//!
//! API reference: https://api.qdrant.tech/api-reference

use crate::retry::{transient_status, with_retry, RetryPolicy};
use crate::store::{ChunkPayload, ScoredPoint, StoredChunk, StoreHealth, VectorStore};
use minirag_core::{RagError, RagResult, Stage};
use serde::Deserialize;
use serde_json::json;

/// Qdrant-backed vector store.
///
/// One collection per store instance; the collection is created with cosine
/// distance on first connect if it does not exist.
pub struct QdrantStore {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    collection: String,
    dimensions: usize,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct QueryApiResponse {
    result: QueryApiResult,
}

#[derive(Debug, Deserialize)]
struct QueryApiResult {
    points: Vec<QueryApiPoint>,
}

#[derive(Debug, Deserialize)]
struct QueryApiPoint {
    id: serde_json::Value,
    score: f32,
    #[serde(default)]
    vector: Option<Vec<f32>>,
    payload: ChunkPayload,
}

#[derive(Debug, Deserialize)]
struct CountApiResponse {
    result: CountApiResult,
}

#[derive(Debug, Deserialize)]
struct CountApiResult {
    count: u64,
}

impl QdrantStore {
    /// Connect to Qdrant and ensure the collection exists with the expected
    /// vector dimension and cosine distance.
    pub async fn connect(
        base_url: impl Into<String>,
        api_key: Option<String>,
        collection: impl Into<String>,
        dimensions: usize,
        retry: RetryPolicy,
    ) -> RagResult<Self> {
        let store = Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key,
            collection: collection.into(),
            dimensions,
            retry,
        };

        store.ensure_collection().await?;
        Ok(store)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        if let Some(key) = &self.api_key {
            builder = builder.header("api-key", key);
        }
        builder
    }

    async fn ensure_collection(&self) -> RagResult<()> {
        let path = format!("/collections/{}", self.collection);
        let response = self
            .request(reqwest::Method::GET, &path)
            .send()
            .await
            .map_err(|e| RagError::store_transient(format!("Qdrant unreachable: {}", e)))?;

        if response.status().is_success() {
            return Ok(());
        }

        if response.status() != reqwest::StatusCode::NOT_FOUND {
            return Err(self.status_error(response).await);
        }

        tracing::info!(
            "Creating Qdrant collection '{}' (dim {}, cosine)",
            self.collection,
            self.dimensions
        );

        let body = json!({
            "vectors": { "size": self.dimensions, "distance": "Cosine" }
        });

        let response = self
            .request(reqwest::Method::PUT, &path)
            .json(&body)
            .send()
            .await
            .map_err(|e| RagError::store_transient(format!("Qdrant unreachable: {}", e)))?;

        if !response.status().is_success() {
            return Err(self.status_error(response).await);
        }

        Ok(())
    }

    async fn status_error(&self, response: reqwest::Response) -> RagError {
        let status = response.status();
        let detail = response.text().await.unwrap_or_default();
        let message = format!("Qdrant API error ({}): {}", status, detail);
        if transient_status(status) {
            RagError::store_transient(message)
        } else {
            RagError::store(message)
        }
    }

    async fn upsert_once(&self, chunks: &[StoredChunk]) -> RagResult<()> {
        let points: Vec<_> = chunks
            .iter()
            .map(|c| {
                json!({
                    "id": c.id,
                    "vector": c.vector,
                    "payload": c.payload,
                })
            })
            .collect();

        let path = format!("/collections/{}/points?wait=true", self.collection);
        let response = self
            .request(reqwest::Method::PUT, &path)
            .json(&json!({ "points": points }))
            .send()
            .await
            .map_err(|e| RagError::store_transient(format!("Upsert request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(self.status_error(response).await);
        }
        Ok(())
    }

    async fn search_once(&self, vector: &[f32], limit: usize) -> RagResult<Vec<ScoredPoint>> {
        let path = format!("/collections/{}/points/query", self.collection);
        let body = json!({
            "query": vector,
            "limit": limit,
            "with_payload": true,
            "with_vector": true,
        });

        let response = self
            .request(reqwest::Method::POST, &path)
            .json(&body)
            .send()
            .await
            .map_err(|e| RagError::store_transient(format!("Search request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(self.status_error(response).await);
        }

        let parsed: QueryApiResponse = response
            .json()
            .await
            .map_err(|e| RagError::store(format!("Failed to parse search response: {}", e)))?;

        Ok(parsed
            .result
            .points
            .into_iter()
            .map(|p| ScoredPoint {
                id: p
                    .id
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| p.id.to_string()),
                score: p.score,
                vector: p.vector.unwrap_or_default(),
                payload: p.payload,
            })
            .collect())
    }

    async fn count_once(&self) -> RagResult<u64> {
        let path = format!("/collections/{}/points/count", self.collection);
        let response = self
            .request(reqwest::Method::POST, &path)
            .json(&json!({ "exact": true }))
            .send()
            .await
            .map_err(|e| RagError::store_transient(format!("Count request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(self.status_error(response).await);
        }

        let parsed: CountApiResponse = response
            .json()
            .await
            .map_err(|e| RagError::store(format!("Failed to parse count response: {}", e)))?;

        Ok(parsed.result.count)
    }
}

#[async_trait::async_trait]
impl VectorStore for QdrantStore {
    async fn upsert(&self, chunks: Vec<StoredChunk>) -> RagResult<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        with_retry(&self.retry, Stage::Retrieve, || self.upsert_once(&chunks)).await?;
        tracing::debug!(
            "Upserted {} points into '{}'",
            chunks.len(),
            self.collection
        );
        Ok(())
    }

    async fn search(&self, vector: &[f32], limit: usize) -> RagResult<Vec<ScoredPoint>> {
        with_retry(&self.retry, Stage::Retrieve, || {
            self.search_once(vector, limit)
        })
        .await
    }

    async fn count(&self) -> RagResult<u64> {
        with_retry(&self.retry, Stage::Retrieve, || self.count_once()).await
    }

    async fn health(&self) -> StoreHealth {
        let path = format!("/collections/{}", self.collection);
        let exists = match self.request(reqwest::Method::GET, &path).send().await {
            Ok(response) => match response.status() {
                status if status.is_success() => Some(true),
                reqwest::StatusCode::NOT_FOUND => Some(false),
                _ => None,
            },
            Err(_) => None,
        };

        match exists {
            Some(collection_exists) => StoreHealth {
                connected: true,
                collection_exists,
                point_count: if collection_exists {
                    self.count_once().await.unwrap_or(0)
                } else {
                    0
                },
            },
            None => StoreHealth {
                connected: false,
                collection_exists: false,
                point_count: 0,
            },
        }
    }
}
