//! Request orchestration: ingestion and query answering.
//!
//! The [`Pipeline`] owns the chunking engine and shared collaborator
//! handles and drives both flows end to end. Queries run under a
//! wall-clock budget: every collaborator call is bounded by the time
//! remaining, and a stage that exceeds it fails the request with a
//! timeout tagged to that stage. Rerank failures are the one exception
//! where the request continues on the pre-rerank ordering.

use crate::chunker::{self, ChunkingEngine};
use crate::citations;
use crate::metrics::{self, MetricsCollector};
use crate::mmr;
use crate::prompt;
use crate::types::{
    Candidate, Document, HealthReport, IngestOutcome, IngestRequest, QueryOutcome, QueryRequest,
    SourceChunk,
};
use chrono::Utc;
use minirag_clients::{
    ChunkPayload, Clients, EmbeddingClient, EmbeddingInput, GenerationClient, GenerationRequest,
    RerankClient, StoredChunk, TokenUsage, VectorStore,
};
use minirag_core::error::Stage;
use minirag_core::{AppConfig, RagError, RagResult};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Tracks a request's wall-clock budget.
struct RequestClock {
    started: Instant,
    deadline: Instant,
}

impl RequestClock {
    fn new(budget: Duration) -> Self {
        let started = Instant::now();
        Self {
            started,
            deadline: started + budget,
        }
    }

    fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    fn elapsed_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }
}

/// Run one stage under the remaining request budget, recording its
/// wall-clock time whether it succeeds, fails, or times out.
async fn timed<T, F>(
    stage: Stage,
    clock: &RequestClock,
    collector: &mut MetricsCollector,
    fut: F,
) -> RagResult<T>
where
    F: Future<Output = RagResult<T>>,
{
    let remaining = clock.remaining();
    let started = Instant::now();

    if remaining.is_zero() {
        return Err(RagError::Timeout {
            stage,
            elapsed_secs: clock.elapsed_secs(),
        });
    }

    let result = tokio::time::timeout(remaining, fut).await;
    collector.record_stage(stage, started.elapsed());

    match result {
        Ok(inner) => inner,
        Err(_) => Err(RagError::Timeout {
            stage,
            elapsed_secs: clock.elapsed_secs(),
        }),
    }
}

/// The retrieval-and-answer pipeline.
///
/// Holds no per-request state; a single instance serves concurrent
/// requests.
pub struct Pipeline {
    config: AppConfig,
    chunker: ChunkingEngine,
    embedder: Arc<dyn EmbeddingClient>,
    store: Arc<dyn VectorStore>,
    reranker: Arc<dyn RerankClient>,
    generator: Arc<dyn GenerationClient>,
}

impl Pipeline {
    pub fn new(config: AppConfig, clients: Clients) -> Self {
        Self {
            chunker: ChunkingEngine::from_config(&config.chunking),
            config,
            embedder: clients.embedder,
            store: clients.store,
            reranker: clients.reranker,
            generator: clients.generator,
        }
    }

    /// Build the pipeline from configuration, constructing collaborators.
    pub async fn from_config(config: AppConfig) -> RagResult<Self> {
        let clients = Clients::build(&config).await?;
        Ok(Self::new(config, clients))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Ingest one document: chunk, embed, upsert.
    pub async fn ingest(&self, request: IngestRequest) -> RagResult<IngestOutcome> {
        request.validate()?;
        let started = Instant::now();

        let document = Document {
            id: Uuid::new_v4().to_string(),
            title: request.title,
            source: request.source,
            raw_text: request.text,
            created_at: Utc::now(),
        };

        let drafts = self.chunker.split_document(&document)?;
        tracing::debug!("Chunking stats: {:?}", chunker::chunking_stats(&drafts));
        let texts: Vec<String> = drafts.iter().map(|d| d.text.clone()).collect();

        let vectors = self
            .embedder
            .embed_batch(&texts, EmbeddingInput::Document)
            .await?;
        if vectors.len() != drafts.len() {
            return Err(RagError::embedding(format!(
                "Expected {} embeddings, got {}",
                drafts.len(),
                vectors.len()
            )));
        }

        let chunks: Vec<StoredChunk> = drafts
            .into_iter()
            .zip(vectors)
            .map(|(draft, vector)| StoredChunk {
                id: Uuid::new_v4().to_string(),
                vector,
                payload: ChunkPayload {
                    text: draft.text,
                    document_id: document.id.clone(),
                    chunk_index: draft.position,
                    title: document.title.clone(),
                    source: document.source.clone(),
                    token_count: draft.token_count,
                },
            })
            .collect();

        let chunks_created = chunks.len();
        self.store.upsert(chunks).await?;

        let elapsed = started.elapsed().as_secs_f64();
        tracing::info!(
            "Ingested document {} as {} chunks in {:.2}s",
            document.id,
            chunks_created,
            elapsed
        );

        Ok(IngestOutcome {
            message: format!("Document ingested successfully in {:.2}s", elapsed),
            chunks_created,
            document_id: document.id,
        })
    }

    /// Answer a query: embed, search, MMR-select, rerank, generate.
    pub async fn query(&self, request: QueryRequest) -> RagResult<QueryOutcome> {
        request.validate()?;

        let clock = RequestClock::new(Duration::from_secs(self.config.request_timeout_secs));
        let mut collector = MetricsCollector::new();

        match self.run_query(&request.query, &clock, &mut collector).await {
            Ok(mut outcome) => {
                outcome.timing = collector.finish();
                tracing::info!(
                    "Answered query in {:.2}s (has_answer: {})",
                    clock.elapsed_secs(),
                    outcome.has_answer
                );
                Ok(outcome)
            }
            Err(err) => {
                // Completed-stage timings still matter for diagnosing where
                // the budget went
                tracing::warn!(
                    "Query failed at stage {:?} after {:.2}s: {} (completed stages: {:?})",
                    err.stage(),
                    clock.elapsed_secs(),
                    err,
                    collector.finish()
                );
                Err(err)
            }
        }
    }

    async fn run_query(
        &self,
        query: &str,
        clock: &RequestClock,
        collector: &mut MetricsCollector,
    ) -> RagResult<QueryOutcome> {
        let retrieval = &self.config.retrieval;

        let query_vector = timed(
            Stage::Embed,
            clock,
            collector,
            self.embedder.embed(query, EmbeddingInput::Query),
        )
        .await?;

        // Over-fetch so MMR has a diverse pool to choose from
        let fetch_limit = retrieval.top_k * 2;
        let points = timed(
            Stage::Retrieve,
            clock,
            collector,
            self.store.search(&query_vector, fetch_limit),
        )
        .await?;

        let candidates: Vec<Candidate> = points.into_iter().map(Candidate::from).collect();
        // When the whole pool fits there is nothing to diversify; keep the
        // store's relevance ordering
        let selected = if candidates.len() <= retrieval.top_k {
            candidates
        } else {
            mmr::select(&candidates, retrieval.top_k, retrieval.mmr_lambda)
        };
        let finalists = self
            .rerank_or_degrade(query, selected, clock, collector)
            .await?;

        let has_context = !finalists.is_empty();
        let top_score = finalists.first().map(|c| c.score).unwrap_or(0.0);
        let low_confidence = has_context && top_score < retrieval.confidence_threshold;
        if low_confidence {
            tracing::debug!(
                "Top score {:.3} below confidence threshold {:.3}",
                top_score,
                retrieval.confidence_threshold
            );
        }

        let context = prompt::build_context(&finalists);
        let user_prompt = prompt::build_prompt(query, &context, low_confidence);
        let generation_request = GenerationRequest::new(user_prompt.clone())
            .with_system(prompt::SYSTEM_PROMPT)
            .with_temperature(self.config.generation.temperature)
            .with_max_tokens(self.config.generation.max_tokens);

        let generation = timed(
            Stage::Generate,
            clock,
            collector,
            self.generator.generate(&generation_request),
        )
        .await?;

        let citation_map = citations::map_citations(&generation.text, finalists.len());
        if !citation_map.out_of_range.is_empty() {
            tracing::warn!(
                "Answer cites markers with no matching source: {:?}",
                citation_map.out_of_range
            );
        }

        let sources: Vec<SourceChunk> = finalists
            .iter()
            .enumerate()
            .map(|(i, candidate)| SourceChunk {
                text: candidate.payload.text.clone(),
                title: candidate.payload.title.clone(),
                source: candidate.payload.source.clone(),
                chunk_index: candidate.payload.chunk_index,
                score: candidate.score,
                cited: citation_map.cites(i + 1),
            })
            .collect();

        let has_answer = has_context && !low_confidence && !prompt::is_no_answer(&generation.text);

        let (usage, note) = if generation.usage.is_empty() {
            (
                TokenUsage::new(
                    metrics::approx_token_count(&user_prompt),
                    metrics::approx_token_count(&generation.text),
                ),
                Some("Token counts approximated from whitespace tokens".to_string()),
            )
        } else {
            (
                generation.usage.clone(),
                self.config.generation.pricing_note.clone(),
            )
        };
        let cost_estimate = metrics::estimate_cost(
            &usage,
            self.config.generation.price_per_1k_tokens_usd,
            note,
        );

        Ok(QueryOutcome {
            answer: generation.text,
            sources,
            timing: BTreeMap::new(),
            cost_estimate,
            has_answer,
        })
    }

    /// Rerank the MMR selection, falling back to its original order
    /// (truncated to `rerank_top_n`) when the reranker fails. Timeouts are
    /// not degradable; the budget is already spent.
    async fn rerank_or_degrade(
        &self,
        query: &str,
        selected: Vec<Candidate>,
        clock: &RequestClock,
        collector: &mut MetricsCollector,
    ) -> RagResult<Vec<Candidate>> {
        if selected.is_empty() {
            return Ok(selected);
        }

        let top_n = self.config.retrieval.rerank_top_n;
        let documents: Vec<String> = selected.iter().map(|c| c.payload.text.clone()).collect();

        let ranked = timed(
            Stage::Rerank,
            clock,
            collector,
            self.reranker.rerank(query, &documents, top_n),
        )
        .await;

        match ranked {
            Ok(ranked) => Ok(ranked
                .into_iter()
                .filter_map(|r| {
                    selected.get(r.index).map(|candidate| {
                        let mut candidate = candidate.clone();
                        candidate.score = r.score;
                        candidate
                    })
                })
                .collect()),
            Err(err @ RagError::Timeout { .. }) => Err(err),
            Err(err) => {
                tracing::warn!("Rerank failed, keeping pre-rerank order: {}", err);
                collector.flag("rerank_degraded");
                Ok(selected.into_iter().take(top_n).collect())
            }
        }
    }

    /// Vector store connectivity pass-through.
    pub async fn health(&self) -> HealthReport {
        let store = self.store.health().await;
        HealthReport {
            status: if store.connected { "ok" } else { "degraded" }.to_string(),
            vector_store_connected: store.connected,
            collection_exists: store.collection_exists,
            document_count: store.point_count,
        }
    }
}
