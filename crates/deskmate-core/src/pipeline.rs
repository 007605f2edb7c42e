//! The request pipeline: one query in, one event stream out.
//!
//! Per-request lifecycle:
//!
//! ```text
//! RECEIVED ──► EMBEDDING ──► RETRIEVED ──┬──► REJECTED            (terminal)
//!                                        │
//!                                        └──► GENERATING ──► COMPLETE
//! ```
//!
//! - `RECEIVED → RETRIEVED`: embed the query, run both indexes, fuse.
//!   Structurally this always succeeds; an embedder failure degrades to
//!   the refusal path, never to a protocol error.
//! - `RETRIEVED → REJECTED`: the relevance gate refuses; emit the refusal
//!   answer and an empty chunks list.
//! - `RETRIEVED → GENERATING`: build the context, stream tokens from the
//!   orchestrator (which absorbs backend failures into a fallback token).
//! - `GENERATING → COMPLETE`: emit exactly one answer event (accumulated
//!   text, or a placeholder if the backend produced nothing) followed by
//!   exactly one chunks event.
//!
//! Every path ends with the same well-formed terminal pair. Events for one
//! query are strictly ordered; across queries there is no ordering, since
//! the store is read-only and shared by any number of concurrent pipelines.
//! Cancellation is dropping the stream: the generator and its outbound
//! backend connection are released with it, and nothing is persisted.

use std::sync::Arc;

use async_stream::stream;
use futures::{Stream, StreamExt};

use crate::bm25::tokenize;
use crate::config::{DeskmateConfig, RetrievalConfig};
use crate::constants::{EMPTY_ANSWER, REFUSAL_ANSWER};
use crate::embed::{create_embedder, QueryEmbedder};
use crate::errors::DeskmateError;
use crate::fusion::{fuse, round_score, FusedScore, FusionConfig};
use crate::generation::Orchestrator;
use crate::store::KnowledgeStore;
use crate::types::{FusedResult, QueryOptions, ReadinessReport, StreamEvent};
use crate::validator::is_relevant;

/// The assembled engine: store, embedder, orchestrator, tuning.
///
/// Cheap to clone (the store and backends are shared); each call to
/// [`Pipeline::answer`] runs as an independent task over the shared
/// read-only state.
#[derive(Clone)]
pub struct Pipeline {
    store: Arc<KnowledgeStore>,
    embedder: Arc<dyn QueryEmbedder>,
    orchestrator: Orchestrator,
    retrieval: RetrievalConfig,
}

impl Pipeline {
    /// Assemble a pipeline from already-constructed parts.
    pub fn new(
        store: Arc<KnowledgeStore>,
        embedder: Arc<dyn QueryEmbedder>,
        orchestrator: Orchestrator,
        retrieval: RetrievalConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            orchestrator,
            retrieval,
        }
    }

    /// Load artifacts and resolve providers from configuration.
    ///
    /// This is the process-startup path: any error here is a startup
    /// failure and the process must not serve traffic.
    pub fn from_config(config: &DeskmateConfig) -> Result<Self, DeskmateError> {
        let store = Arc::new(KnowledgeStore::load(
            &config.artifacts.dir,
            config.retrieval.bm25,
            &config.embedding,
        )?);
        let embedder: Arc<dyn QueryEmbedder> = Arc::from(create_embedder(&config.embedding)?);
        let orchestrator = Orchestrator::from_config(&config.generation)?;

        Ok(Self::new(
            store,
            embedder,
            orchestrator,
            config.retrieval.clone(),
        ))
    }

    /// The loaded knowledge store.
    pub fn store(&self) -> &KnowledgeStore {
        &self.store
    }

    /// Readiness for the health-check surface.
    pub fn readiness(&self) -> ReadinessReport {
        self.store.readiness()
    }

    /// Whether both indexes are loaded.
    pub fn ready(&self) -> bool {
        self.readiness().ready
    }

    /// Search-only path: fused results without generation.
    pub async fn retrieve(
        &self,
        query: &str,
        opts: &QueryOptions,
    ) -> Result<Vec<FusedResult>, DeskmateError> {
        if query.trim().is_empty() {
            return Err(DeskmateError::InvalidArgument(
                "Query cannot be empty".to_string(),
            ));
        }
        let scored = self.retrieve_scored(query, opts).await?;
        Ok(self.materialize(&scored))
    }

    /// Answer a query as a stream of protocol events.
    ///
    /// The returned stream is independent of `self`'s lifetime; dropping
    /// it cancels the request.
    pub fn answer(&self, query: &str) -> impl Stream<Item = StreamEvent> + Send + 'static {
        let pipeline = self.clone();
        let query = query.trim().to_string();

        stream! {
            tracing::debug!(query = %query, "query received");

            if query.is_empty() {
                yield StreamEvent::Answer(REFUSAL_ANSWER.to_string());
                yield StreamEvent::Chunks(Vec::new());
                return;
            }

            let scored = match pipeline
                .retrieve_scored(&query, &QueryOptions::default())
                .await
            {
                Ok(scored) => scored,
                Err(err) => {
                    // Per-query failures never surface as protocol errors;
                    // degrade to the refusal path.
                    tracing::warn!(error = %err, "retrieval degraded, refusing query");
                    yield StreamEvent::Answer(REFUSAL_ANSWER.to_string());
                    yield StreamEvent::Chunks(Vec::new());
                    return;
                }
            };

            tracing::debug!(results = scored.len(), "retrieval complete");

            if !is_relevant(&scored, pipeline.retrieval.relevance.threshold) {
                tracing::info!(query = %query, "relevance gate refused query");
                yield StreamEvent::Answer(REFUSAL_ANSWER.to_string());
                yield StreamEvent::Chunks(Vec::new());
                return;
            }

            let chunks = pipeline.materialize(&scored);
            let context = build_context(&chunks);
            tracing::debug!(
                chunks = chunks.len(),
                context_chars = context.len(),
                "generating answer"
            );

            let tokens = pipeline.orchestrator.stream_answer(&query, &context);
            futures::pin_mut!(tokens);

            let mut answer = String::new();
            while let Some(token) = tokens.next().await {
                answer.push_str(&token);
                yield StreamEvent::Token(token);
            }

            let answer = answer.trim().to_string();
            let answer = if answer.is_empty() {
                EMPTY_ANSWER.to_string()
            } else {
                answer
            };

            yield StreamEvent::Answer(answer);
            yield StreamEvent::Chunks(chunks);
            tracing::debug!("query complete");
        }
    }

    /// Run both indexes and fuse, returning full-precision scores.
    async fn retrieve_scored(
        &self,
        query: &str,
        opts: &QueryOptions,
    ) -> Result<Vec<FusedScore>, DeskmateError> {
        let fusion_config = FusionConfig {
            final_k: opts.top_k.unwrap_or(self.retrieval.fusion.final_k),
            alpha: opts.alpha.unwrap_or(self.retrieval.fusion.alpha),
            rrf_k: self.retrieval.fusion.rrf_k,
        };

        let embedding = self.embedder.embed(query).await?;

        let dense_hits = self
            .store
            .vectors()
            .search(&embedding, fusion_config.final_k.saturating_mul(2))?;
        if let Some(best) = dense_hits.first() {
            tracing::debug!(
                doc_id = best.doc_id,
                similarity = best.similarity(),
                "dense retrieval complete"
            );
        }
        let lexical_scores = self.store.bm25().scores(&tokenize(query));

        fuse(&dense_hits, &lexical_scores, &fusion_config)
    }

    /// Materialize external results from full-precision fused scores.
    fn materialize(&self, scored: &[FusedScore]) -> Vec<FusedResult> {
        scored
            .iter()
            .filter_map(|fused| {
                self.store.document(fused.doc_id).map(|doc| FusedResult {
                    question: doc.question.clone(),
                    answer: doc.answer.clone(),
                    score: round_score(fused.score),
                    source: doc.source.clone(),
                })
            })
            .collect()
    }
}

/// Concatenate fused results into the generation context.
fn build_context(chunks: &[FusedResult]) -> String {
    chunks
        .iter()
        .map(|chunk| format!("Q: {}\nA: {}", chunk.question, chunk.answer))
        .collect::<Vec<_>>()
        .join("\n\n")
}
