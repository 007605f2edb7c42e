//! # deskmate-core
//!
//! **Deskmate** – hybrid retrieval and streaming generation engine.
//!
//! Deskmate answers user questions from a fixed FAQ knowledge base: a
//! dense vector index and a sparse BM25 index retrieve candidates, a
//! weighted Reciprocal Rank Fusion merges them, a relevance gate decides
//! whether there is enough signal to answer at all, and a streaming
//! generation backend rephrases the retrieved answer conversationally.
//! Retrieval is deterministic and testable even though the final prose is
//! not.
//!
//! ## Main Types
//!
//! - [`Pipeline`] – the main entry point: one query in, one event stream out
//! - [`KnowledgeStore`] – the loaded corpus plus both indexes
//! - [`DeskmateConfig`] – engine configuration
//! - [`DeskmateError`] – domain-specific error type
//!
//! ## Modules
//!
//! - [`bm25`] – sparse lexical retrieval (tokenizer, scorer, inverted index)
//! - [`vector`] – exact nearest-neighbor search over corpus embeddings
//! - [`fusion`] – weighted Reciprocal Rank Fusion
//! - [`validator`] – the relevance gate
//! - [`embed`] – query embedding providers
//! - [`generation`] – streaming generation backends and the orchestrator
//! - [`store`] – index artifacts and the knowledge store
//! - [`pipeline`] – the request pipeline and its event protocol
//!
//! ## Example
//!
//! ```ignore
//! use deskmate_core::{load_config, Pipeline, StreamEvent};
//! use futures::StreamExt;
//!
//! let config = load_config(None)?;
//! let pipeline = Pipeline::from_config(&config)?;
//!
//! let mut events = std::pin::pin!(pipeline.answer("how do I reset my password?"));
//! while let Some(event) = events.next().await {
//!     match event {
//!         StreamEvent::Token(token) => print!("{token}"),
//!         StreamEvent::Answer(answer) => println!("\n--\n{answer}"),
//!         StreamEvent::Chunks(chunks) => println!("({} supporting chunks)", chunks.len()),
//!     }
//! }
//! ```

// Modules
pub mod bm25;
pub mod config;
pub mod constants;
pub mod embed;
pub mod errors;
pub mod fusion;
pub mod generation;
pub mod pipeline;
pub mod store;
pub mod types;
pub mod validator;
pub mod vector;

// Re-exports for convenience
pub use bm25::{tokenize, Bm25Candidate, Bm25Index, Bm25Params};
pub use config::{load_config, ArtifactsConfig, DeskmateConfig, RetrievalConfig};
pub use constants::{
    DEFAULT_ALPHA, DEFAULT_EMBEDDING_DIMENSION, DEFAULT_EMBEDDING_MODEL, DEFAULT_FINAL_K,
    DEFAULT_GENERATION_MODEL, DEFAULT_GENERATION_TIMEOUT_SECS, DEFAULT_RELEVANCE_THRESHOLD,
    DEFAULT_RRF_K, EMPTY_ANSWER, FALLBACK_ANSWER, REFUSAL_ANSWER,
};
pub use embed::{
    create_embedder, l2_normalize, EmbedderKind, EmbeddingConfig, OllamaEmbedder, QueryEmbedder,
};
pub use errors::DeskmateError;
pub use fusion::{fuse, fuse_candidates, round_score, FusedScore, FusionConfig};
pub use generation::{
    create_backend, GenerationBackend, GenerationConfig, GenerationError, GenerationProviderKind,
    OllamaBackend, OpenAiBackend, Orchestrator, TokenStream,
};
pub use pipeline::Pipeline;
pub use store::{
    load_lexical_snapshot, load_vector_artifact, save_lexical_snapshot, save_vector_artifact,
    ArtifactMeta, KnowledgeStore, LexicalSnapshot, VectorArtifact, ARTIFACT_VERSION,
};
pub use types::{Document, FusedResult, QueryOptions, ReadinessReport, StreamEvent};
pub use validator::{is_relevant, RelevanceConfig};
pub use vector::{VectorHit, VectorIndex};
