//! Common types used throughout Deskmate.
//!
//! Domain types for the knowledge corpus, the fused retrieval results, and
//! the per-query event stream consumed by the transport layer.

use serde::{Deserialize, Serialize};

// ============================================================================
// Document
// ============================================================================

/// A single knowledge-base entry.
///
/// Documents are immutable once loaded; `id` is the ordinal position within
/// the corpus and doubles as the join key between the lexical snapshot and
/// the vector index. The working set never changes at runtime; updates
/// require a full offline rebuild of both artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Ordinal position in the corpus.
    pub id: usize,
    /// The canonical question text.
    pub question: String,
    /// The canonical answer text.
    pub answer: String,
    /// Source tag (e.g. the ingest file the entry came from).
    pub source: String,
}

// ============================================================================
// FusedResult
// ============================================================================

/// A fused retrieval result, the only structure exposed outside fusion.
///
/// `score` is rounded to 4 decimal digits for external consumption;
/// relevance gating happens upstream on the full-precision values. Within
/// one query's result set each document appears at most once, ordered by
/// descending score with ties broken by document ordinal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedResult {
    /// The matched FAQ question.
    pub question: String,
    /// The matched FAQ answer.
    pub answer: String,
    /// Fused relevance score, rounded to 4 decimals.
    pub score: f32,
    /// Source tag of the underlying document.
    pub source: String,
}

// ============================================================================
// StreamEvent
// ============================================================================

/// One event in a query's response stream.
///
/// Per query the protocol is strict: zero or more `Token` events, then
/// exactly one terminal `Answer`, then exactly one terminal `Chunks`,
/// emitted in that order on every path (success, refusal, backend
/// failure). Serializes externally tagged, matching the wire shapes
/// `{"token": ...}`, `{"answer": ...}`, `{"chunks": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamEvent {
    /// An incremental text fragment from the generation backend.
    Token(String),
    /// The complete answer text (terminal, exactly once).
    Answer(String),
    /// The supporting fused results (terminal, exactly once, last).
    Chunks(Vec<FusedResult>),
}

// ============================================================================
// QueryOptions
// ============================================================================

/// Per-query overrides for the retrieval stage.
#[derive(Debug, Default, Clone)]
pub struct QueryOptions {
    /// Override the configured number of fused results.
    pub top_k: Option<usize>,
    /// Override the configured fusion alpha.
    pub alpha: Option<f32>,
}

impl QueryOptions {
    /// Options using the configured defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the number of fused results.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    /// Override the fusion alpha.
    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = Some(alpha);
        self
    }
}

// ============================================================================
// ReadinessReport
// ============================================================================

/// Readiness of the retrieval core, for the health-check surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessReport {
    /// Both indexes loaded and consistent.
    pub ready: bool,
    /// The vector index is loaded.
    pub vector_index: bool,
    /// The lexical index is loaded.
    pub lexical_index: bool,
    /// Human-readable status line.
    pub message: String,
}

impl ReadinessReport {
    /// Build a report from the two index states.
    pub fn new(vector_index: bool, lexical_index: bool) -> Self {
        let ready = vector_index && lexical_index;
        let message = if ready {
            "retrieval core loaded".to_string()
        } else {
            "indexes still loading".to_string()
        };
        Self {
            ready,
            vector_index,
            lexical_index,
            message,
        }
    }
}
