//! Common constants used throughout deskmate-core.
//!
//! This module centralizes artifact filenames, retrieval defaults, and
//! generation defaults to avoid duplication and ensure consistency across
//! the codebase. Every retrieval tunable here is a *default*: the deployed
//! values come from [`crate::config::DeskmateConfig`].

// ============================================================================
// Artifact Layout
// ============================================================================

/// Subdirectory of the artifact root holding the lexical snapshot.
pub const LEXICAL_DIR_NAME: &str = "lexical";

/// Subdirectory of the artifact root holding the vector index.
pub const VECTORS_DIR_NAME: &str = "vectors";

/// Filename for the serialized lexical snapshot body.
pub const SNAPSHOT_FILENAME: &str = "snapshot.bin";

/// Filename for the serialized vector index body.
pub const INDEX_FILENAME: &str = "index.bin";

/// Filename for artifact metadata (JSON, human-inspectable).
pub const META_FILENAME: &str = "meta.json";

/// The name of the configuration file looked up in the working directory.
pub const CONFIG_FILENAME: &str = "deskmate.yaml";

// ============================================================================
// Retrieval Defaults
// ============================================================================

/// Default number of fused results handed to the generation path.
pub const DEFAULT_FINAL_K: usize = 6;

/// Default fusion weight for the dense (vector) candidate list.
///
/// `alpha` weighs vector-list appearances; `1 - alpha` weighs lexical-list
/// appearances. The default leans on semantic similarity.
pub const DEFAULT_ALPHA: f32 = 0.75;

/// Default RRF damping constant.
///
/// Tuned together with [`DEFAULT_RELEVANCE_THRESHOLD`]: changing one
/// invalidates the other.
pub const DEFAULT_RRF_K: f32 = 60.0;

/// Default relevance gate threshold on the best fused score.
///
/// Fused RRF scores for this corpus land roughly in 0.005..0.03; 0.008
/// accepts nearly all genuine matches while refusing off-topic queries.
pub const DEFAULT_RELEVANCE_THRESHOLD: f32 = 0.008;

// ============================================================================
// Embedding Defaults
// ============================================================================

/// Default embedding model identifier (served by Ollama).
pub const DEFAULT_EMBEDDING_MODEL: &str = "all-minilm";

/// Default embedding dimension for the primary model.
pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 384;

/// Bound on one query-embedding request, in seconds.
pub const DEFAULT_EMBEDDING_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Generation Defaults
// ============================================================================

/// Default text-generation model identifier.
pub const DEFAULT_GENERATION_MODEL: &str = "gemma3:4b";

/// Default base URL for the local model server (Ollama).
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// Default base URL for the cloud chat-completion API.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";

/// Environment variable consulted for the cloud API key when the
/// configuration file does not carry one. Resolved once at startup.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Default sampling temperature. Natural but safe.
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Default context window requested from the backend.
pub const DEFAULT_CONTEXT_WINDOW: u32 = 4096;

/// Bound on one complete exchange with the generation backend, in seconds.
/// Expiry is treated identically to any other backend failure.
pub const DEFAULT_GENERATION_TIMEOUT_SECS: u64 = 120;

// ============================================================================
// User-Facing Sentences
// ============================================================================

/// Answer emitted when the relevance gate refuses a query.
pub const REFUSAL_ANSWER: &str = "I don't have enough information to answer this accurately.";

/// Synthetic token emitted when the generation backend fails.
pub const FALLBACK_ANSWER: &str =
    "Sorry, I'm having trouble connecting to the model right now. Please try again in a moment.";

/// Answer emitted when the backend completed without producing any text.
pub const EMPTY_ANSWER: &str = "No answer generated.";
