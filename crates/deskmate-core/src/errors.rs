//! Error types for deskmate-core.
//!
//! The taxonomy follows the process-lifecycle split: `Artifact*` and
//! `Config*` variants are startup failures (the process must not serve
//! traffic), everything else is per-query and is resolved by the pipeline
//! into a refusal or fallback answer rather than surfaced to the caller.

use std::path::PathBuf;

use thiserror::Error;

/// Domain-specific errors for Deskmate operations.
#[derive(Error, Debug)]
pub enum DeskmateError {
    /// A required index artifact is missing.
    #[error("Artifact not found at `{path}`. Run the offline indexer and restart.")]
    ArtifactNotFound {
        /// Path where the artifact was expected.
        path: PathBuf,
    },

    /// Reading or writing an index artifact failed.
    #[error("Artifact I/O error at `{path}`: {message}")]
    ArtifactIo {
        /// Path to the artifact file.
        path: PathBuf,
        /// Description of the I/O error.
        message: String,
    },

    /// An index artifact could not be decoded.
    #[error("Artifact parse error at `{path}`: {message}")]
    ArtifactParse {
        /// Path to the artifact file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// An index artifact was written by an incompatible version.
    #[error("Artifact version mismatch at `{path}`: found {found}, expected {expected}. Rebuild the indexes.")]
    ArtifactVersionMismatch {
        /// Path to the artifact file.
        path: PathBuf,
        /// Version found on disk.
        found: u32,
        /// Version this build understands.
        expected: u32,
    },

    /// The lexical snapshot and the vector index disagree with each other.
    ///
    /// The two artifacts must be produced by the same indexing run: same
    /// document ordinals, same embedding model.
    #[error("Index artifacts are inconsistent: {reason}. Rebuild both indexes together.")]
    ArtifactInconsistent {
        /// What disagreed (counts, models).
        reason: String,
    },

    /// The embedding model recorded in the artifacts does not match the
    /// configured query embedder.
    #[error("Embedding model mismatch: artifacts were built with `{artifact_model}`, configured embedder is `{configured_model}`.")]
    EmbeddingModelMismatch {
        /// The model recorded in the artifacts.
        artifact_model: String,
        /// The model the embedder is configured with.
        configured_model: String,
    },

    /// A configuration value is invalid.
    #[error("Invalid configuration: {message}. {hint}")]
    InvalidConfiguration {
        /// Description of the invalid configuration.
        message: String,
        /// Actionable hint on how to fix it.
        hint: String,
    },

    /// The configuration file could not be read.
    #[error("Config I/O error at `{path}`: {message}")]
    ConfigIo {
        /// Path to the configuration file.
        path: PathBuf,
        /// Description of the I/O error.
        message: String,
    },

    /// The configuration file could not be parsed.
    #[error("Config parse error at `{path}`: {message}")]
    ConfigParse {
        /// Path to the configuration file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// The requested embedding provider is unavailable or not implemented.
    #[error("Embedding provider `{provider}` is unavailable: {reason}")]
    EmbeddingProviderUnavailable {
        /// The provider that is unavailable.
        provider: String,
        /// Reason why the provider is unavailable.
        reason: String,
    },

    /// Embedding a query failed (network, protocol, or backend error).
    #[error("Failed to embed query: {message}")]
    EmbeddingFailed {
        /// Description of the failure.
        message: String,
    },

    /// The embedder returned a vector of the wrong dimension.
    #[error("Embedding dimension mismatch: expected {expected}, got {got}.")]
    EmbeddingDimensionMismatch {
        /// Dimension the index was built with.
        expected: u32,
        /// Dimension the embedder returned.
        got: u32,
    },

    /// The requested generation provider is unavailable or not implemented.
    #[error("Generation provider `{provider}` is unavailable: {reason}")]
    GenerationProviderUnavailable {
        /// The provider that is unavailable.
        provider: String,
        /// Reason why the provider is unavailable.
        reason: String,
    },

    /// Invalid argument provided to an operation.
    #[error("{0}")]
    InvalidArgument(String),

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A wrapped generic error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DeskmateError {
    /// Whether this error must prevent the process from serving traffic.
    ///
    /// Per-query failures (embedding, generation) are never fatal; they are
    /// absorbed into the refusal/fallback paths by the pipeline.
    pub fn is_startup_failure(&self) -> bool {
        matches!(
            self,
            Self::ArtifactNotFound { .. }
                | Self::ArtifactIo { .. }
                | Self::ArtifactParse { .. }
                | Self::ArtifactVersionMismatch { .. }
                | Self::ArtifactInconsistent { .. }
                | Self::EmbeddingModelMismatch { .. }
                | Self::InvalidConfiguration { .. }
                | Self::ConfigIo { .. }
                | Self::ConfigParse { .. }
                | Self::EmbeddingProviderUnavailable { .. }
                | Self::GenerationProviderUnavailable { .. }
        )
    }
}
