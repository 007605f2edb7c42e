//! Query embedding abstraction and the HTTP embedding backend.
//!
//! This module provides:
//! - [`EmbedderKind`] - enum of supported embedding providers
//! - [`EmbeddingConfig`] - configuration for the query embedder
//! - [`QueryEmbedder`] - trait for embedding providers
//! - [`OllamaEmbedder`] - embeddings via a local model server's HTTP API
//! - [`create_embedder`] - factory resolving configuration to a backend
//!
//! The query embedder must apply the same transform that produced the
//! vectors in the vector artifact: the configured model id is checked
//! against the artifact's recorded model at startup, and the returned
//! vector is L2-normalized here so downstream code never re-checks the
//! `‖v‖₂ ≈ 1` invariant.
//!
//! There is no silent fallback between providers: if the configured
//! provider is unknown or unreachable at query time, the failure is typed
//! and the pipeline degrades to its refusal path.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_EMBEDDING_DIMENSION, DEFAULT_EMBEDDING_MODEL, DEFAULT_EMBEDDING_TIMEOUT_SECS,
    DEFAULT_OLLAMA_BASE_URL,
};
use crate::errors::DeskmateError;

// ============================================================================
// EmbedderKind
// ============================================================================

/// Enum of supported embedding providers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderKind {
    /// Local model server speaking the Ollama embeddings API.
    #[default]
    Ollama,
    /// Other (custom/future) providers.
    #[serde(untagged)]
    Other(String),
}

impl fmt::Display for EmbedderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ollama => write!(f, "ollama"),
            Self::Other(name) => write!(f, "{}", name),
        }
    }
}

impl FromStr for EmbedderKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            other => Ok(Self::Other(other.to_string())),
        }
    }
}

// ============================================================================
// EmbeddingConfig
// ============================================================================

/// Configuration for the query embedder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingConfig {
    /// Which provider to use.
    #[serde(default)]
    pub provider: EmbedderKind,

    /// Embedding model identifier. Must match the model recorded in the
    /// index artifacts.
    /// Default: all-minilm
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL of the embedding server.
    /// Default: http://localhost:11434
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Expected embedding dimension.
    /// Default: 384
    #[serde(default = "default_dimension")]
    pub dimension: u32,
}

fn default_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_base_url() -> String {
    DEFAULT_OLLAMA_BASE_URL.to_string()
}

fn default_dimension() -> u32 {
    DEFAULT_EMBEDDING_DIMENSION
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbedderKind::default(),
            model: default_model(),
            base_url: default_base_url(),
            dimension: default_dimension(),
        }
    }
}

impl EmbeddingConfig {
    /// Validate the embedding configuration.
    pub fn validate(&self) -> Result<Vec<String>, DeskmateError> {
        if self.model.trim().is_empty() {
            return Err(DeskmateError::InvalidConfiguration {
                message: "embedding.model cannot be empty".to_string(),
                hint: "Set embedding.model to the model the indexes were built with (e.g. all-minilm)".to_string(),
            });
        }
        if self.dimension == 0 {
            return Err(DeskmateError::InvalidConfiguration {
                message: "embedding.dimension cannot be 0".to_string(),
                hint: "Set embedding.dimension to the model's output width (e.g. 384)".to_string(),
            });
        }
        Ok(Vec::new())
    }
}

// ============================================================================
// QueryEmbedder Trait
// ============================================================================

/// Trait for query embedding providers.
#[async_trait]
pub trait QueryEmbedder: Send + Sync {
    /// Get the provider kind for this embedder.
    fn provider_kind(&self) -> EmbedderKind;

    /// Get the model ID this embedder uses.
    fn model_id(&self) -> &str;

    /// Get the embedding dimension.
    fn dimension(&self) -> u32;

    /// Embed a free-text query into an L2-normalized vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, DeskmateError>;
}

// ============================================================================
// OllamaEmbedder
// ============================================================================

#[derive(Serialize)]
struct OllamaEmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

/// Query embedder backed by a local model server's `/api/embeddings`
/// endpoint.
pub struct OllamaEmbedder {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dimension: u32,
}

impl OllamaEmbedder {
    /// Create a new embedder from configuration.
    pub fn new(config: &EmbeddingConfig) -> Result<Self, DeskmateError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_EMBEDDING_TIMEOUT_SECS))
            .build()
            .map_err(|e| DeskmateError::EmbeddingProviderUnavailable {
                provider: config.provider.to_string(),
                reason: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            dimension: config.dimension,
        })
    }
}

#[async_trait]
impl QueryEmbedder for OllamaEmbedder {
    fn provider_kind(&self) -> EmbedderKind {
        EmbedderKind::Ollama
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> u32 {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, DeskmateError> {
        let url = format!("{}/api/embeddings", self.base_url);
        let request = OllamaEmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| DeskmateError::EmbeddingFailed {
                message: format!("request to {} failed: {}", url, e),
            })?;

        if !response.status().is_success() {
            return Err(DeskmateError::EmbeddingFailed {
                message: format!("{} returned HTTP {}", url, response.status()),
            });
        }

        let body: OllamaEmbeddingResponse =
            response
                .json()
                .await
                .map_err(|e| DeskmateError::EmbeddingFailed {
                    message: format!("invalid embedding response: {}", e),
                })?;

        if body.embedding.len() != self.dimension as usize {
            return Err(DeskmateError::EmbeddingDimensionMismatch {
                expected: self.dimension,
                got: body.embedding.len() as u32,
            });
        }

        Ok(l2_normalize(body.embedding))
    }
}

// ============================================================================
// Backend Factory
// ============================================================================

/// Create a query embedder from configuration.
///
/// Resolved once at process start; the provider is never re-read per
/// request.
pub fn create_embedder(
    config: &EmbeddingConfig,
) -> Result<Box<dyn QueryEmbedder>, DeskmateError> {
    match &config.provider {
        EmbedderKind::Ollama => Ok(Box::new(OllamaEmbedder::new(config)?)),
        EmbedderKind::Other(name) => Err(DeskmateError::EmbeddingProviderUnavailable {
            provider: name.clone(),
            reason: format!("Unknown embedding provider: {}", name),
        }),
    }
}

/// Scale a vector to unit L2 norm. A zero vector is returned unchanged.
pub fn l2_normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for component in &mut vector {
            *component /= norm;
        }
    }
    vector
}
