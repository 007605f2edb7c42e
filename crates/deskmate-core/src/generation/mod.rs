//! Streaming generation orchestration.
//!
//! This module provides:
//! - [`GenerationProviderKind`] - enum of supported generation backends
//! - [`GenerationConfig`] - provider, model, and sampling configuration
//! - [`GenerationError`] - typed backend failure kinds
//! - [`GenerationBackend`] - trait for streaming text-generation providers
//! - [`create_backend`] - factory resolving configuration to a backend
//! - [`Orchestrator`] - prompt building + graceful degradation
//!
//! ## Provider selection
//!
//! Exactly one backend is selected per process, from configuration,
//! resolved once at startup. It is never re-read per request and never
//! inferred by sniffing hostnames. The providers differ in wire protocol (the local
//! model server streams newline-delimited JSON, the cloud API streams
//! server-sent events) but satisfy the identical contract: given a prompt,
//! stream back text fragments and signal completion.
//!
//! ## Failure model
//!
//! Backends surface failures as typed [`GenerationError`] values on the
//! token stream, so tests can assert on the failure cause. The
//! [`Orchestrator`] is where degradation happens: any failure kind is
//! logged and folded into a single synthetic apology token. The stream a caller consumes always terminates
//! with *some* content. There is no retry: one failure triggers the
//! fallback path.

pub mod ollama;
pub mod openai;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_stream::stream;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    DEFAULT_CONTEXT_WINDOW, DEFAULT_GENERATION_MODEL, DEFAULT_GENERATION_TIMEOUT_SECS,
    DEFAULT_OLLAMA_BASE_URL, DEFAULT_OPENAI_BASE_URL, DEFAULT_TEMPERATURE, FALLBACK_ANSWER,
    OPENAI_API_KEY_ENV,
};
use crate::errors::DeskmateError;

pub use ollama::OllamaBackend;
pub use openai::OpenAiBackend;

// ============================================================================
// GenerationError
// ============================================================================

/// Typed failure from a generation backend.
///
/// Carried on the token stream so the failure cause is assertable; the
/// orchestrator converts every kind into the same user-facing fallback.
#[derive(Error, Debug)]
pub enum GenerationError {
    /// The backend could not be reached.
    #[error("failed to reach generation backend: {0}")]
    Connect(String),

    /// The backend rejected our credentials.
    #[error("generation backend rejected credentials: {0}")]
    Auth(String),

    /// The backend answered with a non-success status.
    #[error("generation backend returned HTTP {status}: {message}")]
    Backend {
        /// HTTP status code.
        status: u16,
        /// Response body or status text.
        message: String,
    },

    /// The stream could not be parsed as the expected framing.
    #[error("malformed generation stream: {0}")]
    Protocol(String),

    /// The overall request exceeded the configured bound.
    #[error("generation backend timed out after {0}s")]
    Timeout(u64),
}

/// A forward-only, single-pass stream of text fragments.
///
/// Not restartable: once consumed (or dropped), a new call to
/// [`GenerationBackend::stream`] is required.
pub type TokenStream = BoxStream<'static, Result<String, GenerationError>>;

// ============================================================================
// GenerationProviderKind
// ============================================================================

/// Enum of supported generation providers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GenerationProviderKind {
    /// Local model server streaming newline-delimited JSON.
    #[default]
    Ollama,
    /// Cloud chat-completion API streaming server-sent events.
    #[serde(rename = "openai")]
    OpenAi,
    /// Other (custom/future) providers.
    #[serde(untagged)]
    Other(String),
}

impl fmt::Display for GenerationProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ollama => write!(f, "ollama"),
            Self::OpenAi => write!(f, "openai"),
            Self::Other(name) => write!(f, "{}", name),
        }
    }
}

impl FromStr for GenerationProviderKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAi),
            other => Ok(Self::Other(other.to_string())),
        }
    }
}

// ============================================================================
// GenerationConfig
// ============================================================================

/// Configuration for the generation backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Which provider to use.
    #[serde(default)]
    pub provider: GenerationProviderKind,

    /// Model identifier sent to the backend.
    /// Default: gemma3:4b
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL of the backend. When unset, the provider's conventional
    /// default is used.
    #[serde(default)]
    pub base_url: Option<String>,

    /// API key for the cloud provider. When unset, resolved once at
    /// startup from `OPENAI_API_KEY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Sampling temperature.
    /// Default: 0.2
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Context window requested from the backend (local provider only).
    /// Default: 4096
    #[serde(default = "default_context_window")]
    pub context_window: u32,

    /// Bound on one complete exchange with the backend, in seconds.
    /// Default: 120
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    DEFAULT_GENERATION_MODEL.to_string()
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

fn default_context_window() -> u32 {
    DEFAULT_CONTEXT_WINDOW
}

fn default_timeout_secs() -> u64 {
    DEFAULT_GENERATION_TIMEOUT_SECS
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: GenerationProviderKind::default(),
            model: default_model(),
            base_url: None,
            api_key: None,
            temperature: default_temperature(),
            context_window: default_context_window(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl GenerationConfig {
    /// The base URL to use, falling back to the provider's convention.
    pub fn effective_base_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => match self.provider {
                GenerationProviderKind::OpenAi => DEFAULT_OPENAI_BASE_URL.to_string(),
                _ => DEFAULT_OLLAMA_BASE_URL.to_string(),
            },
        }
    }

    /// Resolve the API key from the environment if the config file did not
    /// carry one. Called once at load time.
    pub fn resolve_api_key_from_env(&mut self) {
        if self.api_key.is_none() {
            if let Ok(key) = std::env::var(OPENAI_API_KEY_ENV) {
                if !key.trim().is_empty() {
                    self.api_key = Some(key);
                }
            }
        }
    }

    /// Validate the generation configuration.
    pub fn validate(&self) -> Result<Vec<String>, DeskmateError> {
        let mut warnings = Vec::new();

        if self.model.trim().is_empty() {
            return Err(DeskmateError::InvalidConfiguration {
                message: "generation.model cannot be empty".to_string(),
                hint: "Set generation.model to the backend's model id (e.g. gemma3:4b)".to_string(),
            });
        }
        if self.timeout_secs == 0 {
            return Err(DeskmateError::InvalidConfiguration {
                message: "generation.timeoutSecs cannot be 0".to_string(),
                hint: "Set generation.timeoutSecs to a positive bound (recommended: 120)"
                    .to_string(),
            });
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(DeskmateError::InvalidConfiguration {
                message: format!(
                    "generation.temperature={} is outside [0, 2]",
                    self.temperature
                ),
                hint: "Set temperature between 0.0 and 2.0 (recommended: 0.2)".to_string(),
            });
        }

        if self.provider == GenerationProviderKind::OpenAi && self.api_key.is_none() {
            warnings.push(format!(
                "generation.provider=openai but no API key is configured; set generation.apiKey \
                 or the {} environment variable",
                OPENAI_API_KEY_ENV
            ));
        }

        Ok(warnings)
    }
}

// ============================================================================
// GenerationBackend Trait
// ============================================================================

/// Trait for streaming text-generation providers.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Get the provider kind for this backend.
    fn provider_kind(&self) -> GenerationProviderKind;

    /// Start one streaming generation for the prompt.
    ///
    /// On success the returned stream yields text fragments until the
    /// backend's end-of-stream sentinel; any mid-stream failure surfaces as
    /// a typed `Err` item and terminates the stream.
    async fn stream(&self, prompt: &str) -> Result<TokenStream, GenerationError>;
}

// ============================================================================
// Backend Factory
// ============================================================================

/// Create a generation backend from configuration.
///
/// Resolved once at process start; the selection is never re-read per
/// request.
pub fn create_backend(
    config: &GenerationConfig,
) -> Result<Box<dyn GenerationBackend>, DeskmateError> {
    match &config.provider {
        GenerationProviderKind::Ollama => Ok(Box::new(OllamaBackend::new(config)?)),
        GenerationProviderKind::OpenAi => Ok(Box::new(OpenAiBackend::new(config)?)),
        GenerationProviderKind::Other(name) => Err(DeskmateError::GenerationProviderUnavailable {
            provider: name.clone(),
            reason: format!("Unknown generation provider: {}", name),
        }),
    }
}

/// Pop one complete line off a byte buffer, if any.
///
/// Network chunks split lines (and UTF-8 sequences) at arbitrary byte
/// boundaries; both wire framings are line-oriented, so backends
/// accumulate raw bytes and only decode whole lines. The trailing newline
/// is consumed; a trailing `\r` is stripped.
pub(crate) fn next_line(buffer: &mut Vec<u8>) -> Option<String> {
    let pos = buffer.iter().position(|b| *b == b'\n')?;
    let mut line: Vec<u8> = buffer.drain(..=pos).collect();
    line.pop(); // the newline itself
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    Some(String::from_utf8_lossy(&line).into_owned())
}

/// Classify a reqwest transport error into a typed generation failure.
pub(crate) fn classify_transport_error(err: &reqwest::Error, timeout_secs: u64) -> GenerationError {
    if err.is_timeout() {
        GenerationError::Timeout(timeout_secs)
    } else if err.is_connect() {
        GenerationError::Connect(err.to_string())
    } else if err.is_decode() {
        GenerationError::Protocol(err.to_string())
    } else {
        GenerationError::Connect(err.to_string())
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Prompt construction plus graceful degradation over one backend.
#[derive(Clone)]
pub struct Orchestrator {
    backend: Arc<dyn GenerationBackend>,
}

impl Orchestrator {
    /// Wrap an already-constructed backend.
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self { backend }
    }

    /// Build the orchestrator from configuration.
    pub fn from_config(config: &GenerationConfig) -> Result<Self, DeskmateError> {
        Ok(Self {
            backend: Arc::from(create_backend(config)?),
        })
    }

    /// The provider this orchestrator was resolved to.
    pub fn provider_kind(&self) -> GenerationProviderKind {
        self.backend.provider_kind()
    }

    /// Build the copilot prompt for a query and its retrieved context.
    pub fn build_prompt(query: &str, context: &str) -> String {
        format!(
            r#"You are Deskmate — a world-class, friendly IT support assistant.

INSTRUCTIONS (follow exactly):
1. Use ONLY the information from the context below.
2. NEVER copy the FAQ answer word-for-word. Always rephrase it naturally and conversationally.
3. Make it sound like you're talking to a teammate — warm, clear, confident.
4. Keep it short and direct.
5. If context doesn't have the answer → say: "I don't have enough information to help with that right now."

Context:
{context}

User Question: {query}

Answer in a natural, human way (do NOT repeat the FAQ verbatim):"#
        )
    }

    /// Stream the answer for a query, degrading gracefully.
    ///
    /// Yields plain text fragments. Any backend failure (before the first
    /// token or partway through) is logged and replaced by exactly one
    /// fallback apology token; the stream then ends. The caller never sees
    /// a protocol error.
    pub fn stream_answer(
        &self,
        query: &str,
        context: &str,
    ) -> impl Stream<Item = String> + Send + 'static {
        let backend = Arc::clone(&self.backend);
        let prompt = Self::build_prompt(query, context);

        stream! {
            match backend.stream(&prompt).await {
                Err(err) => {
                    tracing::warn!(error = %err, "generation backend failed to start; emitting fallback");
                    yield FALLBACK_ANSWER.to_string();
                }
                Ok(mut tokens) => {
                    while let Some(item) = tokens.next().await {
                        match item {
                            Ok(token) => yield token,
                            Err(err) => {
                                tracing::warn!(error = %err, "generation stream failed; emitting fallback");
                                yield FALLBACK_ANSWER.to_string();
                                break;
                            }
                        }
                    }
                }
            }
        }
    }
}
