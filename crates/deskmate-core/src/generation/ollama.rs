//! Generation backend for a local model server (Ollama wire protocol).
//!
//! One POST to `/api/generate` with `stream: true`; the response body is
//! newline-delimited JSON, one object per line:
//!
//! ```text
//! {"response": "Hello", "done": false}
//! {"response": " there", "done": false}
//! {"done": true}
//! ```
//!
//! `"done": true` is the explicit end-of-stream sentinel; blank lines are
//! skipped, not treated as termination.

use std::time::Duration;

use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use super::{
    classify_transport_error, next_line, GenerationBackend, GenerationConfig, GenerationError,
    GenerationProviderKind, TokenStream,
};
use crate::errors::DeskmateError;

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_ctx: u32,
}

#[derive(Deserialize)]
struct GenerateLine {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
}

/// Streaming backend speaking the Ollama `/api/generate` protocol.
pub struct OllamaBackend {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
    context_window: u32,
    timeout_secs: u64,
}

impl OllamaBackend {
    /// Create a new backend from configuration.
    pub fn new(config: &GenerationConfig) -> Result<Self, DeskmateError> {
        let client = reqwest::Client::builder().build().map_err(|e| {
            DeskmateError::GenerationProviderUnavailable {
                provider: config.provider.to_string(),
                reason: format!("failed to build HTTP client: {}", e),
            }
        })?;

        Ok(Self {
            client,
            base_url: config.effective_base_url(),
            model: config.model.clone(),
            temperature: config.temperature,
            context_window: config.context_window,
            timeout_secs: config.timeout_secs,
        })
    }
}

#[async_trait]
impl GenerationBackend for OllamaBackend {
    fn provider_kind(&self) -> GenerationProviderKind {
        GenerationProviderKind::Ollama
    }

    async fn stream(&self, prompt: &str) -> Result<TokenStream, GenerationError> {
        let url = format!("{}/api/generate", self.base_url);
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: true,
            options: GenerateOptions {
                temperature: self.temperature,
                num_ctx: self.context_window,
            },
        };

        let timeout_secs = self.timeout_secs;
        let response = self
            .client
            .post(&url)
            .json(&request)
            .timeout(Duration::from_secs(timeout_secs))
            .send()
            .await
            .map_err(|e| classify_transport_error(&e, timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_else(|_| status.to_string());
            return Err(GenerationError::Backend {
                status: status.as_u16(),
                message,
            });
        }

        let mut bytes = response.bytes_stream();
        let tokens = stream! {
            let mut buffer: Vec<u8> = Vec::new();
            'read: while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield Err(classify_transport_error(&e, timeout_secs));
                        return;
                    }
                };
                buffer.extend_from_slice(&chunk);

                while let Some(line) = next_line(&mut buffer) {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let parsed: GenerateLine = match serde_json::from_str(&line) {
                        Ok(parsed) => parsed,
                        Err(e) => {
                            yield Err(GenerationError::Protocol(format!(
                                "invalid NDJSON line: {}",
                                e
                            )));
                            return;
                        }
                    };
                    if parsed.done {
                        break 'read;
                    }
                    // Whitespace-only fragments carry no content.
                    if !parsed.response.trim().is_empty() {
                        yield Ok(parsed.response);
                    }
                }
            }
        };

        Ok(Box::pin(tokens))
    }
}
