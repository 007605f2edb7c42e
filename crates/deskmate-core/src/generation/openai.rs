//! Generation backend for an OpenAI-style chat-completion API.
//!
//! One POST to `/v1/chat/completions` with `stream: true`; the response is
//! server-sent events. Each frame is a `data: ` line carrying a JSON chunk
//! whose `choices[0].delta.content` holds the text fragment:
//!
//! ```text
//! data: {"choices":[{"delta":{"content":"Hello"}}]}
//!
//! data: {"choices":[{"delta":{"content":" there"}}]}
//!
//! data: [DONE]
//! ```
//!
//! `data: [DONE]` is the explicit end-of-stream sentinel, distinct from
//! the blank keep-alive lines between frames.

use std::time::Duration;

use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use super::{
    classify_transport_error, next_line, GenerationBackend, GenerationConfig, GenerationError,
    GenerationProviderKind, TokenStream,
};
use crate::constants::OPENAI_API_KEY_ENV;
use crate::errors::DeskmateError;

/// SSE end-of-stream sentinel payload.
const DONE_SENTINEL: &str = "[DONE]";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    #[serde(default)]
    delta: ChatDelta,
}

#[derive(Deserialize, Default)]
struct ChatDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Streaming backend speaking the OpenAI chat-completion SSE protocol.
pub struct OpenAiBackend {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    temperature: f32,
    timeout_secs: u64,
}

impl OpenAiBackend {
    /// Create a new backend from configuration.
    ///
    /// Fails if no API key was resolved at startup; a missing credential
    /// must surface at construction, not on the first query.
    pub fn new(config: &GenerationConfig) -> Result<Self, DeskmateError> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            DeskmateError::GenerationProviderUnavailable {
                provider: config.provider.to_string(),
                reason: format!(
                    "no API key configured; set generation.apiKey or the {} environment variable",
                    OPENAI_API_KEY_ENV
                ),
            }
        })?;

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
            api_key,
            temperature: config.temperature,
            timeout_secs: config.timeout_secs,
        })
    }
}

#[async_trait]
impl GenerationBackend for OpenAiBackend {
    fn provider_kind(&self) -> GenerationProviderKind {
        GenerationProviderKind::OpenAi
    }

    async fn stream(&self, prompt: &str) -> Result<TokenStream, GenerationError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            stream: true,
        };

        let timeout_secs = self.timeout_secs;
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .timeout(Duration::from_secs(timeout_secs))
            .send()
            .await
            .map_err(|e| classify_transport_error(&e, timeout_secs))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            let message = response.text().await.unwrap_or_else(|_| status.to_string());
            return Err(GenerationError::Auth(message));
        }
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
                    // Blank keep-alive lines and non-data fields (event:,
                    // id:, retry:) are ignored.
                    let Some(payload) = line.strip_prefix("data:") else {
                        continue;
                    };
                    let payload = payload.trim();
                    if payload.is_empty() {
                        continue;
                    }
                    if payload == DONE_SENTINEL {
                        break 'read;
                    }

                    let parsed: ChatChunk = match serde_json::from_str(payload) {
                        Ok(parsed) => parsed,
                        Err(e) => {
                            yield Err(GenerationError::Protocol(format!(
                                "invalid SSE data frame: {}",
                                e
                            )));
                            return;
                        }
                    };
                    if let Some(content) = parsed
                        .choices
                        .into_iter()
                        .next()
                        .and_then(|choice| choice.delta.content)
                    {
                        if !content.is_empty() {
                            yield Ok(content);
                        }
                    }
                }
            }
        };

        Ok(Box::pin(tokens))
    }
}
