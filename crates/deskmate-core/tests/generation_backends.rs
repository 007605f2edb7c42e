//! Wire-protocol tests for the generation backends: NDJSON and SSE
//! framings, end-of-stream sentinels, and typed failure kinds.

use futures::StreamExt;
use httpmock::prelude::*;

use deskmate_core::{
    GenerationBackend, GenerationConfig, GenerationError, GenerationProviderKind, OllamaBackend,
    OpenAiBackend, Orchestrator, FALLBACK_ANSWER,
};

fn ollama_config(base_url: &str) -> GenerationConfig {
    GenerationConfig {
        base_url: Some(base_url.to_string()),
        ..Default::default()
    }
}

fn openai_config(base_url: &str) -> GenerationConfig {
    GenerationConfig {
        provider: GenerationProviderKind::OpenAi,
        model: "gpt-4o-mini".to_string(),
        base_url: Some(base_url.to_string()),
        api_key: Some("sk-test".to_string()),
        ..Default::default()
    }
}

async fn drain(mut stream: deskmate_core::TokenStream) -> Vec<Result<String, GenerationError>> {
    let mut items = Vec::new();
    while let Some(item) = stream.next().await {
        items.push(item);
    }
    items
}

// ============================================================================
// NDJSON (Ollama)
// ============================================================================

#[tokio::test]
async fn ollama_streams_tokens_until_done_sentinel() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/generate")
                .json_body_partial(r#"{"model":"gemma3:4b","stream":true}"#);
            then.status(200).body(concat!(
                "\n",
                r#"{"response":"Hello","done":false}"#,
                "\n",
                r#"{"response":" there.","done":false}"#,
                "\n",
                r#"{"response":"  ","done":false}"#,
                "\n",
                r#"{"done":true}"#,
                "\n",
                r#"{"response":"after the sentinel","done":false}"#,
                "\n",
            ));
        })
        .await;

    let backend = OllamaBackend::new(&ollama_config(&server.base_url())).unwrap();
    let items = drain(backend.stream("prompt").await.unwrap()).await;

    // Whitespace-only fragments are dropped; nothing after `done: true` is
    // read.
    let tokens: Vec<String> = items.into_iter().map(|item| item.unwrap()).collect();
    assert_eq!(tokens, vec!["Hello".to_string(), " there.".to_string()]);
}

#[tokio::test]
async fn ollama_non_success_status_is_a_backend_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/generate");
            then.status(500).body("model crashed");
        })
        .await;

    let backend = OllamaBackend::new(&ollama_config(&server.base_url())).unwrap();
    let result = backend.stream("prompt").await;

    match result {
        Err(GenerationError::Backend { status, message }) => {
            assert_eq!(status, 500);
            assert!(message.contains("model crashed"));
        }
        other => panic!("expected Backend error, got {:?}", other.map(|_| "stream")),
    }
}

#[tokio::test]
async fn ollama_malformed_line_is_a_protocol_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/generate");
            then.status(200).body(concat!(
                r#"{"response":"ok","done":false}"#,
                "\n",
                "this is not json\n",
            ));
        })
        .await;

    let backend = OllamaBackend::new(&ollama_config(&server.base_url())).unwrap();
    let items = drain(backend.stream("prompt").await.unwrap()).await;

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_ref().unwrap(), "ok");
    assert!(matches!(items[1], Err(GenerationError::Protocol(_))));
}

#[tokio::test]
async fn ollama_unreachable_host_is_a_connect_error() {
    let backend = OllamaBackend::new(&ollama_config("http://127.0.0.1:9")).unwrap();
    let result = backend.stream("prompt").await;
    assert!(matches!(
        result,
        Err(GenerationError::Connect(_)) | Err(GenerationError::Timeout(_))
    ));
}

// ============================================================================
// SSE (OpenAI)
// ============================================================================

#[tokio::test]
async fn openai_streams_delta_content_until_done_sentinel() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .header("authorization", "Bearer sk-test");
            then.status(200)
                .header("content-type", "text/event-stream")
                .body(concat!(
                    "data: {\"choices\":[{\"delta\":{\"content\":\"Hello\"}}]}\n",
                    "\n",
                    "data: {\"choices\":[{\"delta\":{\"content\":\" there.\"}}]}\n",
                    "\n",
                    "data: {\"choices\":[{\"delta\":{}}]}\n",
                    "\n",
                    "data: [DONE]\n",
                    "\n",
                ));
        })
        .await;

    let backend = OpenAiBackend::new(&openai_config(&server.base_url())).unwrap();
    let items = drain(backend.stream("prompt").await.unwrap()).await;

    let tokens: Vec<String> = items.into_iter().map(|item| item.unwrap()).collect();
    assert_eq!(tokens, vec!["Hello".to_string(), " there.".to_string()]);
}

#[tokio::test]
async fn openai_unauthorized_is_an_auth_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(401).body(r#"{"error":"invalid api key"}"#);
        })
        .await;

    let backend = OpenAiBackend::new(&openai_config(&server.base_url())).unwrap();
    let result = backend.stream("prompt").await;

    assert!(matches!(result, Err(GenerationError::Auth(_))));
}

#[tokio::test]
async fn openai_missing_key_fails_at_construction() {
    let config = GenerationConfig {
        provider: GenerationProviderKind::OpenAi,
        api_key: None,
        ..Default::default()
    };
    assert!(OpenAiBackend::new(&config).is_err());
}

// ============================================================================
// Orchestrator degradation
// ============================================================================

#[tokio::test]
async fn orchestrator_folds_failures_into_one_fallback_token() {
    let orchestrator =
        Orchestrator::from_config(&ollama_config("http://127.0.0.1:9")).unwrap();

    let tokens: Vec<String> = orchestrator
        .stream_answer("query", "Q: q\nA: a")
        .collect()
        .await;

    assert_eq!(tokens, vec![FALLBACK_ANSWER.to_string()]);
}

#[tokio::test]
async fn orchestrator_appends_fallback_after_partial_stream_failure() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/generate");
            then.status(200).body(concat!(
                r#"{"response":"partial ","done":false}"#,
                "\n",
                "garbage line\n",
            ));
        })
        .await;

    let orchestrator =
        Orchestrator::from_config(&ollama_config(&server.base_url())).unwrap();

    let tokens: Vec<String> = orchestrator
        .stream_answer("query", "Q: q\nA: a")
        .collect()
        .await;

    assert_eq!(
        tokens,
        vec!["partial ".to_string(), FALLBACK_ANSWER.to_string()]
    );
}

#[tokio::test]
async fn orchestrator_passes_tokens_through_on_success() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/generate");
            then.status(200).body(concat!(
                r#"{"response":"All ","done":false}"#,
                "\n",
                r#"{"response":"good.","done":false}"#,
                "\n",
                r#"{"done":true}"#,
                "\n",
            ));
        })
        .await;

    let orchestrator =
        Orchestrator::from_config(&ollama_config(&server.base_url())).unwrap();

    let tokens: Vec<String> = orchestrator
        .stream_answer("query", "Q: q\nA: a")
        .collect()
        .await;

    assert_eq!(tokens, vec!["All ".to_string(), "good.".to_string()]);
}
