//! Shared fixtures for integration tests: a small FAQ corpus, a
//! deterministic embedder, and pipeline assembly helpers.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use deskmate_core::{
    l2_normalize, save_lexical_snapshot, save_vector_artifact, DeskmateError, EmbedderKind,
    EmbeddingConfig, KnowledgeStore, LexicalSnapshot, Orchestrator, Pipeline, QueryEmbedder,
    RetrievalConfig, VectorArtifact,
};

pub const TEST_MODEL: &str = "all-minilm";
pub const DIMENSION: u32 = 3;

/// The three-document corpus from the password-reset scenario.
pub fn corpus() -> Vec<(String, String, String)> {
    vec![
        (
            "how to reset password".to_string(),
            "Go to settings>security>reset".to_string(),
            "faqs.json".to_string(),
        ),
        (
            "how to change email".to_string(),
            "Go to settings>profile>email".to_string(),
            "faqs.json".to_string(),
        ),
        (
            "how to delete account".to_string(),
            "Contact support".to_string(),
            "faqs.json".to_string(),
        ),
    ]
}

/// One axis-aligned unit vector per document.
pub fn corpus_vectors() -> Vec<Vec<f32>> {
    vec![
        vec![1.0, 0.0, 0.0],
        vec![0.0, 1.0, 0.0],
        vec![0.0, 0.0, 1.0],
    ]
}

/// Write both artifacts for the given corpus under `root`.
pub fn write_artifacts(root: &Path, entries: &[(String, String, String)], vectors: Vec<Vec<f32>>) {
    let snapshot = LexicalSnapshot::from_entries(TEST_MODEL, entries);
    save_lexical_snapshot(&snapshot, root).expect("save lexical snapshot");
    let artifact = VectorArtifact::new(TEST_MODEL, DIMENSION, vectors);
    save_vector_artifact(&artifact, root).expect("save vector artifact");
}

pub fn embedding_config() -> EmbeddingConfig {
    EmbeddingConfig {
        model: TEST_MODEL.to_string(),
        dimension: DIMENSION,
        ..Default::default()
    }
}

/// Load a [`KnowledgeStore`] over artifacts previously written to `root`.
pub fn load_store(root: &Path) -> Arc<KnowledgeStore> {
    Arc::new(
        KnowledgeStore::load(root, Default::default(), &embedding_config())
            .expect("load knowledge store"),
    )
}

/// Deterministic embedder: maps topic keywords to the corpus axes.
///
/// Queries about passwords land near document 0, email near document 1,
/// account deletion near document 2; anything else sits equidistant from
/// all three.
pub struct KeywordEmbedder;

#[async_trait]
impl QueryEmbedder for KeywordEmbedder {
    fn provider_kind(&self) -> EmbedderKind {
        EmbedderKind::Other("keyword-test".to_string())
    }

    fn model_id(&self) -> &str {
        TEST_MODEL
    }

    fn dimension(&self) -> u32 {
        DIMENSION
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, DeskmateError> {
        let lowered = text.to_lowercase();
        let raw = if lowered.contains("password") {
            vec![1.0, 0.2, 0.0]
        } else if lowered.contains("email") {
            vec![0.2, 1.0, 0.0]
        } else if lowered.contains("account") || lowered.contains("delete") {
            vec![0.0, 0.2, 1.0]
        } else {
            vec![1.0, 1.0, 1.0]
        };
        Ok(l2_normalize(raw))
    }
}

/// Embedder that always fails, for the degraded-retrieval path.
pub struct FailingEmbedder;

#[async_trait]
impl QueryEmbedder for FailingEmbedder {
    fn provider_kind(&self) -> EmbedderKind {
        EmbedderKind::Other("failing-test".to_string())
    }

    fn model_id(&self) -> &str {
        TEST_MODEL
    }

    fn dimension(&self) -> u32 {
        DIMENSION
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, DeskmateError> {
        Err(DeskmateError::EmbeddingFailed {
            message: "connection refused".to_string(),
        })
    }
}

/// Assemble a pipeline over `root`'s artifacts with the keyword embedder.
pub fn build_pipeline(
    root: &Path,
    orchestrator: Orchestrator,
    retrieval: RetrievalConfig,
) -> Pipeline {
    Pipeline::new(
        load_store(root),
        Arc::new(KeywordEmbedder),
        orchestrator,
        retrieval,
    )
}
