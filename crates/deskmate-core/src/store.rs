//! Index artifacts and the in-memory knowledge store.
//!
//! Two artifacts are produced by the offline indexing job and consumed
//! read-only at startup:
//!
//! ```text
//! <artifact root>/
//! ├── lexical/
//! │   ├── snapshot.bin    # LexicalSnapshot (bincode)
//! │   └── meta.json       # ArtifactMeta (human-inspectable)
//! └── vectors/
//!     ├── index.bin       # VectorArtifact (bincode)
//!     └── meta.json       # ArtifactMeta
//! ```
//!
//! The two must be pairwise consistent (same document ordinals, same
//! embedding model) or the core refuses to start. Every failure in this
//! module is a startup failure: the process must not serve traffic over
//! missing or corrupt indexes.
//!
//! The save functions define the contract for the offline indexer; the
//! core itself never writes artifacts at query time.

use std::fs;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use bincode::{config, Decode, Encode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::bm25::{tokenize, Bm25Index, Bm25Params};
use crate::constants::{
    INDEX_FILENAME, LEXICAL_DIR_NAME, META_FILENAME, SNAPSHOT_FILENAME, VECTORS_DIR_NAME,
};
use crate::embed::EmbeddingConfig;
use crate::errors::DeskmateError;
use crate::types::{Document, ReadinessReport};
use crate::vector::VectorIndex;

/// Current artifact format version.
pub const ARTIFACT_VERSION: u32 = 1;

// ============================================================================
// Artifact Bodies
// ============================================================================

/// The lexical index snapshot.
///
/// Carries the corpus itself (questions, answers, source tags) plus the
/// pre-tokenized question lists the BM25 statistics are derived from. All
/// four columns are indexed by document ordinal.
#[derive(Debug, Clone, Encode, Decode)]
pub struct LexicalSnapshot {
    /// Artifact format version.
    pub version: u32,
    /// Embedding model id the paired vector artifact was built with.
    pub model: String,
    /// Canonical question per document.
    pub questions: Vec<String>,
    /// Canonical answer per document.
    pub answers: Vec<String>,
    /// Source tag per document.
    pub sources: Vec<String>,
    /// Lower-cased whitespace-split question tokens per document.
    pub tokenized: Vec<Vec<String>>,
}

impl LexicalSnapshot {
    /// Build a snapshot from raw `(question, answer, source)` entries,
    /// tokenizing each question with the runtime tokenizer.
    pub fn from_entries(model: impl Into<String>, entries: &[(String, String, String)]) -> Self {
        let mut questions = Vec::with_capacity(entries.len());
        let mut answers = Vec::with_capacity(entries.len());
        let mut sources = Vec::with_capacity(entries.len());
        let mut tokenized = Vec::with_capacity(entries.len());

        for (question, answer, source) in entries {
            tokenized.push(tokenize(question));
            questions.push(question.clone());
            answers.push(answer.clone());
            sources.push(source.clone());
        }

        Self {
            version: ARTIFACT_VERSION,
            model: model.into(),
            questions,
            answers,
            sources,
            tokenized,
        }
    }

    /// Number of documents in the snapshot.
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Whether the snapshot holds no documents.
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    fn check_internal_consistency(&self) -> Result<(), DeskmateError> {
        let n = self.questions.len();
        if self.answers.len() != n || self.sources.len() != n || self.tokenized.len() != n {
            return Err(DeskmateError::ArtifactInconsistent {
                reason: format!(
                    "lexical snapshot columns disagree: {} questions, {} answers, {} sources, {} token lists",
                    n,
                    self.answers.len(),
                    self.sources.len(),
                    self.tokenized.len()
                ),
            });
        }
        Ok(())
    }
}

/// The vector index artifact: one L2-normalized embedding per document
/// ordinal.
#[derive(Debug, Clone, Encode, Decode)]
pub struct VectorArtifact {
    /// Artifact format version.
    pub version: u32,
    /// Embedding model id the vectors were produced with.
    pub model: String,
    /// Embedding dimension.
    pub dimension: u32,
    /// One vector per document ordinal.
    pub vectors: Vec<Vec<f32>>,
}

impl VectorArtifact {
    /// Build an artifact from pre-computed embeddings.
    pub fn new(model: impl Into<String>, dimension: u32, vectors: Vec<Vec<f32>>) -> Self {
        Self {
            version: ARTIFACT_VERSION,
            model: model.into(),
            dimension,
            vectors,
        }
    }
}

// ============================================================================
// Artifact Metadata
// ============================================================================

/// Sidecar metadata written next to each artifact body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactMeta {
    /// Artifact format version.
    pub version: u32,
    /// Number of documents in the artifact.
    pub documents: usize,
    /// Embedding model id recorded in the artifact.
    pub model: String,
    /// When the artifact was built.
    pub built_at: DateTime<Utc>,
}

// ============================================================================
// Paths
// ============================================================================

/// Directory of the lexical snapshot under the artifact root.
pub fn lexical_dir(root: &Path) -> PathBuf {
    root.join(LEXICAL_DIR_NAME)
}

/// Directory of the vector artifact under the artifact root.
pub fn vectors_dir(root: &Path) -> PathBuf {
    root.join(VECTORS_DIR_NAME)
}

// ============================================================================
// Save / Load
// ============================================================================

fn write_bincode<T: Encode>(value: &T, path: &Path) -> Result<(), DeskmateError> {
    let file = fs::File::create(path).map_err(|e| DeskmateError::ArtifactIo {
        path: path.to_path_buf(),
        message: format!("failed to create artifact file: {}", e),
    })?;
    let mut writer = BufWriter::new(file);
    bincode::encode_into_std_write(value, &mut writer, config::standard()).map_err(|e| {
        DeskmateError::ArtifactParse {
            path: path.to_path_buf(),
            message: format!("failed to serialize artifact: {}", e),
        }
    })?;
    Ok(())
}

fn read_bincode<T: Decode<()>>(path: &Path) -> Result<T, DeskmateError> {
    if !path.exists() {
        return Err(DeskmateError::ArtifactNotFound {
            path: path.to_path_buf(),
        });
    }
    let file = fs::File::open(path).map_err(|e| DeskmateError::ArtifactIo {
        path: path.to_path_buf(),
        message: format!("failed to open artifact file: {}", e),
    })?;
    let mut reader = BufReader::new(file);
    bincode::decode_from_std_read(&mut reader, config::standard()).map_err(|e| {
        DeskmateError::ArtifactParse {
            path: path.to_path_buf(),
            message: format!("failed to deserialize artifact: {}", e),
        }
    })
}

fn write_meta(meta: &ArtifactMeta, dir: &Path) -> Result<(), DeskmateError> {
    let path = dir.join(META_FILENAME);
    let json = serde_json::to_string_pretty(meta)?;
    fs::write(&path, json).map_err(|e| DeskmateError::ArtifactIo {
        path,
        message: format!("failed to write artifact metadata: {}", e),
    })
}

fn check_version(version: u32, path: &Path) -> Result<(), DeskmateError> {
    if version != ARTIFACT_VERSION {
        return Err(DeskmateError::ArtifactVersionMismatch {
            path: path.to_path_buf(),
            found: version,
            expected: ARTIFACT_VERSION,
        });
    }
    Ok(())
}

/// Save the lexical snapshot under the artifact root.
pub fn save_lexical_snapshot(
    snapshot: &LexicalSnapshot,
    root: &Path,
) -> Result<(), DeskmateError> {
    snapshot.check_internal_consistency()?;
    let dir = lexical_dir(root);
    fs::create_dir_all(&dir).map_err(|e| DeskmateError::ArtifactIo {
        path: dir.clone(),
        message: format!("failed to create lexical directory: {}", e),
    })?;

    write_bincode(snapshot, &dir.join(SNAPSHOT_FILENAME))?;
    write_meta(
        &ArtifactMeta {
            version: snapshot.version,
            documents: snapshot.len(),
            model: snapshot.model.clone(),
            built_at: Utc::now(),
        },
        &dir,
    )?;

    tracing::debug!(
        documents = snapshot.len(),
        model = %snapshot.model,
        "saved lexical snapshot to {}",
        dir.display()
    );
    Ok(())
}

/// Load the lexical snapshot from the artifact root.
pub fn load_lexical_snapshot(root: &Path) -> Result<LexicalSnapshot, DeskmateError> {
    let path = lexical_dir(root).join(SNAPSHOT_FILENAME);
    let snapshot: LexicalSnapshot = read_bincode(&path)?;
    check_version(snapshot.version, &path)?;
    snapshot.check_internal_consistency()?;

    tracing::debug!(
        documents = snapshot.len(),
        model = %snapshot.model,
        "loaded lexical snapshot from {}",
        path.display()
    );
    Ok(snapshot)
}

/// Save the vector artifact under the artifact root.
pub fn save_vector_artifact(
    artifact: &VectorArtifact,
    root: &Path,
) -> Result<(), DeskmateError> {
    let dir = vectors_dir(root);
    fs::create_dir_all(&dir).map_err(|e| DeskmateError::ArtifactIo {
        path: dir.clone(),
        message: format!("failed to create vectors directory: {}", e),
    })?;

    write_bincode(artifact, &dir.join(INDEX_FILENAME))?;
    write_meta(
        &ArtifactMeta {
            version: artifact.version,
            documents: artifact.vectors.len(),
            model: artifact.model.clone(),
            built_at: Utc::now(),
        },
        &dir,
    )?;

    tracing::debug!(
        documents = artifact.vectors.len(),
        dimension = artifact.dimension,
        model = %artifact.model,
        "saved vector artifact to {}",
        dir.display()
    );
    Ok(())
}

/// Load the vector artifact from the artifact root.
pub fn load_vector_artifact(root: &Path) -> Result<VectorArtifact, DeskmateError> {
    let path = vectors_dir(root).join(INDEX_FILENAME);
    let artifact: VectorArtifact = read_bincode(&path)?;
    check_version(artifact.version, &path)?;

    tracing::debug!(
        documents = artifact.vectors.len(),
        dimension = artifact.dimension,
        model = %artifact.model,
        "loaded vector artifact from {}",
        path.display()
    );
    Ok(artifact)
}

// ============================================================================
// KnowledgeStore
// ============================================================================

/// The loaded, immutable retrieval state: the document corpus plus both
/// indexes.
///
/// Constructed once at process start and held for the process lifetime.
/// Read-only, safe for unlimited concurrent readers, no locking required.
pub struct KnowledgeStore {
    documents: Vec<Document>,
    bm25: Bm25Index,
    vectors: VectorIndex,
    model: String,
}

impl KnowledgeStore {
    /// Load both artifacts and verify pairwise consistency.
    ///
    /// # Errors
    ///
    /// Every error from this function is a startup failure: missing or
    /// corrupt artifacts, disagreeing document counts, or an embedding
    /// model that does not match `embedding`'s configured model/dimension.
    pub fn load(
        root: &Path,
        bm25_params: Bm25Params,
        embedding: &EmbeddingConfig,
    ) -> Result<Self, DeskmateError> {
        let snapshot = load_lexical_snapshot(root)?;
        let artifact = load_vector_artifact(root)?;

        if snapshot.len() != artifact.vectors.len() {
            return Err(DeskmateError::ArtifactInconsistent {
                reason: format!(
                    "lexical snapshot has {} documents, vector index has {}",
                    snapshot.len(),
                    artifact.vectors.len()
                ),
            });
        }
        if snapshot.model != artifact.model {
            return Err(DeskmateError::ArtifactInconsistent {
                reason: format!(
                    "lexical snapshot was built with model `{}`, vector index with `{}`",
                    snapshot.model, artifact.model
                ),
            });
        }
        if artifact.model != embedding.model {
            return Err(DeskmateError::EmbeddingModelMismatch {
                artifact_model: artifact.model.clone(),
                configured_model: embedding.model.clone(),
            });
        }
        if artifact.dimension != embedding.dimension {
            return Err(DeskmateError::ArtifactInconsistent {
                reason: format!(
                    "vector index dimension is {}, configured embedder dimension is {}",
                    artifact.dimension, embedding.dimension
                ),
            });
        }

        let bm25 = Bm25Index::from_tokenized(&snapshot.tokenized, bm25_params);
        let vectors = VectorIndex::new(artifact.dimension, artifact.vectors)?;

        let documents = snapshot
            .questions
            .into_iter()
            .zip(snapshot.answers)
            .zip(snapshot.sources)
            .enumerate()
            .map(|(id, ((question, answer), source))| Document {
                id,
                question,
                answer,
                source,
            })
            .collect::<Vec<_>>();

        tracing::info!(
            documents = documents.len(),
            vocabulary = bm25.vocabulary_size(),
            dimension = vectors.dimension(),
            model = %snapshot.model,
            "knowledge store loaded"
        );

        Ok(Self {
            documents,
            bm25,
            vectors,
            model: snapshot.model,
        })
    }

    /// The document corpus, in ordinal order.
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Look up a document by ordinal.
    pub fn document(&self, id: usize) -> Option<&Document> {
        self.documents.get(id)
    }

    /// Number of documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the corpus is empty.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// The embedding model the indexes were built with.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// The BM25 index.
    pub fn bm25(&self) -> &Bm25Index {
        &self.bm25
    }

    /// The vector index.
    pub fn vectors(&self) -> &VectorIndex {
        &self.vectors
    }

    /// Readiness for the health-check surface.
    pub fn readiness(&self) -> ReadinessReport {
        // Loading is all-or-nothing; a constructed store is ready by
        // definition. The per-index booleans exist for the wire shape.
        ReadinessReport::new(true, true)
    }
}
