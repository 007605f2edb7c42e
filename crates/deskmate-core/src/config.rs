//! Configuration for the Deskmate engine.
//!
//! A single YAML file configures artifact locations, the query embedder,
//! retrieval tuning, and the generation backend:
//!
//! ```yaml
//! artifacts:
//!   dir: ./artifacts
//! embedding:
//!   provider: ollama
//!   model: all-minilm
//!   dimension: 384
//! retrieval:
//!   fusion:
//!     alpha: 0.75
//!     rrfK: 60
//!     finalK: 6
//!   relevance:
//!     threshold: 0.008
//! generation:
//!   provider: ollama
//!   model: gemma3:4b
//!   temperature: 0.2
//! ```
//!
//! Every field has a default; an absent file yields a fully default
//! configuration. Secrets (the cloud API key) resolve from the environment
//! exactly once, at load time; nothing re-reads the environment per
//! request.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::bm25::Bm25Params;
use crate::constants::CONFIG_FILENAME;
use crate::embed::EmbeddingConfig;
use crate::errors::DeskmateError;
use crate::fusion::FusionConfig;
use crate::generation::GenerationConfig;
use crate::validator::RelevanceConfig;

// ============================================================================
// Sections
// ============================================================================

/// Where the index artifacts live.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactsConfig {
    /// Root directory holding `lexical/` and `vectors/`.
    /// Default: ./artifacts
    #[serde(default = "default_artifacts_dir")]
    pub dir: PathBuf,
}

fn default_artifacts_dir() -> PathBuf {
    PathBuf::from("artifacts")
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            dir: default_artifacts_dir(),
        }
    }
}

/// Retrieval tuning: fusion weights, the relevance gate, BM25 parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalConfig {
    /// Rank-fusion configuration.
    #[serde(default)]
    pub fusion: FusionConfig,

    /// Relevance gate configuration.
    #[serde(default)]
    pub relevance: RelevanceConfig,

    /// BM25 scoring parameters.
    #[serde(default)]
    pub bm25: Bm25Params,
}

impl RetrievalConfig {
    /// Validate the retrieval section, collecting warnings.
    pub fn validate(&self) -> Result<Vec<String>, DeskmateError> {
        let mut warnings = Vec::new();
        warnings.extend(self.fusion.validate()?);
        warnings.extend(self.relevance.validate()?);

        if self.bm25.k1 < 0.0 {
            return Err(DeskmateError::InvalidConfiguration {
                message: format!("retrieval.bm25.k1={} cannot be negative", self.bm25.k1),
                hint: "Set k1 to a non-negative value (recommended: 1.2)".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.bm25.b) {
            return Err(DeskmateError::InvalidConfiguration {
                message: format!("retrieval.bm25.b={} is outside [0, 1]", self.bm25.b),
                hint: "Set b between 0.0 (no length normalization) and 1.0 (recommended: 0.75)"
                    .to_string(),
            });
        }

        Ok(warnings)
    }
}

// ============================================================================
// DeskmateConfig
// ============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeskmateConfig {
    /// Artifact locations.
    #[serde(default)]
    pub artifacts: ArtifactsConfig,

    /// Query embedder configuration.
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Retrieval tuning.
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Generation backend configuration.
    #[serde(default)]
    pub generation: GenerationConfig,
}

impl DeskmateConfig {
    /// Validate the whole configuration, collecting warnings.
    ///
    /// Warnings flag questionable-but-valid values; errors abort startup.
    pub fn validate(&self) -> Result<Vec<String>, DeskmateError> {
        let mut warnings = Vec::new();
        warnings.extend(self.embedding.validate()?);
        warnings.extend(self.retrieval.validate()?);
        warnings.extend(self.generation.validate()?);
        Ok(warnings)
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Load the engine configuration.
///
/// With an explicit `path` the file must exist. Without one,
/// `deskmate.yaml` in the working directory is used when present,
/// otherwise every field takes its default. The generation API key is
/// resolved from the environment here, once.
pub fn load_config(path: Option<&Path>) -> Result<DeskmateConfig, DeskmateError> {
    let mut config = match path {
        Some(path) => read_config_file(path)?,
        None => {
            let default_path = Path::new(CONFIG_FILENAME);
            if default_path.exists() {
                read_config_file(default_path)?
            } else {
                tracing::debug!("no {} found, using defaults", CONFIG_FILENAME);
                DeskmateConfig::default()
            }
        }
    };

    config.generation.resolve_api_key_from_env();
    Ok(config)
}

fn read_config_file(path: &Path) -> Result<DeskmateConfig, DeskmateError> {
    let content = std::fs::read_to_string(path).map_err(|e| DeskmateError::ConfigIo {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let config: DeskmateConfig =
        serde_yaml::from_str(&content).map_err(|e| DeskmateError::ConfigParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    tracing::debug!("loaded configuration from {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::EmbedderKind;
    use crate::generation::GenerationProviderKind;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = DeskmateConfig::default();
        let warnings = config.validate().unwrap();
        assert!(warnings.is_empty(), "unexpected warnings: {:?}", warnings);
    }

    #[test]
    fn test_parse_partial_yaml() {
        let yaml = r#"
retrieval:
  fusion:
    alpha: 0.5
    finalK: 3
generation:
  provider: openai
  model: gpt-4o-mini
  apiKey: sk-test
"#;
        let config: DeskmateConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.retrieval.fusion.alpha, 0.5);
        assert_eq!(config.retrieval.fusion.final_k, 3);
        // Unset fields keep their defaults.
        assert_eq!(config.retrieval.fusion.rrf_k, 60.0);
        assert_eq!(config.retrieval.relevance.threshold, 0.008);
        assert_eq!(config.embedding.provider, EmbedderKind::Ollama);
        assert_eq!(config.generation.provider, GenerationProviderKind::OpenAi);
        assert_eq!(config.generation.model, "gpt-4o-mini");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let yaml = r#"
retrieval:
  fusion:
    alpha: 1.5
"#;
        let config: DeskmateConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());

        let yaml = r#"
retrieval:
  bm25:
    b: 2.0
"#;
        let config: DeskmateConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "artifacts:\n  dir: /srv/deskmate/artifacts").unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.artifacts.dir, PathBuf::from("/srv/deskmate/artifacts"));
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let result = load_config(Some(Path::new("/nonexistent/deskmate.yaml")));
        assert!(matches!(result, Err(DeskmateError::ConfigIo { .. })));
    }

    #[test]
    fn test_load_malformed_yaml_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "retrieval: [not, a, mapping").unwrap();

        let result = load_config(Some(file.path()));
        assert!(matches!(result, Err(DeskmateError::ConfigParse { .. })));
    }
}
