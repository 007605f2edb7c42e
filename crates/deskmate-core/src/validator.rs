//! Relevance gate: decide from fused scores alone whether to answer.
//!
//! The single precision/recall control point of the system. It trades
//! "answer confidently" against "refuse rather than hallucinate": when the
//! best fused score does not clear the threshold, the pipeline refuses and
//! the generation backend is never invoked.
//!
//! The threshold is calibrated against the fusion formula in
//! [`crate::fusion`] (the rrfK damping and the default alpha). Changing
//! those constants invalidates the threshold and requires re-tuning.

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_RELEVANCE_THRESHOLD;
use crate::errors::DeskmateError;
use crate::fusion::FusedScore;

/// Relevance gate configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelevanceConfig {
    /// Minimum best fused score required to answer (strict greater-than).
    /// Default: 0.008
    #[serde(default = "default_threshold")]
    pub threshold: f32,
}

fn default_threshold() -> f32 {
    DEFAULT_RELEVANCE_THRESHOLD
}

impl Default for RelevanceConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
        }
    }
}

impl RelevanceConfig {
    /// Validate the relevance configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the threshold is negative.
    ///
    /// # Warnings
    ///
    /// - A zero threshold (every nonzero fusion score passes)
    /// - A threshold above the theoretical RRF ceiling for the default
    ///   damping (nothing would ever pass)
    pub fn validate(&self) -> Result<Vec<String>, DeskmateError> {
        let mut warnings = Vec::new();

        if self.threshold < 0.0 {
            return Err(DeskmateError::InvalidConfiguration {
                message: format!(
                    "retrieval.relevanceThreshold={} cannot be negative",
                    self.threshold
                ),
                hint: "Set the threshold to 0.0 or higher (recommended: 0.008)".to_string(),
            });
        }

        if self.threshold == 0.0 {
            warnings.push(
                "retrieval.relevanceThreshold=0 disables the relevance gate; every query with \
                 any retrieval signal will be answered"
                    .to_string(),
            );
        }
        // Two rank-1 appearances with rrfK=60 accumulate 1/61 ≈ 0.0164.
        if self.threshold > 0.0164 {
            warnings.push(format!(
                "retrieval.relevanceThreshold={} exceeds the best achievable fused score for \
                 rrfK=60; every query would be refused",
                self.threshold
            ));
        }

        Ok(warnings)
    }
}

/// Whether the fused results carry enough signal to answer.
///
/// Computes the maximum full-precision fused score and compares it
/// strictly against the threshold. An empty result set is never relevant.
pub fn is_relevant(results: &[FusedScore], threshold: f32) -> bool {
    if results.is_empty() {
        return false;
    }

    let max_score = results.iter().map(|r| r.score).fold(0.0f64, f64::max);

    tracing::debug!(max_score, threshold, "relevance gate evaluated");

    max_score > threshold as f64
}
