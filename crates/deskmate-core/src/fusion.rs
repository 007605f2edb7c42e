//! Weighted Reciprocal Rank Fusion of dense and sparse candidate lists.
//!
//! Formula, per document `d` and candidate list `L` with weight `w`:
//!
//! ```text
//! score(d) = Σ_L  w_L / (rank_L(d) + rrfK)
//! ```
//!
//! where `w = alpha` for the dense (vector) list and `w = 1 - alpha` for
//! the sparse (BM25) list, and `rank` is the 1-based position within that
//! list. A document appearing in both lists accumulates both
//! contributions. The `rrfK` damping constant (default 60) keeps score
//! differences driven by *which* list a document appears in and how early,
//! rather than by tie-breaking artifacts of either scorer.
//!
//! Fusion is deterministic: candidate selection, accumulation, and
//! ordering all tie-break by document ordinal, and accumulation happens in
//! `f64` so the two additions per document are exact to well below the
//! 4-decimal rounding applied at the external boundary.

use serde::{Deserialize, Serialize};

use crate::bm25::Bm25Candidate;
use crate::constants::{DEFAULT_ALPHA, DEFAULT_FINAL_K, DEFAULT_RRF_K};
use crate::errors::DeskmateError;
use crate::vector::VectorHit;

// ============================================================================
// Configuration
// ============================================================================

/// Rank-fusion configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FusionConfig {
    /// Weight for the dense (vector) candidate list; the sparse list gets
    /// `1 - alpha`. Must lie in [0, 1].
    /// Default: 0.75
    #[serde(default = "default_alpha")]
    pub alpha: f32,

    /// RRF damping constant. Higher values reduce the impact of rank
    /// differences.
    /// Default: 60
    #[serde(default = "default_rrf_k")]
    pub rrf_k: f32,

    /// Number of fused results to return. Each index contributes up to
    /// `2 * finalK` candidates before fusion.
    /// Default: 6
    #[serde(default = "default_final_k")]
    pub final_k: usize,
}

fn default_alpha() -> f32 {
    DEFAULT_ALPHA
}

fn default_rrf_k() -> f32 {
    DEFAULT_RRF_K
}

fn default_final_k() -> usize {
    DEFAULT_FINAL_K
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            alpha: default_alpha(),
            rrf_k: default_rrf_k(),
            final_k: default_final_k(),
        }
    }
}

impl FusionConfig {
    /// Validate the fusion configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `alpha` is outside [0, 1]
    /// - `rrfK` is zero or negative (would distort or divide away ranks)
    /// - `finalK` is zero
    ///
    /// # Warnings
    ///
    /// - `alpha` of exactly 0 or 1 (one index is dead weight)
    /// - Very large `rrfK` (> 100) which over-smooths rankings
    pub fn validate(&self) -> Result<Vec<String>, DeskmateError> {
        let mut warnings = Vec::new();

        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(DeskmateError::InvalidConfiguration {
                message: format!("retrieval.fusion.alpha={} is outside [0, 1]", self.alpha),
                hint: "Set alpha between 0.0 (pure lexical) and 1.0 (pure vector); recommended: 0.75".to_string(),
            });
        }
        if self.rrf_k <= 0.0 {
            return Err(DeskmateError::InvalidConfiguration {
                message: "retrieval.fusion.rrfK must be positive".to_string(),
                hint: "Set rrfK to a positive value (recommended: 60)".to_string(),
            });
        }
        if self.final_k == 0 {
            return Err(DeskmateError::InvalidConfiguration {
                message: "retrieval.fusion.finalK cannot be 0".to_string(),
                hint: "Set finalK to at least 1 (recommended: 6)".to_string(),
            });
        }

        if self.alpha == 0.0 || self.alpha == 1.0 {
            warnings.push(format!(
                "retrieval.fusion.alpha={} disables one index entirely; hybrid search degenerates to a single retriever",
                self.alpha
            ));
        }
        if self.rrf_k > 100.0 {
            warnings.push(format!(
                "retrieval.fusion.rrfK={} is very large; rankings will be heavily smoothed (recommended: 60). \
                 Note the relevance threshold is tuned against rrfK=60 and must be re-calibrated.",
                self.rrf_k
            ));
        }

        Ok(warnings)
    }
}

// ============================================================================
// Fusion
// ============================================================================

/// Fused per-document score at full precision.
///
/// Internal to retrieval: the pipeline validates relevance against these
/// scores, then materializes the external [`crate::types::FusedResult`]
/// with [`round_score`] applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusedScore {
    /// Document ordinal in the corpus.
    pub doc_id: usize,
    /// Accumulated RRF score (full precision).
    pub score: f64,
}

/// Round a fused score to 4 decimal digits for external consumption.
pub fn round_score(score: f64) -> f32 {
    ((score * 10_000.0).round() / 10_000.0) as f32
}

/// Merge dense and sparse candidates into the top-k fused list.
///
/// `dense_hits` must be ordered as returned by the vector index (ascending
/// distance, i.e. descending similarity); `lexical_scores` is the dense
/// per-document BM25 array. Each side contributes its top `2 * finalK`
/// candidates; only documents with strictly positive BM25 score qualify as
/// sparse candidates, so the result is never padded with zero-score
/// documents. Output is sorted by descending score with ties broken by
/// document ordinal, and holds `min(finalK, nonzero-scored documents)`
/// entries.
pub fn fuse(
    dense_hits: &[VectorHit],
    lexical_scores: &[f32],
    config: &FusionConfig,
) -> Result<Vec<FusedScore>, DeskmateError> {
    // Runtime guards mirror validate(): protect against a bypassed config.
    if !(0.0..=1.0).contains(&config.alpha) {
        return Err(DeskmateError::InvalidConfiguration {
            message: format!("retrieval.fusion.alpha={} is outside [0, 1]", config.alpha),
            hint: "Set alpha between 0.0 and 1.0 (recommended: 0.75)".to_string(),
        });
    }
    if config.rrf_k <= 0.0 {
        return Err(DeskmateError::InvalidConfiguration {
            message: "retrieval.fusion.rrfK must be positive for RRF fusion".to_string(),
            hint: "Set rrfK to a positive value (recommended: 60)".to_string(),
        });
    }

    let candidate_count = config.final_k.saturating_mul(2);
    let alpha = config.alpha as f64;
    let rrf_k = config.rrf_k as f64;

    let mut accumulated: Vec<f64> = vec![0.0; lexical_scores.len()];

    // Dense list: hits arrive ranked by the vector index.
    for (position, hit) in dense_hits.iter().take(candidate_count).enumerate() {
        if hit.doc_id >= accumulated.len() {
            continue;
        }
        let rank = (position + 1) as f64;
        accumulated[hit.doc_id] += alpha * (1.0 / (rank + rrf_k));
    }

    // Sparse list: top candidates with strictly positive score, ties by
    // ordinal.
    let mut sparse: Vec<(usize, f32)> = lexical_scores
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, score)| *score > 0.0)
        .collect();
    sparse.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    for (position, (doc_id, _)) in sparse.iter().take(candidate_count).enumerate() {
        let rank = (position + 1) as f64;
        accumulated[*doc_id] += (1.0 - alpha) * (1.0 / (rank + rrf_k));
    }

    let mut fused: Vec<FusedScore> = accumulated
        .into_iter()
        .enumerate()
        .filter(|(_, score)| *score > 0.0)
        .map(|(doc_id, score)| FusedScore { doc_id, score })
        .collect();

    fused.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.doc_id.cmp(&b.doc_id))
    });
    fused.truncate(config.final_k);

    Ok(fused)
}

/// Fuse ranked sparse candidates directly (convenience for callers that
/// already ran [`crate::bm25::Bm25Index::top_k`]).
///
/// Equivalent to [`fuse`] with a dense score array reconstructed from the
/// candidates; exposed for the search-only path.
pub fn fuse_candidates(
    dense_hits: &[VectorHit],
    sparse_candidates: &[Bm25Candidate],
    num_documents: usize,
    config: &FusionConfig,
) -> Result<Vec<FusedScore>, DeskmateError> {
    let mut lexical_scores = vec![0.0f32; num_documents];
    for candidate in sparse_candidates {
        if candidate.doc_id < num_documents {
            lexical_scores[candidate.doc_id] = candidate.score;
        }
    }
    fuse(dense_hits, &lexical_scores, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(doc_id: usize, distance: f32) -> VectorHit {
        VectorHit { doc_id, distance }
    }

    fn config(alpha: f32, final_k: usize) -> FusionConfig {
        FusionConfig {
            alpha,
            rrf_k: 60.0,
            final_k,
        }
    }

    #[test]
    fn test_fusion_is_deterministic() {
        let dense = vec![hit(0, 0.1), hit(2, 0.3), hit(1, 0.5)];
        let lexical = vec![2.0, 0.0, 3.5, 0.0];
        let cfg = config(0.75, 3);

        let first = fuse(&dense, &lexical, &cfg).unwrap();
        for _ in 0..10 {
            let again = fuse(&dense, &lexical, &cfg).unwrap();
            assert_eq!(first, again);
        }
    }

    #[test]
    fn test_both_lists_beat_single_list() {
        // doc 0 is rank 1 in both lists; doc 1 is rank 1 dense only (via a
        // separate query where doc 1 leads); compare accumulated scores.
        let dense = vec![hit(0, 0.1), hit(1, 0.2)];
        let lexical = vec![5.0, 0.0];
        let cfg = config(0.4, 2);

        let fused = fuse(&dense, &lexical, &cfg).unwrap();
        assert_eq!(fused[0].doc_id, 0);

        // Rank-1-in-both strictly exceeds rank-1-in-one for any alpha in (0,1).
        for alpha in [0.1, 0.25, 0.5, 0.75, 0.9] {
            let cfg = config(alpha, 2);
            let both = fuse(&[hit(0, 0.1)], &[5.0], &cfg).unwrap()[0].score;
            let dense_only = fuse(&[hit(0, 0.1)], &[0.0], &cfg).unwrap()[0].score;
            let sparse_only = fuse(&[], &[5.0], &cfg).unwrap()[0].score;
            assert!(both > dense_only);
            assert!(both > sparse_only);
        }
    }

    #[test]
    fn test_alpha_one_is_pure_vector() {
        let dense = vec![hit(2, 0.1), hit(0, 0.4)];
        let lexical = vec![9.0, 7.0, 0.0];
        let cfg = config(1.0, 3);

        let fused = fuse(&dense, &lexical, &cfg).unwrap();
        // Lexical contributes zero: only dense candidates survive, in dense
        // order.
        assert_eq!(fused.len(), 2);
        assert_eq!(fused[0].doc_id, 2);
        assert_eq!(fused[1].doc_id, 0);
    }

    #[test]
    fn test_alpha_zero_is_pure_lexical() {
        let dense = vec![hit(2, 0.1), hit(0, 0.4)];
        let lexical = vec![9.0, 7.0, 0.0];
        let cfg = config(0.0, 3);

        let fused = fuse(&dense, &lexical, &cfg).unwrap();
        assert_eq!(fused.len(), 2);
        assert_eq!(fused[0].doc_id, 0);
        assert_eq!(fused[1].doc_id, 1);
    }

    #[test]
    fn test_result_count_is_min_of_k_and_nonzero() {
        let dense = vec![hit(0, 0.2)];
        let lexical = vec![0.0, 1.5, 0.0, 0.0];
        let cfg = config(0.75, 6);

        // Only two documents score nonzero; result is smaller than k, never
        // padded.
        let fused = fuse(&dense, &lexical, &cfg).unwrap();
        assert_eq!(fused.len(), 2);

        let cfg = config(0.75, 1);
        let fused = fuse(&dense, &lexical, &cfg).unwrap();
        assert_eq!(fused.len(), 1);
    }

    #[test]
    fn test_empty_inputs_yield_empty_result() {
        let cfg = config(0.75, 6);
        let fused = fuse(&[], &[0.0, 0.0, 0.0], &cfg).unwrap();
        assert!(fused.is_empty());
    }

    #[test]
    fn test_candidate_lists_are_capped_at_twice_k() {
        // 8 dense hits, finalK=2 → only the first 4 contribute.
        let dense: Vec<VectorHit> = (0..8).map(|i| hit(i, i as f32 * 0.1)).collect();
        let lexical = vec![0.0; 8];
        let cfg = config(1.0, 2);

        let fused = fuse(&dense, &lexical, &cfg).unwrap();
        // Top-k cut returns 2, but internally docs 4..8 scored zero.
        assert_eq!(fused.len(), 2);
        assert_eq!(fused[0].doc_id, 0);

        // Doc 5 must not have accumulated anything: widen k with same list.
        let cfg_wide = FusionConfig {
            alpha: 1.0,
            rrf_k: 60.0,
            final_k: 8,
        };
        // With finalK=8 the cap is 16, all 8 contribute.
        let fused_wide = fuse(&dense, &lexical, &cfg_wide).unwrap();
        assert_eq!(fused_wide.len(), 8);
    }

    #[test]
    fn test_tie_break_by_ordinal() {
        // Docs 1 and 3 appear at the same rank in symmetric setups.
        let cfg = config(0.5, 4);
        let fused = fuse(&[hit(3, 0.1)], &[0.0, 2.0, 0.0, 0.0], &cfg).unwrap();
        // rank 1 dense (doc 3, weight .5) == rank 1 sparse (doc 1, weight .5)
        assert_eq!(fused.len(), 2);
        assert!((fused[0].score - fused[1].score).abs() < 1e-12);
        assert_eq!(fused[0].doc_id, 1);
        assert_eq!(fused[1].doc_id, 3);
    }

    #[test]
    fn test_round_score() {
        assert!((round_score(0.012_345_6) - 0.0123).abs() < 1e-7);
        assert!((round_score(0.012_36) - 0.0124).abs() < 1e-7);
        assert_eq!(round_score(0.0), 0.0);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let dense = vec![hit(0, 0.1)];
        let lexical = vec![1.0];

        let bad_alpha = FusionConfig {
            alpha: 1.5,
            ..Default::default()
        };
        assert!(fuse(&dense, &lexical, &bad_alpha).is_err());

        let bad_rrf = FusionConfig {
            rrf_k: 0.0,
            ..Default::default()
        };
        assert!(fuse(&dense, &lexical, &bad_rrf).is_err());
    }

    #[test]
    fn test_validate_warnings() {
        let cfg = config(1.0, 6);
        let warnings = cfg.validate().unwrap();
        assert!(!warnings.is_empty());

        let cfg = FusionConfig {
            rrf_k: 500.0,
            ..Default::default()
        };
        let warnings = cfg.validate().unwrap();
        assert!(warnings.iter().any(|w| w.contains("rrfK")));

        let cfg = FusionConfig::default();
        assert!(cfg.validate().unwrap().is_empty());
    }

    #[test]
    fn test_fuse_candidates_matches_fuse() {
        use crate::bm25::Bm25Candidate;

        let dense = vec![hit(0, 0.1), hit(1, 0.6)];
        let lexical = vec![0.0, 4.0, 2.0];
        let cfg = config(0.75, 3);

        let via_scores = fuse(&dense, &lexical, &cfg).unwrap();
        let candidates = vec![
            Bm25Candidate {
                doc_id: 1,
                score: 4.0,
                rank: 1,
            },
            Bm25Candidate {
                doc_id: 2,
                score: 2.0,
                rank: 2,
            },
        ];
        let via_candidates = fuse_candidates(&dense, &candidates, 3, &cfg).unwrap();
        assert_eq!(via_scores, via_candidates);
    }
}
