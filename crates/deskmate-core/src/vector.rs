//! Exact nearest-neighbor search over the FAQ embedding vectors.
//!
//! The corpus is FAQ-scale (hundreds to low thousands of entries), so the
//! index is a flat scan: exact L2 over every stored vector, no
//! approximation. Built once at startup from the vector artifact and
//! read-only thereafter; safe for unlimited concurrent readers. If the
//! corpus ever outgrows exact search, an approximate structure can replace
//! this behind the same contract.
//!
//! Distances are *squared* L2 (monotonic with L2, cheaper to compute, and
//! the numeric range the relevance threshold was tuned against). Stored and
//! query vectors are L2-normalized by the embedder; normalization is not
//! re-checked here. Querying with an un-normalized vector degrades ranking
//! quality but does not fail.

use crate::errors::DeskmateError;

/// A dense search hit: document ordinal plus squared L2 distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VectorHit {
    /// Document ordinal in the corpus.
    pub doc_id: usize,
    /// Squared L2 distance to the query (lower is better).
    pub distance: f32,
}

impl VectorHit {
    /// Similarity score in (0, 1], higher is better.
    ///
    /// `1 / (1 + distance)` keeps per-index scores positive and comparable
    /// in shape with BM25 scores before fusion.
    pub fn similarity(&self) -> f32 {
        1.0 / (1.0 + self.distance)
    }
}

/// Flat exact L2 index over the corpus embeddings.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    dimension: u32,
    vectors: Vec<Vec<f32>>,
}

impl VectorIndex {
    /// Create an index over pre-built embeddings.
    ///
    /// `vectors[i]` must be the (L2-normalized) embedding of the document
    /// at ordinal `i`. Every vector must have `dimension` components.
    pub fn new(dimension: u32, vectors: Vec<Vec<f32>>) -> Result<Self, DeskmateError> {
        for (ordinal, vector) in vectors.iter().enumerate() {
            if vector.len() != dimension as usize {
                return Err(DeskmateError::ArtifactInconsistent {
                    reason: format!(
                        "vector at ordinal {} has {} components, index dimension is {}",
                        ordinal,
                        vector.len(),
                        dimension
                    ),
                });
            }
        }
        Ok(Self { dimension, vectors })
    }

    /// Search for the `k` nearest stored vectors.
    ///
    /// Returns at most `min(k, corpus size)` hits in ascending distance
    /// order; distance ties break by document ordinal. `k` larger than the
    /// corpus is not an error.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<VectorHit>, DeskmateError> {
        if query.len() != self.dimension as usize {
            return Err(DeskmateError::EmbeddingDimensionMismatch {
                expected: self.dimension,
                got: query.len() as u32,
            });
        }

        let mut hits: Vec<VectorHit> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(doc_id, vector)| VectorHit {
                doc_id,
                distance: squared_l2(query, vector),
            })
            .collect();

        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.doc_id.cmp(&b.doc_id))
        });
        hits.truncate(k);

        Ok(hits)
    }

    /// Embedding dimension this index was built with.
    pub fn dimension(&self) -> u32 {
        self.dimension
    }

    /// Number of stored vectors.
    pub fn num_vectors(&self) -> usize {
        self.vectors.len()
    }

    /// Whether the index holds no vectors.
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

#[inline]
fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(x: f32, y: f32) -> Vec<f32> {
        let norm = (x * x + y * y).sqrt();
        vec![x / norm, y / norm]
    }

    fn create_test_index() -> VectorIndex {
        VectorIndex::new(2, vec![unit(1.0, 0.0), unit(0.0, 1.0), unit(1.0, 1.0)]).unwrap()
    }

    #[test]
    fn test_nearest_first() {
        let index = create_test_index();
        let hits = index.search(&unit(1.0, 0.1), 3).unwrap();

        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].doc_id, 0);
        assert!(hits[0].distance <= hits[1].distance);
        assert!(hits[1].distance <= hits[2].distance);
    }

    #[test]
    fn test_k_larger_than_corpus() {
        let index = create_test_index();
        let hits = index.search(&unit(1.0, 0.0), 50).unwrap();
        assert_eq!(hits.len(), 3);
    }

    #[test]
    fn test_exact_match_has_zero_distance() {
        let index = create_test_index();
        let hits = index.search(&unit(0.0, 1.0), 1).unwrap();

        assert_eq!(hits[0].doc_id, 1);
        assert!(hits[0].distance < 1e-6);
        assert!((hits[0].similarity() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_similarity_is_monotonic() {
        let near = VectorHit {
            doc_id: 0,
            distance: 0.1,
        };
        let far = VectorHit {
            doc_id: 1,
            distance: 1.5,
        };
        assert!(near.similarity() > far.similarity());
        assert!(far.similarity() > 0.0);
    }

    #[test]
    fn test_distance_tie_breaks_by_ordinal() {
        // Duplicate vectors: equal distance, ordinal order decides.
        let index = VectorIndex::new(2, vec![unit(1.0, 0.0), unit(1.0, 0.0)]).unwrap();
        let hits = index.search(&unit(1.0, 0.0), 2).unwrap();
        assert_eq!(hits[0].doc_id, 0);
        assert_eq!(hits[1].doc_id, 1);
    }

    #[test]
    fn test_dimension_mismatch_is_an_error() {
        let index = create_test_index();
        let result = index.search(&[1.0, 0.0, 0.0], 2);
        assert!(matches!(
            result,
            Err(DeskmateError::EmbeddingDimensionMismatch {
                expected: 2,
                got: 3
            })
        ));
    }

    #[test]
    fn test_ragged_vectors_rejected_at_build() {
        let result = VectorIndex::new(2, vec![vec![1.0, 0.0], vec![1.0]]);
        assert!(matches!(
            result,
            Err(DeskmateError::ArtifactInconsistent { .. })
        ));
    }

    #[test]
    fn test_empty_index() {
        let index = VectorIndex::new(3, Vec::new()).unwrap();
        assert!(index.is_empty());
        assert!(index.search(&[0.0, 0.0, 1.0], 5).unwrap().is_empty());
    }
}
