//! BM25 scoring algorithm.
//!
//! Implements the Okapi BM25 scoring function:
//!
//! ```text
//! score(D, Q) = Σ IDF(q_i) * (f(q_i, D) * (k1 + 1)) / (f(q_i, D) + k1 * (1 - b + b * |D| / avgdl))
//! ```
//!
//! Where:
//! - f(q_i, D) = frequency of query term q_i in document D
//! - |D| = document length (in tokens)
//! - avgdl = average document length in the corpus
//! - k1 = term frequency saturation parameter (default: 1.2)
//! - b = document length normalization parameter (default: 0.75)
//! - IDF = inverse document frequency

use serde::{Deserialize, Serialize};

/// BM25 scoring parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bm25Params {
    /// Term frequency saturation parameter.
    /// Higher values give more weight to term frequency.
    /// Default: 1.2
    #[serde(default = "default_k1")]
    pub k1: f32,

    /// Document length normalization parameter.
    /// 0 = no normalization, 1 = full normalization.
    /// Default: 0.75
    #[serde(default = "default_b")]
    pub b: f32,
}

fn default_k1() -> f32 {
    1.2
}

fn default_b() -> f32 {
    0.75
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self {
            k1: default_k1(),
            b: default_b(),
        }
    }
}

/// Calculate the IDF (Inverse Document Frequency) for a term.
///
/// Uses the smoothed IDF formula:
/// ```text
/// IDF(t) = ln((N - df(t) + 0.5) / (df(t) + 0.5) + 1)
/// ```
///
/// Always positive, even for terms appearing in every document.
#[inline]
pub fn idf(num_docs: usize, doc_freq: usize) -> f32 {
    let n = num_docs as f32;
    let df = doc_freq as f32;
    ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
}

/// Calculate the BM25 score contribution for a single term.
///
/// # Arguments
///
/// * `term_freq` - Frequency of the term in the document
/// * `doc_len` - Length of the document (in tokens)
/// * `avg_doc_len` - Average document length in the corpus
/// * `idf_value` - Pre-computed IDF value for the term
/// * `params` - BM25 parameters (k1, b)
#[inline]
pub fn bm25_term_score(
    term_freq: usize,
    doc_len: usize,
    avg_doc_len: f32,
    idf_value: f32,
    params: &Bm25Params,
) -> f32 {
    let tf = term_freq as f32;
    let dl = doc_len as f32;
    let k1 = params.k1;
    let b = params.b;

    let numerator = tf * (k1 + 1.0);
    let denominator = tf + k1 * (1.0 - b + b * dl / avg_doc_len);

    idf_value * numerator / denominator
}
