//! BM25 inverted index over the FAQ corpus.
//!
//! Built once at startup from the lexical snapshot's pre-tokenized question
//! lists and read-only thereafter: the index is a pure function of the
//! document store, safe for unlimited concurrent readers.
//!
//! Two query surfaces:
//! - [`Bm25Index::scores`]: a dense per-document score array in ordinal
//!   order (documents without any query term score zero);
//! - [`Bm25Index::top_k`]: the ranked positive-score candidates that feed
//!   rank fusion.

use std::collections::HashMap;

use super::scorer::{bm25_term_score, idf, Bm25Params};

/// Posting entry: document ordinal and term frequency.
#[derive(Debug, Clone)]
struct Posting {
    doc_id: usize,
    term_freq: usize,
}

/// A ranked lexical search hit.
#[derive(Debug, Clone)]
pub struct Bm25Candidate {
    /// Document ordinal in the corpus.
    pub doc_id: usize,
    /// BM25 score (strictly positive; zero-score documents are never
    /// candidates).
    pub score: f32,
    /// 1-indexed rank within this result list.
    pub rank: usize,
}

/// BM25 inverted index.
///
/// Stores term postings with frequencies, per-document token counts, and
/// the pre-computed average document length.
#[derive(Debug, Clone)]
pub struct Bm25Index {
    params: Bm25Params,
    /// Term → (document frequency, postings).
    inverted_index: HashMap<String, (usize, Vec<Posting>)>,
    /// Token count per document, in ordinal order.
    doc_lengths: Vec<usize>,
    avg_doc_len: f32,
}

impl Bm25Index {
    /// Build the index from pre-tokenized documents.
    ///
    /// `tokenized[i]` must be the token list of the document at ordinal `i`,
    /// produced by [`super::tokenizer::tokenize`].
    pub fn from_tokenized(tokenized: &[Vec<String>], params: Bm25Params) -> Self {
        let mut inverted_index: HashMap<String, (usize, Vec<Posting>)> = HashMap::new();
        let mut doc_lengths = Vec::with_capacity(tokenized.len());
        let mut total_tokens = 0usize;

        for (doc_id, tokens) in tokenized.iter().enumerate() {
            doc_lengths.push(tokens.len());
            total_tokens += tokens.len();

            let mut term_freqs: HashMap<&str, usize> = HashMap::new();
            for token in tokens {
                *term_freqs.entry(token.as_str()).or_insert(0) += 1;
            }

            for (term, tf) in term_freqs {
                let entry = inverted_index
                    .entry(term.to_string())
                    .or_insert((0, Vec::new()));
                entry.0 += 1;
                entry.1.push(Posting {
                    doc_id,
                    term_freq: tf,
                });
            }
        }

        let avg_doc_len = if doc_lengths.is_empty() {
            0.0
        } else {
            total_tokens as f32 / doc_lengths.len() as f32
        };

        Self {
            params,
            inverted_index,
            doc_lengths,
            avg_doc_len,
        }
    }

    /// Score every document against the query tokens.
    ///
    /// Returns a dense array with one score per document, in ordinal order.
    /// Unknown terms contribute nothing; an empty token list yields an
    /// all-zero array.
    pub fn scores(&self, query_tokens: &[String]) -> Vec<f32> {
        let mut scores = vec![0.0f32; self.doc_lengths.len()];
        if self.doc_lengths.is_empty() || query_tokens.is_empty() {
            return scores;
        }

        let num_docs = self.doc_lengths.len();
        for term in query_tokens {
            if let Some((df, postings)) = self.inverted_index.get(term) {
                let idf_val = idf(num_docs, *df);
                for posting in postings {
                    scores[posting.doc_id] += bm25_term_score(
                        posting.term_freq,
                        self.doc_lengths[posting.doc_id],
                        self.avg_doc_len,
                        idf_val,
                        &self.params,
                    );
                }
            }
        }

        scores
    }

    /// Return the top-k documents with strictly positive score, ranked.
    ///
    /// Ties break by document ordinal so results are deterministic.
    pub fn top_k(&self, query_tokens: &[String], top_k: usize) -> Vec<Bm25Candidate> {
        let scores = self.scores(query_tokens);

        let mut scored: Vec<(usize, f32)> = scores
            .into_iter()
            .enumerate()
            .filter(|(_, score)| *score > 0.0)
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });

        scored
            .into_iter()
            .take(top_k)
            .enumerate()
            .map(|(rank, (doc_id, score))| Bm25Candidate {
                doc_id,
                score,
                rank: rank + 1,
            })
            .collect()
    }

    /// Number of documents in the index.
    pub fn num_documents(&self) -> usize {
        self.doc_lengths.len()
    }

    /// Number of unique terms in the vocabulary.
    pub fn vocabulary_size(&self) -> usize {
        self.inverted_index.len()
    }

    /// Average document length in tokens.
    pub fn avg_doc_length(&self) -> f32 {
        self.avg_doc_len
    }

    /// Document frequency for a term.
    pub fn document_frequency(&self, term: &str) -> usize {
        self.inverted_index
            .get(term)
            .map(|(df, _)| *df)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bm25::tokenizer::tokenize;

    fn create_test_index() -> Bm25Index {
        let questions = [
            "how to reset my password",
            "how to change my email address",
            "how to delete my account",
            "why is the vpn connection slow",
        ];
        let tokenized: Vec<Vec<String>> = questions.iter().map(|q| tokenize(q)).collect();
        Bm25Index::from_tokenized(&tokenized, Bm25Params::default())
    }

    #[test]
    fn test_scores_are_dense_and_ordinal() {
        let index = create_test_index();
        let scores = index.scores(&tokenize("reset password"));

        assert_eq!(scores.len(), 4);
        assert!(scores[0] > 0.0);
        assert_eq!(scores[3], 0.0);
    }

    #[test]
    fn test_empty_query_yields_all_zero() {
        let index = create_test_index();
        let scores = index.scores(&[]);
        assert_eq!(scores, vec![0.0; 4]);
    }

    #[test]
    fn test_unknown_terms_yield_all_zero() {
        let index = create_test_index();
        let scores = index.scores(&tokenize("kubernetes ingress"));
        assert!(scores.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_top_k_excludes_zero_scores() {
        let index = create_test_index();
        let candidates = index.top_k(&tokenize("password"), 10);

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].doc_id, 0);
        assert_eq!(candidates[0].rank, 1);
    }

    #[test]
    fn test_top_k_ranks_are_sequential() {
        let index = create_test_index();
        // "how to my" hits the first three questions.
        let candidates = index.top_k(&tokenize("how to my"), 10);

        assert!(candidates.len() >= 3);
        for (i, candidate) in candidates.iter().enumerate() {
            assert_eq!(candidate.rank, i + 1);
        }
    }

    #[test]
    fn test_term_frequency_ranks_higher() {
        let tokenized = vec![
            tokenize("vpn vpn vpn setup"),
            tokenize("vpn setup"),
            tokenize("printer setup"),
        ];
        let index = Bm25Index::from_tokenized(&tokenized, Bm25Params::default());

        let candidates = index.top_k(&tokenize("vpn"), 10);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].doc_id, 0);
        assert!(candidates[0].score > candidates[1].score);
    }

    #[test]
    fn test_tie_break_by_ordinal() {
        // Two identical documents: equal scores, ordinal order decides.
        let tokenized = vec![tokenize("reset password"), tokenize("reset password")];
        let index = Bm25Index::from_tokenized(&tokenized, Bm25Params::default());

        let candidates = index.top_k(&tokenize("password"), 10);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].doc_id, 0);
        assert_eq!(candidates[1].doc_id, 1);
    }

    #[test]
    fn test_empty_corpus() {
        let index = Bm25Index::from_tokenized(&[], Bm25Params::default());
        assert_eq!(index.num_documents(), 0);
        assert!(index.scores(&tokenize("anything")).is_empty());
        assert!(index.top_k(&tokenize("anything"), 5).is_empty());
    }

    #[test]
    fn test_stats_accessors() {
        let index = create_test_index();
        assert_eq!(index.num_documents(), 4);
        assert!(index.vocabulary_size() > 0);
        assert!(index.avg_doc_length() > 0.0);
        assert_eq!(index.document_frequency("how"), 3);
        assert_eq!(index.document_frequency("nonexistent"), 0);
    }
}
