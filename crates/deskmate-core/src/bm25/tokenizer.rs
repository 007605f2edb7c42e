//! Query/document tokenization for BM25.
//!
//! Deliberately minimal: lower-case and split on whitespace, nothing else.
//! The lexical snapshot stores document tokens produced by this exact
//! transform, and BM25 term statistics are tokenization-sensitive: a
//! stemmer or stop-word list here would silently skew every score against
//! the index. Keep the two sides in lock-step.

/// Tokenize text into lower-cased whitespace-separated tokens.
///
/// An empty or all-whitespace input yields an empty vector, not an error.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|token| token.to_lowercase())
        .collect()
}
