//! BM25 sparse retrieval for hybrid search.
//!
//! Lexical (sparse) retrieval complements dense semantic retrieval; the two
//! candidate lists are merged by weighted Reciprocal Rank Fusion in
//! [`crate::fusion`].
//!
//! ```text
//! Query tokens
//!   │
//!   ├──► Dense retrieval (query embedding + vector index)
//!   │        └──► top 2k candidates
//!   │
//!   └──► Sparse retrieval (BM25 inverted index)
//!            └──► top 2k candidates
//!                      │
//!                      ▼
//!              weighted RRF fusion
//!                      │
//!                      ▼
//!               relevance gate → final k results
//! ```
//!
//! ## Key Components
//!
//! - [`tokenizer`]: lower-case whitespace tokenization (must match the
//!   snapshot's token lists)
//! - [`index`]: BM25 inverted index with dense scoring and ranked top-k
//! - [`scorer`]: Okapi BM25 scoring function (k1=1.2, b=0.75)

pub mod index;
pub mod scorer;
pub mod tokenizer;

pub use index::{Bm25Candidate, Bm25Index};
pub use scorer::{bm25_term_score, idf, Bm25Params};
pub use tokenizer::tokenize;
