//! Immutable BM25 inverted index over a chunk snapshot.
//!
//! An index is never updated in place. Corpus changes produce a new index
//! that replaces the old one wholesale (see [`super::KeywordIndex`]).

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::scorer::{bm25_term_score, idf, Bm25Params};
use super::tokenizer::tokenize;
use crate::types::Chunk;

/// Posting entry: document position and term frequency.
#[derive(Debug, Clone, Copy)]
struct Posting {
    doc_idx: usize,
    term_freq: usize,
}

/// BM25 index owning a copy of the chunks it was built from.
#[derive(Debug, Clone)]
pub struct Bm25Index {
    params: Bm25Params,
    chunks: Vec<Chunk>,
    doc_lengths: Vec<usize>,
    postings: HashMap<String, Vec<Posting>>,
    avg_doc_len: f32,
    total_tokens: usize,
    built_at: DateTime<Utc>,
}

impl Bm25Index {
    /// Index with no documents.
    pub fn empty(params: Bm25Params) -> Self {
        Self::build(Vec::new(), params)
    }

    /// Build an index over `chunks`, preserving their order.
    ///
    /// Tokenization runs in parallel; postings are merged in corpus order.
    pub fn build(chunks: Vec<Chunk>, params: Bm25Params) -> Self {
        let term_counts: Vec<(usize, HashMap<String, usize>)> = chunks
            .par_iter()
            .map(|chunk| {
                let tokens = tokenize(&chunk.content);
                let len = tokens.len();
                let mut counts: HashMap<String, usize> = HashMap::new();
                for token in tokens {
                    *counts.entry(token).or_insert(0) += 1;
                }
                (len, counts)
            })
            .collect();

        let mut postings: HashMap<String, Vec<Posting>> = HashMap::new();
        let mut doc_lengths = Vec::with_capacity(term_counts.len());
        for (doc_idx, (len, counts)) in term_counts.into_iter().enumerate() {
            doc_lengths.push(len);
            for (term, term_freq) in counts {
                postings
                    .entry(term)
                    .or_default()
                    .push(Posting { doc_idx, term_freq });
            }
        }

        let total_tokens: usize = doc_lengths.iter().sum();
        let avg_doc_len = if doc_lengths.is_empty() {
            0.0
        } else {
            total_tokens as f32 / doc_lengths.len() as f32
        };

        Self {
            params,
            chunks,
            doc_lengths,
            postings,
            avg_doc_len,
            total_tokens,
            built_at: Utc::now(),
        }
    }

    /// Score every chunk sharing at least one term with `query`.
    ///
    /// Returns `(doc_idx, score)` pairs sorted by score descending, ties in
    /// corpus order. Zero scores never appear.
    pub fn scores(&self, query: &str) -> Vec<(usize, f32)> {
        if self.chunks.is_empty() {
            return Vec::new();
        }

        let num_docs = self.chunks.len();
        let mut scores: HashMap<usize, f32> = HashMap::new();

        for term in tokenize(query) {
            let Some(postings) = self.postings.get(&term) else {
                continue;
            };
            let idf_value = idf(num_docs, postings.len());
            for posting in postings {
                *scores.entry(posting.doc_idx).or_insert(0.0) += bm25_term_score(
                    posting.term_freq,
                    self.doc_lengths[posting.doc_idx],
                    self.avg_doc_len,
                    idf_value,
                    &self.params,
                );
            }
        }

        let mut ranked: Vec<(usize, f32)> =
            scores.into_iter().filter(|(_, s)| *s > 0.0).collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        ranked
    }

    /// Up to `k` chunks ordered by BM25 score.
    pub fn search(&self, query: &str, k: usize) -> Vec<Chunk> {
        if k == 0 {
            return Vec::new();
        }
        self.scores(query)
            .into_iter()
            .take(k)
            .map(|(idx, _)| self.chunks[idx].clone())
            .collect()
    }

    /// Chunks the index was built from, in corpus order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn num_documents(&self) -> usize {
        self.chunks.len()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.postings.len()
    }

    pub fn avg_doc_length(&self) -> f32 {
        self.avg_doc_len
    }

    /// Number of chunks containing `term` (already tokenized form).
    pub fn document_frequency(&self, term: &str) -> usize {
        self.postings.get(term).map(Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn stats(&self) -> Bm25IndexStats {
        Bm25IndexStats {
            num_documents: self.chunks.len(),
            vocabulary_size: self.postings.len(),
            total_tokens: self.total_tokens,
            avg_doc_length: self.avg_doc_len,
            built_at: self.built_at,
        }
    }
}

/// Statistics about a built keyword index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bm25IndexStats {
    pub num_documents: usize,
    pub vocabulary_size: usize,
    pub total_tokens: usize,
    pub avg_doc_length: f32,
    pub built_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChunkMetadata;

    fn chunk(text: &str) -> Chunk {
        Chunk::new(text, ChunkMetadata::for_source("notes.pdf"))
    }

    fn index(texts: &[&str]) -> Bm25Index {
        Bm25Index::build(texts.iter().map(|t| chunk(t)).collect(), Bm25Params::default())
    }

    #[test]
    fn test_empty_index_returns_nothing() {
        let index = Bm25Index::empty(Bm25Params::default());
        assert!(index.search("anything", 10).is_empty());
        assert_eq!(index.avg_doc_length(), 0.0);
    }

    #[test]
    fn test_unique_term_in_two_chunk_corpus() {
        let index = index(&["mitochondria produce atp", "ribosomes build proteins"]);

        let results = index.search("mitochondria", 10);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].content, "mitochondria produce atp");
    }

    #[test]
    fn test_zero_score_chunks_excluded_even_with_large_k() {
        let index = index(&["alpha beta", "gamma delta", "alpha gamma"]);
        let results = index.search("beta", 100);
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_case_folded_matching() {
        let index = index(&["Photosynthesis occurs in CHLOROPLASTS"]);
        assert_eq!(index.search("chloroplasts", 5).len(), 1);
        assert_eq!(index.search("PHOTOSYNTHESIS", 5).len(), 1);
    }

    #[test]
    fn test_no_stemming() {
        let index = index(&["cells divide"]);
        assert!(index.search("cell", 5).is_empty());
    }

    #[test]
    fn test_ranking_by_term_frequency() {
        let index = index(&[
            "python programming",
            "rust rust rust rust programming",
            "rust programming",
        ]);

        let results = index.search("rust", 10);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].content, "rust rust rust rust programming");
        assert_eq!(results[1].content, "rust programming");
    }

    #[test]
    fn test_ties_keep_corpus_order() {
        let index = index(&["enzyme one", "filler text", "enzyme two"]);
        let results = index.search("enzyme", 10);
        assert_eq!(results[0].content, "enzyme one");
        assert_eq!(results[1].content, "enzyme two");
    }

    #[test]
    fn test_repeated_query_token_counts_per_occurrence() {
        let index = index(&["osmosis water", "diffusion water"]);
        let once = index.scores("osmosis");
        let twice = index.scores("osmosis osmosis");
        assert!((twice[0].1 - 2.0 * once[0].1).abs() < 1e-5);
    }

    #[test]
    fn test_top_k_limit() {
        let texts: Vec<String> = (0..50).map(|i| format!("test document {i}")).collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let index = index(&refs);

        assert_eq!(index.search("test", 5).len(), 5);
        assert_eq!(index.search("test", 1000).len(), 50);
        assert!(index.search("test", 0).is_empty());
    }

    #[test]
    fn test_stats() {
        let index = index(&["a b c", "c d"]);
        let stats = index.stats();
        assert_eq!(stats.num_documents, 2);
        assert_eq!(stats.vocabulary_size, 4);
        assert_eq!(stats.total_tokens, 5);
        assert!((stats.avg_doc_length - 2.5).abs() < f32::EPSILON);
        assert_eq!(index.document_frequency("c"), 2);
    }
}
