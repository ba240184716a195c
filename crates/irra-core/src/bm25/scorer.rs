//! Okapi BM25 scoring.
//!
//! ```text
//! score(D, Q) = Σ IDF(q_i) * (f(q_i, D) * (k1 + 1)) / (f(q_i, D) + k1 * (1 - b + b * |D| / avgdl))
//! ```
//!
//! The sum runs over query tokens as given, so a repeated query token
//! contributes once per occurrence.

/// BM25 scoring parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25Params {
    pub k1: f32,
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75 }
    }
}

/// Smoothed IDF: `ln((N - df + 0.5) / (df + 0.5) + 1)`.
///
/// Always positive, so a term present in every chunk still scores above zero
/// and a term unique to one chunk of two scores well.
#[inline]
pub fn idf(num_docs: usize, doc_freq: usize) -> f32 {
    let n = num_docs as f32;
    let df = doc_freq as f32;
    ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
}

/// Score contribution of one query term to one document.
#[inline]
pub fn bm25_term_score(
    term_freq: usize,
    doc_len: usize,
    avg_doc_len: f32,
    idf_value: f32,
    params: &Bm25Params,
) -> f32 {
    if term_freq == 0 || avg_doc_len <= 0.0 {
        return 0.0;
    }
    let tf = term_freq as f32;
    let norm = 1.0 - params.b + params.b * doc_len as f32 / avg_doc_len;
    idf_value * tf * (params.k1 + 1.0) / (tf + params.k1 * norm)
}
