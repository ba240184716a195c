//! BM25 keyword (sparse) retrieval.
//!
//! Complements dense retrieval: the orchestrator fuses both modalities with
//! Reciprocal Rank Fusion.
//!
//! ```text
//! corpus snapshot ──► Bm25Index::build ──► Arc<Bm25Index>
//!                                              │
//!                     KeywordIndex (RwLock swap) ◄┘
//!                              │
//!                        search(query, k)
//! ```
//!
//! ## Key Components
//!
//! - [`tokenizer`]: whitespace split + lowercase, nothing else
//! - [`scorer`]: Okapi BM25 term scoring (k1=1.5, b=0.75)
//! - [`index`]: immutable inverted index over a chunk snapshot
//! - [`shared`]: the process-wide handle with lazy build and atomic rebuild

mod index;
mod scorer;
mod shared;
mod tokenizer;

pub use index::{Bm25Index, Bm25IndexStats};
pub use scorer::{bm25_term_score, idf, Bm25Params};
pub use shared::KeywordIndex;
pub use tokenizer::tokenize;

use serde::{Deserialize, Serialize};

use crate::errors::IrraError;

/// Keyword index scoring configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bm25Config {
    /// Term frequency saturation. Default: 1.5
    #[serde(default = "default_k1")]
    pub k1: f32,

    /// Document length normalization, 0 (none) to 1 (full). Default: 0.75
    #[serde(default = "default_b")]
    pub b: f32,
}

fn default_k1() -> f32 {
    1.5
}

fn default_b() -> f32 {
    0.75
}

impl Default for Bm25Config {
    fn default() -> Self {
        Self {
            k1: default_k1(),
            b: default_b(),
        }
    }
}

impl Bm25Config {
    /// # Errors
    ///
    /// Returns an error if `k1 <= 0` or `b` is outside `[0, 1]`.
    pub fn validate(&self) -> Result<(), IrraError> {
        if self.k1 <= 0.0 || !self.k1.is_finite() {
            return Err(IrraError::invalid_configuration(
                "retrieval.keyword.k1 must be positive",
                "Set k1 to a positive value (recommended: 1.5)",
            ));
        }
        if !(0.0..=1.0).contains(&self.b) {
            return Err(IrraError::invalid_configuration(
                "retrieval.keyword.b must be between 0 and 1",
                "Set b between 0.0 and 1.0 (recommended: 0.75)",
            ));
        }
        Ok(())
    }

    pub fn params(&self) -> Bm25Params {
        Bm25Params {
            k1: self.k1,
            b: self.b,
        }
    }
}
