//! Corpus snapshot provider consumed by the keyword index.

use std::sync::Arc;

use crate::errors::IrraError;
use crate::types::Chunk;

/// Supplies a full snapshot of the current corpus.
///
/// Called whenever the keyword index is (re)built. Implementations return
/// chunks in a stable order; ties in keyword scoring follow it.
pub trait CorpusProvider: Send + Sync {
    fn all_chunks(&self) -> Result<Vec<Chunk>, IrraError>;
}

impl CorpusProvider for Vec<Chunk> {
    fn all_chunks(&self) -> Result<Vec<Chunk>, IrraError> {
        Ok(self.clone())
    }
}

impl<T: CorpusProvider + ?Sized> CorpusProvider for Arc<T> {
    fn all_chunks(&self) -> Result<Vec<Chunk>, IrraError> {
        (**self).all_chunks()
    }
}
