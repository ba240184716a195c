//! Dense (embedding similarity) search boundary.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::errors::IrraError;
use crate::types::{Chunk, MetadataFilter};

/// Embedding-similarity search over the corpus.
///
/// `filter` constraints are exact-match and ANDed; `None` or an empty filter
/// places no restriction.
pub trait DenseSearchProvider: Send + Sync {
    fn search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<Chunk>, IrraError>;
}

impl<T: DenseSearchProvider + ?Sized> DenseSearchProvider for Arc<T> {
    fn search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<Chunk>, IrraError> {
        (**self).search(query, k, filter)
    }
}

/// Wraps a provider so that failures read as "no matches".
#[derive(Clone)]
pub struct DenseSearchAdapter {
    provider: Arc<dyn DenseSearchProvider>,
}

impl std::fmt::Debug for DenseSearchAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DenseSearchAdapter").finish_non_exhaustive()
    }
}

impl DenseSearchAdapter {
    pub fn new(provider: Arc<dyn DenseSearchProvider>) -> Self {
        Self { provider }
    }

    pub fn search(&self, query: &str, k: usize, filter: Option<&MetadataFilter>) -> Vec<Chunk> {
        if k == 0 {
            return Vec::new();
        }
        let filter = filter.filter(|f| !f.is_empty());
        match self.provider.search(query, k, filter) {
            Ok(mut chunks) => {
                chunks.truncate(k);
                debug!("Dense search returned {} chunks", chunks.len());
                chunks
            }
            Err(e) => {
                warn!("Dense search unavailable, treating as no matches: {}", e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChunkMetadata;
    use std::sync::Mutex;

    struct RecordingProvider {
        chunks: Vec<Chunk>,
        seen_filter: Mutex<Option<Option<MetadataFilter>>>,
    }

    impl DenseSearchProvider for RecordingProvider {
        fn search(
            &self,
            _query: &str,
            _k: usize,
            filter: Option<&MetadataFilter>,
        ) -> Result<Vec<Chunk>, IrraError> {
            *self.seen_filter.lock().unwrap() = Some(filter.cloned());
            Ok(self
                .chunks
                .iter()
                .filter(|c| filter.map(|f| f.matches(&c.metadata)).unwrap_or(true))
                .cloned()
                .collect())
        }
    }

    struct DownProvider;

    impl DenseSearchProvider for DownProvider {
        fn search(
            &self,
            _query: &str,
            _k: usize,
            _filter: Option<&MetadataFilter>,
        ) -> Result<Vec<Chunk>, IrraError> {
            Err(IrraError::EmbeddingProviderUnavailable {
                provider: "ollama".to_string(),
                reason: "connection refused".to_string(),
            })
        }
    }

    fn provider() -> Arc<RecordingProvider> {
        Arc::new(RecordingProvider {
            chunks: vec![
                Chunk::new("w1", ChunkMetadata::for_source("a.pdf").with_week(1).with_topic("Cells")),
                Chunk::new("w2", ChunkMetadata::for_source("b.pdf").with_week(2).with_topic("Cells")),
                Chunk::new("w2g", ChunkMetadata::for_source("c.pdf").with_week(2).with_topic("Genes")),
            ],
            seen_filter: Mutex::new(None),
        })
    }

    #[test]
    fn test_failure_becomes_empty() {
        let adapter = DenseSearchAdapter::new(Arc::new(DownProvider));
        assert!(adapter.search("osmosis", 5, None).is_empty());
    }

    #[test]
    fn test_filters_are_anded() {
        let adapter = DenseSearchAdapter::new(provider());
        assert_eq!(adapter.search("q", 10, None).len(), 3);

        let week2 = MetadataFilter::new().with("week", 2);
        assert_eq!(adapter.search("q", 10, Some(&week2)).len(), 2);

        let week2_cells = MetadataFilter::new().with("week", 2).with("topic", "Cells");
        let hits = adapter.search("q", 10, Some(&week2_cells));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].content, "w2");
    }

    #[test]
    fn test_empty_filter_passed_as_none() {
        let provider = provider();
        let adapter = DenseSearchAdapter::new(provider.clone());
        adapter.search("q", 10, Some(&MetadataFilter::new()));
        assert_eq!(*provider.seen_filter.lock().unwrap(), Some(None));
    }

    #[test]
    fn test_results_truncated_to_k() {
        let adapter = DenseSearchAdapter::new(provider());
        assert_eq!(adapter.search("q", 2, None).len(), 2);
        assert!(adapter.search("q", 0, None).is_empty());
    }
}
