//! Shared keyword index handle.
//!
//! Searches and rebuilds may run concurrently. A search clones the current
//! `Arc<Bm25Index>` under a short read lock and scores without holding it;
//! a rebuild builds a complete new index first and only then swaps it in.
//! Readers therefore see either the old or the new index, never a mix.

use std::sync::{Arc, Mutex, RwLock};

use tracing::{debug, info, warn};

use super::index::{Bm25Index, Bm25IndexStats};
use super::Bm25Config;
use crate::corpus::CorpusProvider;
use crate::errors::IrraError;
use crate::types::Chunk;

/// Lazily built, atomically swappable keyword index.
///
/// The index does not watch the corpus. Whoever mutates the corpus calls
/// [`KeywordIndex::rebuild`] (or [`KeywordIndex::invalidate`]) afterwards;
/// until then searches run against the previous snapshot.
pub struct KeywordIndex {
    config: Bm25Config,
    corpus: Arc<dyn CorpusProvider>,
    current: RwLock<Option<Arc<Bm25Index>>>,
    build_lock: Mutex<()>,
}

impl std::fmt::Debug for KeywordIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeywordIndex")
            .field("config", &self.config)
            .field("built", &self.is_built())
            .finish()
    }
}

impl KeywordIndex {
    pub fn new(corpus: Arc<dyn CorpusProvider>, config: Bm25Config) -> Self {
        Self {
            config,
            corpus,
            current: RwLock::new(None),
            build_lock: Mutex::new(()),
        }
    }

    /// Replace the index with one built from `chunks`.
    pub fn build(&self, chunks: Vec<Chunk>) -> Arc<Bm25Index> {
        let _guard = self.build_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.build_locked(chunks)
    }

    /// Rebuild from a fresh corpus snapshot.
    ///
    /// # Errors
    ///
    /// Propagates the corpus provider's error; the previous index stays in place.
    pub fn rebuild(&self) -> Result<Arc<Bm25Index>, IrraError> {
        let _guard = self.build_lock.lock().unwrap_or_else(|e| e.into_inner());
        let chunks = self.corpus.all_chunks()?;
        Ok(self.build_locked(chunks))
    }

    /// Drop the current index; the next search rebuilds it lazily.
    pub fn invalidate(&self) {
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = None;
        debug!("Keyword index invalidated");
    }

    /// Up to `k` chunks by keyword relevance. Never fails.
    pub fn search(&self, query: &str, k: usize) -> Vec<Chunk> {
        if k == 0 {
            return Vec::new();
        }
        self.snapshot().search(query, k)
    }

    /// Current index, building it from the corpus on first use.
    ///
    /// A corpus failure during this lazy build is logged and answered with an
    /// empty index that is not cached, so the next call tries again.
    pub fn snapshot(&self) -> Arc<Bm25Index> {
        if let Some(index) = self.current() {
            return index;
        }

        let _guard = self.build_lock.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(index) = self.current() {
            return index;
        }

        match self.corpus.all_chunks() {
            Ok(chunks) => self.build_locked(chunks),
            Err(e) => {
                warn!("Keyword index build failed, searching an empty index: {}", e);
                Arc::new(Bm25Index::empty(self.config.params()))
            }
        }
    }

    pub fn is_built(&self) -> bool {
        self.current().is_some()
    }

    /// Statistics of the current index, if one is built.
    pub fn stats(&self) -> Option<Bm25IndexStats> {
        self.current().map(|index| index.stats())
    }

    fn current(&self) -> Option<Arc<Bm25Index>> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Caller holds `build_lock`.
    fn build_locked(&self, chunks: Vec<Chunk>) -> Arc<Bm25Index> {
        let index = Arc::new(Bm25Index::build(chunks, self.config.params()));
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Some(Arc::clone(&index));
        info!(
            "Keyword index built: {} chunks, {} terms",
            index.num_documents(),
            index.vocabulary_size()
        );
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChunkMetadata;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn chunk(text: &str) -> Chunk {
        Chunk::new(text, ChunkMetadata::for_source("notes.pdf"))
    }

    /// Corpus whose content can be swapped and whose reads are counted.
    struct SwappableCorpus {
        chunks: Mutex<Vec<Chunk>>,
        reads: AtomicUsize,
        fail: Mutex<bool>,
    }

    impl SwappableCorpus {
        fn new(chunks: Vec<Chunk>) -> Arc<Self> {
            Arc::new(Self {
                chunks: Mutex::new(chunks),
                reads: AtomicUsize::new(0),
                fail: Mutex::new(false),
            })
        }
    }

    impl CorpusProvider for SwappableCorpus {
        fn all_chunks(&self) -> Result<Vec<Chunk>, IrraError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            if *self.fail.lock().unwrap() {
                return Err(IrraError::CorpusUnavailable("store offline".to_string()));
            }
            Ok(self.chunks.lock().unwrap().clone())
        }
    }

    #[test]
    fn test_lazy_build_on_first_search() {
        let corpus = SwappableCorpus::new(vec![chunk("alpha"), chunk("beta")]);
        let index = KeywordIndex::new(corpus.clone(), Bm25Config::default());

        assert!(!index.is_built());
        assert_eq!(index.search("alpha", 5).len(), 1);
        assert!(index.is_built());

        index.search("beta", 5);
        assert_eq!(corpus.reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stale_until_rebuild() {
        let corpus = SwappableCorpus::new(vec![chunk("alpha")]);
        let index = KeywordIndex::new(corpus.clone(), Bm25Config::default());
        assert_eq!(index.search("alpha", 5).len(), 1);

        *corpus.chunks.lock().unwrap() = vec![chunk("gamma")];
        assert_eq!(index.search("alpha", 5).len(), 1);
        assert!(index.search("gamma", 5).is_empty());

        index.rebuild().unwrap();
        assert!(index.search("alpha", 5).is_empty());
        assert_eq!(index.search("gamma", 5).len(), 1);
    }

    #[test]
    fn test_invalidate_triggers_lazy_rebuild() {
        let corpus = SwappableCorpus::new(vec![chunk("alpha")]);
        let index = KeywordIndex::new(corpus.clone(), Bm25Config::default());
        index.search("alpha", 5);

        *corpus.chunks.lock().unwrap() = vec![chunk("gamma")];
        index.invalidate();
        assert!(!index.is_built());
        assert_eq!(index.search("gamma", 5).len(), 1);
    }

    #[test]
    fn test_build_empty_corpus() {
        let index = KeywordIndex::new(Arc::new(Vec::<Chunk>::new()), Bm25Config::default());
        index.build(Vec::new());
        assert!(index.search("anything", 10).is_empty());
        assert_eq!(index.stats().unwrap().num_documents, 0);
    }

    #[test]
    fn test_build_two_chunks_unique_term() {
        let index = KeywordIndex::new(Arc::new(Vec::<Chunk>::new()), Bm25Config::default());
        let a = chunk("the krebs cycle releases energy");
        let b = chunk("the calvin cycle fixes carbon");
        index.build(vec![a.clone(), b]);

        assert_eq!(index.search("krebs", 10), vec![a]);
    }

    #[test]
    fn test_lazy_build_failure_is_empty_and_retried() {
        let corpus = SwappableCorpus::new(vec![chunk("alpha")]);
        *corpus.fail.lock().unwrap() = true;
        let index = KeywordIndex::new(corpus.clone(), Bm25Config::default());

        assert!(index.search("alpha", 5).is_empty());
        assert!(!index.is_built());

        *corpus.fail.lock().unwrap() = false;
        assert_eq!(index.search("alpha", 5).len(), 1);
    }

    #[test]
    fn test_explicit_rebuild_propagates_failure() {
        let corpus = SwappableCorpus::new(vec![chunk("alpha")]);
        let index = KeywordIndex::new(corpus.clone(), Bm25Config::default());
        index.rebuild().unwrap();

        *corpus.fail.lock().unwrap() = true;
        assert!(index.rebuild().is_err());
        assert_eq!(index.search("alpha", 5).len(), 1);
    }

    #[test]
    fn test_concurrent_search_during_rebuild() {
        let texts: Vec<Chunk> = (0..200).map(|i| chunk(&format!("topic{i} shared"))).collect();
        let corpus = SwappableCorpus::new(texts);
        let index = Arc::new(KeywordIndex::new(corpus, Bm25Config::default()));
        index.rebuild().unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let index = Arc::clone(&index);
                std::thread::spawn(move || {
                    for _ in 0..20 {
                        assert_eq!(index.search("shared", 1000).len(), 200);
                    }
                })
            })
            .collect();
        for _ in 0..5 {
            index.rebuild().unwrap();
        }
        for handle in handles {
            handle.join().unwrap();
        }
    }
}
