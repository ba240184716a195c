//! Hybrid retrieval orchestrator.
//!
//! ```text
//! query ─┬─ (multi-hop) decomposer ─► [sub-queries..., query]
//!        │
//!        ▼  per query
//!   dense search ──► dense pool ─┐
//!   keyword search ─► keyword pool ┴─► RRF ─► rerank / truncate ─► chunks
//! ```
//!
//! Every stage degrades instead of failing: an empty corpus or a dead
//! provider yields fewer (possibly zero) chunks, never an error. Only
//! caller contract violations are errors.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::bm25::KeywordIndex;
use crate::config::{RetrievalConfig, DEFAULT_CANDIDATE_K, DEFAULT_FINAL_K, DEFAULT_RRF_K};
use crate::decompose::QueryDecomposer;
use crate::dense::DenseSearchAdapter;
use crate::errors::IrraError;
use crate::fusion::fuse;
use crate::reranker::{RerankStatus, Reranker};
use crate::types::{Chunk, MetadataFilter};

/// Parameters of one retrieval call.
#[derive(Debug, Clone)]
pub struct RetrieveRequest {
    pub query: String,
    pub k: usize,
    pub filter: Option<MetadataFilter>,
    pub use_reranker: bool,
    pub multi_hop: bool,
}

impl RetrieveRequest {
    /// Request with the default `k`, reranking on, no filter, single hop.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            k: DEFAULT_FINAL_K,
            filter: None,
            use_reranker: true,
            multi_hop: false,
        }
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn with_filter(mut self, filter: MetadataFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_reranker(mut self, use_reranker: bool) -> Self {
        self.use_reranker = use_reranker;
        self
    }

    pub fn with_multi_hop(mut self, multi_hop: bool) -> Self {
        self.multi_hop = multi_hop;
        self
    }
}

/// Retrieval result with diagnostics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalOutcome {
    pub chunks: Vec<Chunk>,
    /// Queries actually searched, in order.
    pub queries: Vec<String>,
    pub dense_candidates: usize,
    pub keyword_candidates: usize,
    /// `None` when reranking was not requested.
    pub rerank_status: Option<RerankStatus>,
}

/// Tunables of the orchestrator.
#[derive(Debug, Clone, Copy)]
pub struct RetrieverSettings {
    /// Over-fetch width per retriever and query.
    pub candidate_k: usize,
    /// RRF constant.
    pub rrf_k: usize,
}

impl Default for RetrieverSettings {
    fn default() -> Self {
        Self {
            candidate_k: DEFAULT_CANDIDATE_K,
            rrf_k: DEFAULT_RRF_K,
        }
    }
}

impl From<&RetrievalConfig> for RetrieverSettings {
    fn from(config: &RetrievalConfig) -> Self {
        Self {
            candidate_k: config.candidate_k,
            rrf_k: config.rrf_k,
        }
    }
}

/// Combines dense and keyword retrieval with rank fusion and reranking.
pub struct HybridRetriever {
    dense: DenseSearchAdapter,
    keyword: Arc<KeywordIndex>,
    reranker: Arc<Reranker>,
    decomposer: QueryDecomposer,
    settings: RetrieverSettings,
}

impl std::fmt::Debug for HybridRetriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HybridRetriever")
            .field("keyword", &self.keyword)
            .field("reranker", &self.reranker)
            .field("settings", &self.settings)
            .finish()
    }
}

impl HybridRetriever {
    pub fn new(
        dense: DenseSearchAdapter,
        keyword: Arc<KeywordIndex>,
        reranker: Arc<Reranker>,
        decomposer: QueryDecomposer,
        settings: RetrieverSettings,
    ) -> Self {
        Self {
            dense,
            keyword,
            reranker,
            decomposer,
            settings,
        }
    }

    pub fn keyword_index(&self) -> &Arc<KeywordIndex> {
        &self.keyword
    }

    pub fn reranker(&self) -> &Arc<Reranker> {
        &self.reranker
    }

    /// Up to `request.k` chunks for `request.query`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for `k == 0` or a blank query.
    pub fn retrieve(&self, request: &RetrieveRequest) -> Result<Vec<Chunk>, IrraError> {
        Ok(self.retrieve_detailed(request)?.chunks)
    }

    /// Like [`retrieve`](Self::retrieve), also reporting what each stage did.
    pub fn retrieve_detailed(
        &self,
        request: &RetrieveRequest,
    ) -> Result<RetrievalOutcome, IrraError> {
        if request.k == 0 {
            return Err(IrraError::invalid_argument("k must be at least 1"));
        }
        if request.query.trim().is_empty() {
            return Err(IrraError::invalid_argument("query must not be empty"));
        }

        let queries = if request.multi_hop {
            let mut queries = self.decomposer.decompose(&request.query);
            queries.push(request.query.clone());
            queries
        } else {
            vec![request.query.clone()]
        };

        let width = self.settings.candidate_k.max(request.k);
        let mut dense_pool = Vec::new();
        let mut keyword_pool = Vec::new();
        for query in &queries {
            dense_pool.extend(self.dense.search(query, width, request.filter.as_ref()));
            keyword_pool.extend(self.keyword.search(query, width));
        }

        let dense_candidates = dense_pool.len();
        let keyword_candidates = keyword_pool.len();
        debug!(
            "Retrieved {} dense and {} keyword candidates over {} queries",
            dense_candidates,
            keyword_candidates,
            queries.len()
        );

        let fused = fuse(&[dense_pool, keyword_pool], self.settings.rrf_k);

        let (chunks, rerank_status) = if request.use_reranker && !fused.is_empty() {
            let outcome = self
                .reranker
                .rerank(&request.query, fused.into_chunks(), request.k);
            (outcome.chunks, Some(outcome.status))
        } else {
            let mut chunks = fused.into_chunks();
            chunks.truncate(request.k);
            (chunks, None)
        };

        Ok(RetrievalOutcome {
            chunks,
            queries,
            dense_candidates,
            keyword_candidates,
            rerank_status,
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Stub retrieval collaborators shared by unit tests.

    use super::*;
    use crate::bm25::Bm25Config;
    use crate::completion::{testing::ScriptedCompletion, CompletionProvider};
    use crate::dense::DenseSearchProvider;
    use std::sync::Mutex;

    /// Returns a fixed list, ignoring the query, and records queries.
    pub struct FixedDense {
        pub chunks: Vec<Chunk>,
        pub queries: Mutex<Vec<String>>,
    }

    impl FixedDense {
        pub fn new(chunks: Vec<Chunk>) -> Arc<Self> {
            Arc::new(Self {
                chunks,
                queries: Mutex::new(Vec::new()),
            })
        }
    }

    impl DenseSearchProvider for FixedDense {
        fn search(
            &self,
            query: &str,
            k: usize,
            filter: Option<&MetadataFilter>,
        ) -> Result<Vec<Chunk>, IrraError> {
            self.queries.lock().unwrap().push(query.to_string());
            Ok(self
                .chunks
                .iter()
                .filter(|c| filter.map(|f| f.matches(&c.metadata)).unwrap_or(true))
                .take(k)
                .cloned()
                .collect())
        }
    }

    pub fn retriever(
        dense: Arc<dyn DenseSearchProvider>,
        corpus: Vec<Chunk>,
        reranker: Reranker,
        decomposer: Arc<dyn CompletionProvider>,
    ) -> HybridRetriever {
        HybridRetriever::new(
            DenseSearchAdapter::new(dense),
            Arc::new(KeywordIndex::new(Arc::new(corpus), Bm25Config::default())),
            Arc::new(reranker),
            QueryDecomposer::new(decomposer),
            RetrieverSettings::default(),
        )
    }

    pub fn no_decomposer() -> Arc<dyn CompletionProvider> {
        Arc::new(ScriptedCompletion::failing("unused"))
    }
}
