//! IRRA Engine – the facade the CLI (and any other transport) talks to.
//!
//! The engine owns every long-lived component: the chunk store, the shared
//! keyword index, the lazily loaded reranker and the completion providers.
//! Corpus mutations go through the engine so the keyword index is rebuilt
//! after each one.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::ask::{AnswerLoop, AnswerRequest, AnswerResult};
use crate::bm25::{Bm25IndexStats, KeywordIndex};
use crate::completion::CompletionProvider;
use crate::config::GlobalConfig;
use crate::decompose::{needs_multi_hop, QueryDecomposer};
use crate::dense::DenseSearchAdapter;
use crate::errors::IrraError;
use crate::model_adapter;
use crate::reranker::Reranker;
use crate::retrieval::{HybridRetriever, RetrievalOutcome, RetrieveRequest, RetrieverSettings};
use crate::store::{ChunkStore, Facets, SourceSummary};
use crate::types::Chunk;

// ============================================================================
// Reports
// ============================================================================

/// Result of an `index_chunks` call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexReport {
    pub added: usize,
    pub total_chunks: usize,
}

/// Result of a `remove_source` call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveReport {
    pub source_file: String,
    pub removed: usize,
    pub total_chunks: usize,
}

/// Snapshot of the engine's state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub store_path: PathBuf,
    pub notebook_id: Option<String>,
    pub chunk_count: usize,
    pub source_count: usize,
    /// `None` until the keyword index has been built.
    pub keyword_index: Option<Bm25IndexStats>,
    pub embedding_model: String,
    pub completion_model: String,
    pub reranker_enabled: bool,
    pub reranker_model: String,
    pub facets: Facets,
}

// ============================================================================
// IrraEngine
// ============================================================================

/// Main entry point for IRRA operations.
///
/// # Construction
///
/// Use [`IrraEngine::from_global_config`] for normal usage, or
/// [`IrraEngine::with_components`] to inject providers (tests, embedding in
/// other services).
pub struct IrraEngine {
    config: GlobalConfig,
    store: Arc<ChunkStore>,
    keyword: Arc<KeywordIndex>,
    retriever: Arc<HybridRetriever>,
    answer_loop: AnswerLoop,
    completion_model: String,
}

impl std::fmt::Debug for IrraEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IrraEngine")
            .field("store", &self.store)
            .field("retriever", &self.retriever)
            .finish()
    }
}

impl IrraEngine {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Build an engine from configuration.
    ///
    /// Opens the store and creates the HTTP providers. The reranker model is
    /// not loaded until the first reranked retrieval.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the store cannot
    /// be opened.
    pub fn from_global_config(config: GlobalConfig) -> Result<Self, IrraError> {
        for warning in config.validate()? {
            warn!("{}", warning);
        }

        let embedder = model_adapter::create_embedding_model(&config.embedding)?;
        let store = Arc::new(ChunkStore::open(&config.resolved_store_path(), embedder)?);

        let generator = model_adapter::create_completion_provider(&config.llm)?;
        let reflector =
            model_adapter::create_completion_provider(&config.llm.clone().with_temperature(0.0))?;

        let reranker = if config.retrieval.use_reranker && config.retrieval.reranker.enabled {
            let reranker_config = config.effective_reranker_config();
            Reranker::lazy(move || model_adapter::create_reranker_backend(&reranker_config))
        } else {
            Reranker::disabled()
        };

        Ok(Self::with_components(
            config, store, generator, reflector, reranker,
        ))
    }

    /// Load configuration from the default location and build an engine.
    pub fn with_defaults() -> Result<Self, IrraError> {
        Self::from_global_config(GlobalConfig::load_default()?)
    }

    /// Assemble an engine from ready-made components.
    ///
    /// `reflector` serves both reflection and query decomposition.
    pub fn with_components(
        config: GlobalConfig,
        store: Arc<ChunkStore>,
        generator: Arc<dyn CompletionProvider>,
        reflector: Arc<dyn CompletionProvider>,
        reranker: Reranker,
    ) -> Self {
        let keyword = Arc::new(KeywordIndex::new(
            store.clone(),
            config.retrieval.keyword,
        ));
        let completion_model = generator.name().to_string();
        let retriever = Arc::new(HybridRetriever::new(
            DenseSearchAdapter::new(store.clone()),
            Arc::clone(&keyword),
            Arc::new(reranker),
            QueryDecomposer::new(Arc::clone(&reflector)),
            RetrieverSettings::from(&config.retrieval),
        ));
        let answer_loop = AnswerLoop::new(retriever.clone(), generator, reflector);

        Self {
            config,
            store,
            keyword,
            retriever,
            answer_loop,
            completion_model,
        }
    }

    pub fn config(&self) -> &GlobalConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<ChunkStore> {
        &self.store
    }

    pub fn keyword_index(&self) -> &Arc<KeywordIndex> {
        &self.keyword
    }

    // -------------------------------------------------------------------------
    // Corpus maintenance
    // -------------------------------------------------------------------------

    /// Store chunks and rebuild the keyword index.
    pub fn index_chunks(&self, chunks: &[Chunk]) -> Result<IndexReport, IrraError> {
        let added = self.store.add_chunks(chunks)?;
        let index = self.keyword.rebuild()?;
        info!("Indexed {} chunks", added);
        Ok(IndexReport {
            added,
            total_chunks: index.num_documents(),
        })
    }

    /// Remove a source document and rebuild the keyword index.
    pub fn remove_source(
        &self,
        source_file: &str,
        notebook_id: Option<&str>,
    ) -> Result<RemoveReport, IrraError> {
        if source_file.trim().is_empty() {
            return Err(IrraError::invalid_argument("source file must not be empty"));
        }
        let removed = self.store.remove_source(source_file, notebook_id)?;
        let index = self.keyword.rebuild()?;
        Ok(RemoveReport {
            source_file: source_file.to_string(),
            removed,
            total_chunks: index.num_documents(),
        })
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Retrieval request with configured defaults.
    ///
    /// Multi-hop is switched on when auto-detection is enabled and the query
    /// contains one of the configured phrases.
    pub fn retrieve_request(&self, query: &str) -> RetrieveRequest {
        RetrieveRequest::new(query)
            .with_k(self.config.retrieval.final_k)
            .with_reranker(self.config.retrieval.use_reranker)
            .with_multi_hop(self.detect_multi_hop(query))
    }

    /// Answer request with configured defaults.
    pub fn answer_request(&self, query: &str) -> AnswerRequest {
        let mut request = AnswerRequest::new(query)
            .with_reflection(&self.config.reflection)
            .with_multi_hop(self.detect_multi_hop(query));
        request.k = self.config.retrieval.final_k;
        request.use_reranker = self.config.retrieval.use_reranker;
        request
    }

    fn detect_multi_hop(&self, query: &str) -> bool {
        let multi_hop = &self.config.multi_hop;
        let detected = multi_hop.auto_detect && needs_multi_hop(query, &multi_hop.keywords);
        if detected {
            debug!("Multi-hop retrieval triggered by query wording");
        }
        detected
    }

    pub fn retrieve(&self, request: &RetrieveRequest) -> Result<Vec<Chunk>, IrraError> {
        self.retriever.retrieve(request)
    }

    pub fn retrieve_detailed(
        &self,
        request: &RetrieveRequest,
    ) -> Result<RetrievalOutcome, IrraError> {
        self.retriever.retrieve_detailed(request)
    }

    pub fn answer(&self, request: &AnswerRequest) -> Result<AnswerResult, IrraError> {
        self.answer_loop.answer(request)
    }

    // -------------------------------------------------------------------------
    // Reporting
    // -------------------------------------------------------------------------

    pub fn sources(&self, notebook_id: Option<&str>) -> Result<Vec<SourceSummary>, IrraError> {
        self.store.sources(notebook_id)
    }

    pub fn facets(&self) -> Result<Facets, IrraError> {
        self.store.facets()
    }

    pub fn status(&self, notebook_id: Option<&str>) -> Result<StatusReport, IrraError> {
        let reranker = &self.config.retrieval.reranker;
        Ok(StatusReport {
            store_path: self.store.path().to_path_buf(),
            notebook_id: notebook_id.map(str::to_string),
            chunk_count: self.store.stats(notebook_id)?,
            source_count: self.store.sources(notebook_id)?.len(),
            keyword_index: self.keyword.stats(),
            embedding_model: self.store.embedding_model_id().to_string(),
            completion_model: self.completion_model.clone(),
            reranker_enabled: self.config.retrieval.use_reranker && reranker.enabled,
            reranker_model: reranker.model_id.clone(),
            facets: self.store.facets()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ask::NO_CONTEXT_ANSWER;
    use crate::completion::testing::ScriptedCompletion;
    use crate::store::testing::LetterEmbedding;
    use crate::types::{ChunkMetadata, MetadataFilter};
    use tempfile::TempDir;

    fn engine(dir: &TempDir, answers: &[&str], verdicts: &[&str]) -> IrraEngine {
        let store =
            ChunkStore::open(&dir.path().join("store"), Arc::new(LetterEmbedding)).unwrap();
        IrraEngine::with_components(
            GlobalConfig::default(),
            Arc::new(store),
            Arc::new(ScriptedCompletion::new(answers.iter().copied())),
            Arc::new(ScriptedCompletion::new(verdicts.iter().copied())),
            Reranker::disabled(),
        )
    }

    fn sample() -> Vec<Chunk> {
        vec![
            Chunk::new(
                "osmosis is the movement of water across a membrane",
                ChunkMetadata::for_source("week3.pdf").with_page(2).with_week(3),
            ),
            Chunk::new(
                "mitochondria produce atp",
                ChunkMetadata::for_source("week4.pdf").with_page(1).with_week(4),
            ),
        ]
    }

    #[test]
    fn test_empty_engine_retrieves_nothing() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir, &["unused"], &["{}"]);
        assert!(engine
            .retrieve(&engine.retrieve_request("osmosis"))
            .unwrap()
            .is_empty());

        let result = engine.answer(&engine.answer_request("osmosis")).unwrap();
        assert_eq!(result.answer, NO_CONTEXT_ANSWER);
    }

    #[test]
    fn test_index_rebuilds_keyword_index() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir, &["unused"], &["{}"]);

        let report = engine.index_chunks(&sample()).unwrap();
        assert_eq!(report.added, 2);
        assert_eq!(report.total_chunks, 2);
        assert_eq!(engine.keyword_index().search("mitochondria", 5).len(), 1);
    }

    #[test]
    fn test_remove_source_rebuilds_keyword_index() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir, &["unused"], &["{}"]);
        engine.index_chunks(&sample()).unwrap();

        let report = engine.remove_source("week4.pdf", None).unwrap();
        assert_eq!(report.removed, 1);
        assert_eq!(report.total_chunks, 1);
        assert!(engine.keyword_index().search("mitochondria", 5).is_empty());
    }

    #[test]
    fn test_answer_end_to_end() {
        let dir = TempDir::new().unwrap();
        let engine = engine(
            &dir,
            &["Osmosis moves water."],
            &[r#"{"overall_confidence": 0.8, "should_retry": false, "retry_suggestion": ""}"#],
        );
        engine.index_chunks(&sample()).unwrap();

        let mut request = engine.answer_request("osmosis");
        request.filter = Some(MetadataFilter::new().with("week", 3));
        let result = engine.answer(&request).unwrap();

        assert!(result.accepted);
        assert_eq!(result.answer, "Osmosis moves water.");
        assert!(result
            .citations
            .contains(&"📄 week3.pdf, Page 2".to_string()));
    }

    #[test]
    fn test_multi_hop_auto_detection() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir, &["unused"], &["{}"]);
        assert!(engine.retrieve_request("How does osmosis relate to ATP?").multi_hop);
        assert!(!engine.retrieve_request("What is osmosis?").multi_hop);
    }

    #[test]
    fn test_status() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir, &["unused"], &["{}"]);
        engine.index_chunks(&sample()).unwrap();

        let status = engine.status(None).unwrap();
        assert_eq!(status.chunk_count, 2);
        assert_eq!(status.source_count, 2);
        assert_eq!(status.embedding_model, "letters");
        assert_eq!(status.completion_model, "scripted");
        assert_eq!(status.keyword_index.unwrap().num_documents, 2);
        assert_eq!(status.facets.weeks, vec![3, 4]);
    }

    #[test]
    fn test_remove_blank_source_rejected() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir, &["unused"], &["{}"]);
        assert!(matches!(
            engine.remove_source(" ", None),
            Err(IrraError::InvalidArgument(_))
        ));
    }
}
