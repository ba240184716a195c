//! Cross-encoder reranking with an unchanged-order fallback.
//!
//! Reranking is an optional quality step. When no backend is available, or
//! the backend fails, [`Reranker::rerank`] returns the first `top_k` inputs
//! unchanged and reports [`RerankStatus::Skipped`] so callers can tell.
//!
//! # Supported Models
//!
//! - `cross-encoder/ms-marco-MiniLM-L6-v2` (default, via irra-model)

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::IrraError;
use crate::types::Chunk;

// ============================================================================
// RerankerProviderKind
// ============================================================================

/// Available reranker providers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RerankerProviderKind {
    /// Local Candle-based cross-encoder.
    #[default]
    Candle,
    /// Other (custom/test) providers.
    #[serde(untagged)]
    Other(String),
}

impl fmt::Display for RerankerProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Candle => write!(f, "candle"),
            Self::Other(name) => write!(f, "{}", name),
        }
    }
}

impl FromStr for RerankerProviderKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "candle" => Ok(Self::Candle),
            other => Ok(Self::Other(other.to_string())),
        }
    }
}

// ============================================================================
// RerankerBackend Trait
// ============================================================================

/// Scores (query, document) pairs with a relevance model.
pub trait RerankerBackend: Send + Sync {
    fn provider_kind(&self) -> RerankerProviderKind;

    fn model_id(&self) -> &str;

    /// One score per document, higher is more relevant.
    fn score_batch(&self, query: &str, documents: &[String]) -> Result<Vec<f32>, IrraError>;
}

// ============================================================================
// RerankOutcome
// ============================================================================

/// Whether the relevance model actually ordered the output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum RerankStatus {
    Applied { model_id: String },
    Skipped { reason: String },
}

impl RerankStatus {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for RerankStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Applied { model_id } => write!(f, "reranked by {}", model_id),
            Self::Skipped { reason } => write!(f, "rerank skipped ({})", reason),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RerankOutcome {
    pub chunks: Vec<Chunk>,
    pub status: RerankStatus,
}

// ============================================================================
// Reranker
// ============================================================================

type BackendLoader = Box<dyn Fn() -> Result<Arc<dyn RerankerBackend>, IrraError> + Send + Sync>;

/// Reranker facade owning an optional backend.
///
/// A lazily loaded backend is created at most once, on the first
/// [`rerank`](Self::rerank) call. A load failure is remembered and every
/// later call falls back without retrying the load.
pub struct Reranker {
    backend: OnceLock<Option<Arc<dyn RerankerBackend>>>,
    loader: Option<BackendLoader>,
}

impl fmt::Debug for Reranker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.backend.get() {
            Some(Some(backend)) => backend.model_id().to_string(),
            Some(None) => "unavailable".to_string(),
            None if self.loader.is_some() => "not loaded".to_string(),
            None => "disabled".to_string(),
        };
        f.debug_struct("Reranker").field("backend", &state).finish()
    }
}

impl Reranker {
    /// A reranker that always falls back.
    pub fn disabled() -> Self {
        let backend = OnceLock::new();
        let _ = backend.set(None);
        Self {
            backend,
            loader: None,
        }
    }

    pub fn with_backend(backend: Arc<dyn RerankerBackend>) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(Some(backend));
        Self {
            backend: cell,
            loader: None,
        }
    }

    /// Defer backend creation until the first rerank.
    pub fn lazy<F>(loader: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn RerankerBackend>, IrraError> + Send + Sync + 'static,
    {
        Self {
            backend: OnceLock::new(),
            loader: Some(Box::new(loader)),
        }
    }

    /// Backend, loading it on first use.
    pub fn backend(&self) -> Option<&Arc<dyn RerankerBackend>> {
        self.backend
            .get_or_init(|| {
                let loader = self.loader.as_ref()?;
                match loader() {
                    Ok(backend) => {
                        info!("Reranker backend initialized: {}", backend.model_id());
                        Some(backend)
                    }
                    Err(e) => {
                        warn!("Failed to initialize reranker backend: {}", e);
                        None
                    }
                }
            })
            .as_ref()
    }

    /// Whether a backend has been loaded successfully.
    pub fn is_loaded(&self) -> bool {
        matches!(self.backend.get(), Some(Some(_)))
    }

    /// Order `chunks` by relevance to `query` and keep the best `top_k`.
    ///
    /// Never fails. On any backend problem the input order is kept.
    pub fn rerank(&self, query: &str, chunks: Vec<Chunk>, top_k: usize) -> RerankOutcome {
        if chunks.is_empty() {
            debug!("Rerank skipped: no candidates");
            return RerankOutcome {
                chunks,
                status: RerankStatus::skipped("no candidates"),
            };
        }

        let Some(backend) = self.backend() else {
            warn!("Reranker unavailable, using fused order");
            return fallback(chunks, top_k, "reranker unavailable");
        };

        let documents: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let scores = match backend.score_batch(query, &documents) {
            Ok(scores) => scores,
            Err(e) => {
                warn!("Reranker failed ({}), using fused order", e);
                return fallback(chunks, top_k, format!("reranker error: {}", e));
            }
        };

        if scores.len() != chunks.len() {
            warn!(
                "Reranker returned {} scores for {} chunks, using fused order",
                scores.len(),
                chunks.len()
            );
            return fallback(chunks, top_k, "score count mismatch");
        }

        let mut scored: Vec<(f32, Chunk)> = scores.into_iter().zip(chunks).collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
        scored.truncate(top_k);

        debug!("Reranked {} chunks with {}", scored.len(), backend.model_id());
        RerankOutcome {
            chunks: scored.into_iter().map(|(_, chunk)| chunk).collect(),
            status: RerankStatus::Applied {
                model_id: backend.model_id().to_string(),
            },
        }
    }
}

fn fallback(mut chunks: Vec<Chunk>, top_k: usize, reason: impl Into<String>) -> RerankOutcome {
    chunks.truncate(top_k);
    RerankOutcome {
        chunks,
        status: RerankStatus::skipped(reason),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChunkMetadata;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    fn chunks(texts: &[&str]) -> Vec<Chunk> {
        texts
            .iter()
            .map(|t| Chunk::new(*t, ChunkMetadata::for_source("notes.pdf")))
            .collect()
    }

    fn contents(chunks: &[Chunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.content.as_str()).collect()
    }

    /// Scores by word overlap with the query.
    struct OverlapBackend;

    impl RerankerBackend for OverlapBackend {
        fn provider_kind(&self) -> RerankerProviderKind {
            RerankerProviderKind::Other("mock".to_string())
        }

        fn model_id(&self) -> &str {
            "mock-overlap"
        }

        fn score_batch(&self, query: &str, documents: &[String]) -> Result<Vec<f32>, IrraError> {
            let query_lower = query.to_lowercase();
            let words: std::collections::HashSet<&str> = query_lower.split_whitespace().collect();
            Ok(documents
                .iter()
                .map(|doc| {
                    doc.to_lowercase()
                        .split_whitespace()
                        .filter(|w| words.contains(w))
                        .count() as f32
                })
                .collect())
        }
    }

    struct FailingBackend;

    impl RerankerBackend for FailingBackend {
        fn provider_kind(&self) -> RerankerProviderKind {
            RerankerProviderKind::Other("failing".to_string())
        }

        fn model_id(&self) -> &str {
            "failing"
        }

        fn score_batch(&self, _query: &str, _documents: &[String]) -> Result<Vec<f32>, IrraError> {
            Err(IrraError::RerankerInferenceFailed {
                model_id: "failing".to_string(),
                reason: "out of memory".to_string(),
            })
        }
    }

    struct ShortBackend;

    impl RerankerBackend for ShortBackend {
        fn provider_kind(&self) -> RerankerProviderKind {
            RerankerProviderKind::Other("short".to_string())
        }

        fn model_id(&self) -> &str {
            "short"
        }

        fn score_batch(&self, _query: &str, _documents: &[String]) -> Result<Vec<f32>, IrraError> {
            Ok(vec![1.0])
        }
    }

    #[test]
    fn test_provider_kind_from_str() {
        assert_eq!(
            RerankerProviderKind::from_str("CANDLE").unwrap(),
            RerankerProviderKind::Candle
        );
        assert_eq!(
            RerankerProviderKind::from_str("custom").unwrap(),
            RerankerProviderKind::Other("custom".to_string())
        );
    }

    #[test]
    fn test_rerank_orders_by_score() {
        let reranker = Reranker::with_backend(Arc::new(OverlapBackend));
        let input = chunks(&["unrelated text", "osmosis moves water", "osmosis"]);

        let outcome = reranker.rerank("osmosis moves water", input, 2);
        assert_eq!(
            contents(&outcome.chunks),
            vec!["osmosis moves water", "osmosis"]
        );
        assert_eq!(
            outcome.status,
            RerankStatus::Applied {
                model_id: "mock-overlap".to_string()
            }
        );
    }

    #[test]
    fn test_failing_backend_keeps_input_order() {
        let reranker = Reranker::with_backend(Arc::new(FailingBackend));
        let input = chunks(&["c", "a", "b", "d"]);

        let outcome = reranker.rerank("query", input, 3);
        assert_eq!(contents(&outcome.chunks), vec!["c", "a", "b"]);
        assert!(!outcome.status.is_applied());
    }

    #[test]
    fn test_disabled_keeps_input_order() {
        let outcome = Reranker::disabled().rerank("query", chunks(&["x", "y"]), 5);
        assert_eq!(contents(&outcome.chunks), vec!["x", "y"]);
        assert!(matches!(outcome.status, RerankStatus::Skipped { .. }));
    }

    #[test]
    fn test_score_count_mismatch_falls_back() {
        let reranker = Reranker::with_backend(Arc::new(ShortBackend));
        let outcome = reranker.rerank("q", chunks(&["a", "b", "c"]), 2);
        assert_eq!(contents(&outcome.chunks), vec!["a", "b"]);
        assert_eq!(
            outcome.status,
            RerankStatus::Skipped {
                reason: "score count mismatch".to_string()
            }
        );
    }

    #[test]
    fn test_empty_input() {
        let reranker = Reranker::with_backend(Arc::new(OverlapBackend));
        let outcome = reranker.rerank("q", Vec::new(), 5);
        assert!(outcome.chunks.is_empty());
        assert!(!outcome.status.is_applied());
    }

    #[test]
    fn test_lazy_loader_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let reranker = Reranker::lazy(move || {
            counter.fetch_add(1, AtomicOrdering::SeqCst);
            Ok(Arc::new(OverlapBackend) as Arc<dyn RerankerBackend>)
        });

        assert!(!reranker.is_loaded());
        reranker.rerank("a", chunks(&["a"]), 1);
        reranker.rerank("b", chunks(&["b"]), 1);
        assert!(reranker.is_loaded());
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 1);
    }

    #[test]
    fn test_lazy_loader_failure_is_remembered() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let reranker = Reranker::lazy(move || {
            counter.fetch_add(1, AtomicOrdering::SeqCst);
            Err(IrraError::RerankerBackendUnavailable {
                reason: "model missing".to_string(),
            })
        });

        let outcome = reranker.rerank("q", chunks(&["a", "b"]), 1);
        assert_eq!(contents(&outcome.chunks), vec!["a"]);
        reranker.rerank("q", chunks(&["a"]), 1);
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 1);
    }
}
