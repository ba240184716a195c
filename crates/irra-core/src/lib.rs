//! # irra-core
//!
//! **Iterative Reflective Retrieval Assistant** – core library.
//!
//! This crate answers questions over a corpus of course-material chunks. It
//! combines dense vector search with BM25 keyword search, fuses the two
//! rankings with Reciprocal Rank Fusion, optionally reranks the fused list
//! with a cross-encoder, and drives an answer/reflect/retry loop against a
//! chat-completion provider. It is consumed by the `irra` CLI.
//!
//! ## Main Types
//!
//! - [`IrraEngine`] – the main entry point for all IRRA operations
//! - [`HybridRetriever`] – dense + keyword retrieval with fusion and reranking
//! - [`AnswerLoop`] – the reflective answering loop
//! - [`IrraError`] – domain-specific error type
//!
//! ## Modules
//!
//! - [`bm25`] – keyword tokenizer, scorer and the shared keyword index
//! - [`fusion`] – Reciprocal Rank Fusion
//! - [`reranker`] – cross-encoder reranking with graceful fallback
//! - [`decompose`] – multi-hop detection and sub-query decomposition
//! - [`retrieval`] – the hybrid retrieval orchestrator
//! - [`ask`] – answer generation, reflection and retries
//! - [`store`] – persistent chunk store
//! - [`config`] – configuration types
//!
//! ## Example
//!
//! ```ignore
//! use irra_core::IrraEngine;
//!
//! let engine = IrraEngine::with_defaults()?;
//!
//! let request = engine.answer_request("How does osmosis relate to diffusion?");
//! let result = engine.answer(&request)?;
//! println!("{}{}", result.answer, result.citations_block());
//! ```

// Modules
pub mod ask;
pub mod bm25;
pub mod citations;
pub mod completion;
pub mod config;
pub mod corpus;
pub mod db_adapter;
pub mod decompose;
pub mod dense;
pub mod engine;
pub mod errors;
pub mod fusion;
pub mod model_adapter;
pub mod prompts;
pub mod reranker;
pub mod retrieval;
pub mod store;
pub mod types;

// Re-exports for convenience

pub use ask::{
    AnswerLoop, AnswerRequest, AnswerResult, ContextSource, ReflectionVerdict, NO_CONTEXT_ANSWER,
};
pub use bm25::{Bm25Config, Bm25Index, Bm25IndexStats, KeywordIndex};
pub use citations::{citations, format_citation, format_citations_block};
pub use completion::CompletionProvider;
pub use config::{
    GlobalConfig, MultiHopConfig, ReflectionConfig, RetrievalConfig, DEFAULT_CANDIDATE_K,
    DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_FINAL_K, DEFAULT_MAX_ITERATIONS, DEFAULT_RRF_K,
    GLOBAL_CONFIG_FILENAME, IRRA_HOME_DIR, STORE_DIR_NAME,
};
pub use corpus::CorpusProvider;
pub use decompose::{needs_multi_hop, QueryDecomposer, DEFAULT_MULTI_HOP_KEYWORDS};
pub use dense::{DenseSearchAdapter, DenseSearchProvider};
pub use engine::{IndexReport, IrraEngine, RemoveReport, StatusReport};
pub use errors::IrraError;
pub use fusion::{fuse, FusedEntry, FusedResult};
pub use reranker::{RerankOutcome, RerankStatus, Reranker, RerankerBackend, RerankerProviderKind};
pub use retrieval::{HybridRetriever, RetrievalOutcome, RetrieveRequest, RetrieverSettings};
pub use store::{parse_chunks_jsonl, ChunkStore, Facets, SourceSummary};
pub use types::{Chunk, ChunkKey, ChunkMetadata, MetadataFilter, CHUNK_KEY_CHARS, UNKNOWN_SOURCE};

// irra-model adapter - for bridging the inference layer (reranking, completion, embeddings)
pub use model_adapter::{
    create_completion_provider, create_embedding_model, create_reranker_backend,
    from_model_error, ModelCompletionProvider, ModelRerankerBackend,
};

// irra-db adapter - for bridging the storage layer
pub use db_adapter::from_db_error;
