//! # irra-model
//!
//! Inference layer for IRRA: everything that calls a model.
//!
//! - **Reranker models**: local Candle cross-encoders scoring (query, chunk) pairs
//! - **Completion models**: LLM text generation over an Ollama-compatible API
//! - **Embedding models**: dense vectors for the chunk store, same API
//! - **Model locator**: runtime path resolution for on-disk reranker weights
//!
//! Traits here never expose Candle or HTTP types. Test doubles live in the
//! consuming crates.
//!
//! ## Features
//!
//! - `embedded` (default): Candle cross-encoder reranker
//! - `ollama` (default): completion and embeddings via Ollama
//! - `metal` / `cuda`: GPU backends for Candle
//!
//! ## Usage
//!
//! ```ignore
//! use irra_model::{create_completion_model, CompletionConfig};
//!
//! let llm = create_completion_model(&CompletionConfig::default())?;
//! let answer = llm.complete("Define osmosis in one sentence.")?;
//! ```

pub mod config;
pub mod error;
pub mod model_locator;

#[cfg(feature = "ollama")]
mod ollama;

#[cfg(feature = "embedded")]
mod reranker;

pub use error::{ModelError, ModelResult, ModelTask};

pub use config::{CompletionConfig, DevicePreference, EmbeddingConfig, RerankerConfig};

pub use model_locator::{
    extract_model_name, ModelLocator, IRRA_MODELS_DIR_ENV, REQUIRED_MODEL_FILES, RERANKERS_SUBDIR,
};

/// Default cross-encoder (full HuggingFace identifier).
pub const DEFAULT_RERANKER_MODEL_ID: &str = "cross-encoder/ms-marco-MiniLM-L6-v2";

/// Default Ollama endpoint.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Default generation model.
pub const DEFAULT_COMPLETION_MODEL: &str = "llama3.1:8b";

/// Default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";

/// Output dimension of [`DEFAULT_EMBEDDING_MODEL`].
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 768;

// ============================================================================
// Model traits
// ============================================================================

/// Cross-encoder relevance scoring.
pub trait RerankerModel: Send + Sync + std::fmt::Debug {
    /// Score each document against `query`, in input order.
    ///
    /// Higher is more relevant. Scores are raw logits, not probabilities.
    fn score_batch(&self, query: &str, documents: &[String]) -> ModelResult<Vec<f32>>;

    /// Get the model ID.
    fn model_id(&self) -> &str;
}

/// Prompt-in, text-out language model.
pub trait CompletionModel: Send + Sync + std::fmt::Debug {
    /// Generate a completion for `prompt`.
    fn complete(&self, prompt: &str) -> ModelResult<String>;

    /// Get the model ID.
    fn model_id(&self) -> &str;
}

/// Bi-encoder producing dense vectors.
pub trait EmbeddingModel: Send + Sync + std::fmt::Debug {
    /// Embed a batch of texts; one vector of length `dimension()` per input.
    fn embed(&self, texts: &[&str]) -> ModelResult<Vec<Vec<f32>>>;

    /// Embed a single text.
    fn embed_one(&self, text: &str) -> ModelResult<Vec<f32>> {
        self.embed(&[text])?.into_iter().next().ok_or_else(|| {
            ModelError::embedding_failed(self.model_id(), "provider returned no vectors")
        })
    }

    fn dimension(&self) -> usize;

    /// Get the model ID.
    fn model_id(&self) -> &str;
}

// ============================================================================
// Factory functions
// ============================================================================

/// Load the Candle cross-encoder described by `config`.
///
/// # Errors
///
/// Returns `ModelError` if the model directory is missing or incomplete, the
/// requested device is unavailable, or the weights fail to load.
#[cfg(feature = "embedded")]
pub fn create_reranker_model(config: &RerankerConfig) -> ModelResult<Box<dyn RerankerModel>> {
    Ok(Box::new(reranker::CandleRerankerModel::new(config)?))
}

#[cfg(not(feature = "embedded"))]
pub fn create_reranker_model(_config: &RerankerConfig) -> ModelResult<Box<dyn RerankerModel>> {
    Err(ModelError::ProviderNotAvailable {
        provider: "candle".to_string(),
        reason: "Built without the 'embedded' feature.".to_string(),
    })
}

/// Create a completion client for the configured server.
#[cfg(feature = "ollama")]
pub fn create_completion_model(
    config: &CompletionConfig,
) -> ModelResult<Box<dyn CompletionModel>> {
    Ok(Box::new(ollama::OllamaCompletionModel::new(config)?))
}

#[cfg(not(feature = "ollama"))]
pub fn create_completion_model(
    _config: &CompletionConfig,
) -> ModelResult<Box<dyn CompletionModel>> {
    Err(ModelError::ProviderNotAvailable {
        provider: "ollama".to_string(),
        reason: "Built without the 'ollama' feature.".to_string(),
    })
}

/// Create an embedding client for the configured server.
#[cfg(feature = "ollama")]
pub fn create_embedding_model(config: &EmbeddingConfig) -> ModelResult<Box<dyn EmbeddingModel>> {
    Ok(Box::new(ollama::OllamaEmbeddingModel::new(config)?))
}

#[cfg(not(feature = "ollama"))]
pub fn create_embedding_model(_config: &EmbeddingConfig) -> ModelResult<Box<dyn EmbeddingModel>> {
    Err(ModelError::ProviderNotAvailable {
        provider: "ollama".to_string(),
        reason: "Built without the 'ollama' feature.".to_string(),
    })
}

#[cfg(feature = "embedded")]
pub use reranker::CandleRerankerModel;

#[cfg(feature = "ollama")]
pub use ollama::{OllamaCompletionModel, OllamaEmbeddingModel};
