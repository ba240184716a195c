//! Adapter layer for irra-model infrastructure.
//!
//! Bridges irra-model implementations with irra-core's domain traits:
//!
//! - Error conversion from `ModelError` to `IrraError`
//! - Wrappers that implement [`RerankerBackend`] and [`CompletionProvider`]
//!   on top of irra-model trait objects
//! - Factories used by the engine
//!
//! ## Architecture
//!
//! ```text
//! irra-core domain code (engine, retrieval, ask)
//!        ↓
//!   model_adapter (this module) - wrappers + conversions
//!        ↓
//!     irra-model implementations (Candle reranker, Ollama completion/embeddings)
//! ```

use std::sync::Arc;

use irra_model::{
    CompletionConfig, CompletionModel, EmbeddingConfig, EmbeddingModel, ModelError, ModelTask,
    RerankerConfig, RerankerModel,
};

use crate::completion::CompletionProvider;
use crate::errors::IrraError;
use crate::reranker::{RerankerBackend, RerankerProviderKind};

// ============================================================================
// Error Conversion
// ============================================================================

/// Convert an irra-model error to an irra-core error.
pub fn from_model_error(err: ModelError) -> IrraError {
    match err {
        ModelError::ModelsDirectoryNotFound { searched } => {
            let paths = searched
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ");
            IrraError::RerankerBackendUnavailable {
                reason: format!("Models directory not found. Searched: {}", paths),
            }
        }

        ModelError::ModelNotFound { model_id, path } => IrraError::RerankerBackendUnavailable {
            reason: format!("Model '{}' not found at {}", model_id, path.display()),
        },

        ModelError::IncompleteModelFiles { path, missing } => {
            IrraError::RerankerBackendUnavailable {
                reason: format!(
                    "Missing model files in {}: {}",
                    path.display(),
                    missing.join(", ")
                ),
            }
        }

        ModelError::ModelLoad { model_id, message } => IrraError::RerankerBackendUnavailable {
            reason: format!("{}: {}", model_id, message),
        },

        ModelError::Inference {
            task,
            model_id,
            message,
        } => match task {
            ModelTask::Tokenize | ModelTask::Rerank => IrraError::RerankerInferenceFailed {
                model_id,
                reason: message,
            },
            ModelTask::Embed => IrraError::EmbeddingProviderUnavailable {
                provider: model_id,
                reason: message,
            },
            ModelTask::Complete => IrraError::Completion {
                provider: model_id,
                message,
            },
        },

        ModelError::ProviderNotAvailable { provider, reason } => {
            IrraError::EmbeddingProviderUnavailable { provider, reason }
        }

        ModelError::InvalidResponse { provider, message } => IrraError::Completion {
            provider,
            message: format!("invalid response: {}", message),
        },

        ModelError::DeviceNotAvailable { reason } => IrraError::RerankerBackendUnavailable {
            reason: format!("device unavailable: {}", reason),
        },

        ModelError::Io(io_err) => IrraError::Io(io_err),

        ModelError::Json(json_err) => IrraError::Json(json_err),
    }
}

/// Extension trait to convert irra-model results to `Result<T, IrraError>`.
pub trait IntoIrraResult<T> {
    fn into_irra_result(self) -> Result<T, IrraError>;
}

impl<T> IntoIrraResult<T> for Result<T, ModelError> {
    fn into_irra_result(self) -> Result<T, IrraError> {
        self.map_err(from_model_error)
    }
}

// ============================================================================
// Reranker Backend Wrapper
// ============================================================================

/// [`RerankerBackend`] over an irra-model cross-encoder.
pub struct ModelRerankerBackend {
    inner: Box<dyn RerankerModel>,
}

impl std::fmt::Debug for ModelRerankerBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRerankerBackend")
            .field("model_id", &self.inner.model_id())
            .finish()
    }
}

impl ModelRerankerBackend {
    pub fn new(model: Box<dyn RerankerModel>) -> Self {
        Self { inner: model }
    }

    /// Load the configured cross-encoder.
    pub fn from_config(config: &RerankerConfig) -> Result<Self, IrraError> {
        if !config.enabled {
            return Err(IrraError::RerankerBackendUnavailable {
                reason: "reranker disabled in configuration".to_string(),
            });
        }
        let model = irra_model::create_reranker_model(config).into_irra_result()?;
        Ok(Self::new(model))
    }
}

impl RerankerBackend for ModelRerankerBackend {
    fn provider_kind(&self) -> RerankerProviderKind {
        RerankerProviderKind::Candle
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }

    fn score_batch(&self, query: &str, documents: &[String]) -> Result<Vec<f32>, IrraError> {
        self.inner.score_batch(query, documents).into_irra_result()
    }
}

/// Create the reranker backend described by `config`.
pub fn create_reranker_backend(
    config: &RerankerConfig,
) -> Result<Arc<dyn RerankerBackend>, IrraError> {
    Ok(Arc::new(ModelRerankerBackend::from_config(config)?))
}

// ============================================================================
// Completion Provider Wrapper
// ============================================================================

/// [`CompletionProvider`] over an irra-model completion model.
pub struct ModelCompletionProvider {
    inner: Box<dyn CompletionModel>,
}

impl std::fmt::Debug for ModelCompletionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelCompletionProvider")
            .field("model_id", &self.inner.model_id())
            .finish()
    }
}

impl ModelCompletionProvider {
    pub fn new(model: Box<dyn CompletionModel>) -> Self {
        Self { inner: model }
    }
}

impl CompletionProvider for ModelCompletionProvider {
    fn complete(&self, prompt: &str) -> Result<String, IrraError> {
        self.inner.complete(prompt).into_irra_result()
    }

    fn name(&self) -> &str {
        self.inner.model_id()
    }
}

/// Create a completion provider for `config`.
pub fn create_completion_provider(
    config: &CompletionConfig,
) -> Result<Arc<dyn CompletionProvider>, IrraError> {
    let model = irra_model::create_completion_model(config).into_irra_result()?;
    Ok(Arc::new(ModelCompletionProvider::new(model)))
}

/// Create the embedding model used by the chunk store.
pub fn create_embedding_model(
    config: &EmbeddingConfig,
) -> Result<Arc<dyn EmbeddingModel>, IrraError> {
    let model = irra_model::create_embedding_model(config).into_irra_result()?;
    Ok(Arc::from(model))
}

// ============================================================================
// Tests
// ============================================================================
