//! Error types for irra-model.
//!
//! Messages say what went wrong and, for model discovery, where the files
//! were expected and how to fix it.

use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for irra-model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// What a model was asked to do when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTask {
    Tokenize,
    Rerank,
    Embed,
    Complete,
}

impl fmt::Display for ModelTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Tokenize => "tokenization",
            Self::Rerank => "reranking",
            Self::Embed => "embedding",
            Self::Complete => "completion",
        })
    }
}

#[derive(Debug, Error)]
pub enum ModelError {
    /// No models directory in any search location.
    #[error("{}", models_dir_help(.searched))]
    ModelsDirectoryNotFound { searched: Vec<PathBuf> },

    #[error("{}", model_missing_help(.model_id, .path))]
    ModelNotFound { model_id: String, path: PathBuf },

    #[error("Incomplete model installation at {}: missing {}", .path.display(), .missing.join(", "))]
    IncompleteModelFiles {
        path: PathBuf,
        missing: Vec<&'static str>,
    },

    /// Weights or tokenizer present but unusable.
    #[error("Failed to load model '{model_id}': {message}")]
    ModelLoad { model_id: String, message: String },

    /// A loaded model or remote provider failed on a request.
    #[error("{task} failed for model '{model_id}': {message}")]
    Inference {
        task: ModelTask,
        model_id: String,
        message: String,
    },

    /// Feature disabled at build time, or server unreachable.
    #[error("Provider '{provider}' not available: {reason}")]
    ProviderNotAvailable { provider: String, reason: String },

    /// Provider answered, but not in the expected shape.
    #[error("Provider '{provider}' returned an invalid response: {message}")]
    InvalidResponse { provider: String, message: String },

    #[error("Compute device not available: {reason}\n\nSet `device: cpu` in ~/.irra/config.yaml to use CPU-only inference.")]
    DeviceNotAvailable { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn models_dir_help(searched: &[PathBuf]) -> String {
    let mut message = String::from("Models directory not found.\n\nSearched these locations:\n");
    for (i, path) in searched.iter().enumerate() {
        message.push_str(&format!("  {}. {}\n", i + 1, path.display()));
    }
    message.push_str(
        "\nSet $IRRA_MODELS_DIR or copy the reranker model to ~/.irra/models/rerankers/.",
    );
    message
}

fn model_missing_help(model_id: &str, path: &Path) -> String {
    format!(
        "Model not found: {model_id}\n\n\
        Expected at: {}\n\n\
        The directory must contain config.json, model.safetensors and tokenizer.json.",
        path.display()
    )
}

impl ModelError {
    pub fn model_load(model_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ModelLoad {
            model_id: model_id.into(),
            message: message.into(),
        }
    }

    pub fn inference(
        task: ModelTask,
        model_id: impl Into<String>,
        message: impl fmt::Display,
    ) -> Self {
        Self::Inference {
            task,
            model_id: model_id.into(),
            message: message.to_string(),
        }
    }

    pub fn reranking_failed(model_id: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::inference(ModelTask::Rerank, model_id, message)
    }

    pub fn embedding_failed(model_id: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::inference(ModelTask::Embed, model_id, message)
    }

    pub fn completion_failed(model_id: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::inference(ModelTask::Complete, model_id, message)
    }

    pub fn tokenization(model_id: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::inference(ModelTask::Tokenize, model_id, message)
    }

    pub fn invalid_response(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            provider: provider.into(),
            message: message.into(),
        }
    }
}
