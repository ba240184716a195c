//! Error types for irra-core.

use std::path::PathBuf;

use thiserror::Error;

/// Domain-specific errors for IRRA operations.
///
/// Only contract violations and unrecoverable provider failures surface as
/// errors. Retrieval-side degradations (dense search down, reranker missing,
/// unparseable LLM output) are absorbed where they happen and logged.
#[derive(Error, Debug)]
pub enum IrraError {
    /// Global configuration file is invalid.
    #[error("Global config invalid: {0}")]
    InvalidGlobalConfig(String),

    /// A configuration value is invalid.
    #[error("Invalid configuration: {message}. {hint}")]
    InvalidConfiguration {
        /// Description of the invalid configuration.
        message: String,
        /// Actionable hint on how to fix it.
        hint: String,
    },

    /// Invalid argument provided by the caller (e.g. `k == 0`, blank query).
    #[error("{0}")]
    InvalidArgument(String),

    /// A path or file was not found.
    #[error("Path not found: {0}")]
    PathNotFound(String),

    /// A chunk record could not be parsed.
    #[error("Invalid chunk at line {line}: {message}")]
    ChunkParse {
        /// 1-based line number in the input.
        line: usize,
        /// Parser message.
        message: String,
    },

    // =========================================================================
    // Provider errors
    // =========================================================================
    /// Text completion failed.
    #[error("Completion provider `{provider}` failed: {message}")]
    Completion {
        /// Provider or model identifier.
        provider: String,
        /// Description of the failure.
        message: String,
    },

    /// Embedding provider is unavailable or failed.
    #[error("Embedding provider `{provider}` is unavailable: {reason}")]
    EmbeddingProviderUnavailable {
        /// The provider that is unavailable.
        provider: String,
        /// Reason why the provider is unavailable.
        reason: String,
    },

    /// Reranker model could not be loaded.
    #[error("Reranker backend is unavailable: {reason}")]
    RerankerBackendUnavailable {
        /// Reason why the backend is unavailable.
        reason: String,
    },

    /// Reranker inference failed.
    #[error("Reranker inference failed for model `{model_id}`: {reason}")]
    RerankerInferenceFailed {
        /// The model identifier.
        model_id: String,
        /// Reason for the inference failure.
        reason: String,
    },

    /// The corpus snapshot could not be read.
    #[error("Corpus unavailable: {0}")]
    CorpusUnavailable(String),

    // =========================================================================
    // Storage errors
    // =========================================================================
    /// Chunk store I/O error.
    #[error("Chunk store I/O error at `{path}`: {message}")]
    StoreIo {
        /// Path to the store file or directory.
        path: PathBuf,
        /// Description of the I/O error.
        message: String,
    },

    /// Chunk store is incompatible with the current configuration.
    #[error("Chunk store incompatible: {reason}")]
    StoreIncompatible {
        /// Reason for incompatibility.
        reason: String,
    },

    /// Embedding dimension does not match the store.
    #[error("Embedding dimension mismatch: store expects {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension recorded in the store.
        expected: usize,
        /// Dimension produced by the embedding model.
        actual: usize,
    },

    /// Unexpected internal failure.
    #[error("Internal error: {0}")]
    Internal(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl IrraError {
    /// Shorthand for [`IrraError::InvalidArgument`].
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Shorthand for [`IrraError::InvalidConfiguration`].
    pub fn invalid_configuration(message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
            hint: hint.into(),
        }
    }

    /// Shorthand for [`IrraError::Completion`].
    pub fn completion(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Completion {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_configuration_display_includes_hint() {
        let err = IrraError::invalid_configuration(
            "retrieval.finalK cannot be 0",
            "Set finalK to at least 1",
        );
        assert_eq!(
            err.to_string(),
            "Invalid configuration: retrieval.finalK cannot be 0. Set finalK to at least 1"
        );
    }

    #[test]
    fn test_completion_display_names_provider() {
        let err = IrraError::completion("llama3.1:8b", "connection refused");
        assert!(matches!(err, IrraError::Completion { .. }));
        assert!(err.to_string().contains("llama3.1:8b"));
    }
}
