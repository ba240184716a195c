//! Configuration types for irra-model.
//!
//! These are the canonical model settings. `irra-core` embeds them in its
//! YAML configuration instead of redefining them.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::model_locator::{extract_model_name, ModelLocator, RERANKERS_SUBDIR};
use crate::{
    DEFAULT_COMPLETION_MODEL, DEFAULT_EMBEDDING_DIMENSION, DEFAULT_EMBEDDING_MODEL,
    DEFAULT_OLLAMA_URL, DEFAULT_RERANKER_MODEL_ID,
};

// ============================================================================
// DevicePreference
// ============================================================================

/// Preference for compute device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePreference {
    /// Let the model pick (CPU for the cross-encoder).
    #[default]
    Auto,
    /// Force GPU (Metal on macOS, CUDA on Linux).
    Gpu,
    /// Force CPU only.
    Cpu,
}

impl std::fmt::Display for DevicePreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Gpu => write!(f, "gpu"),
            Self::Cpu => write!(f, "cpu"),
        }
    }
}

impl std::str::FromStr for DevicePreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "gpu" | "metal" | "cuda" => Ok(Self::Gpu),
            "cpu" => Ok(Self::Cpu),
            _ => Err(format!(
                "Unknown device: '{}'. Use 'auto', 'gpu', or 'cpu'.",
                s
            )),
        }
    }
}

// ============================================================================
// RerankerConfig
// ============================================================================

/// Configuration for the cross-encoder reranker model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RerankerConfig {
    /// Whether reranking is available at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Model ID (e.g., "cross-encoder/ms-marco-MiniLM-L6-v2").
    #[serde(default = "default_reranker_model_id")]
    pub model_id: String,

    /// Device preference.
    #[serde(default)]
    pub device: DevicePreference,

    /// Local path to model files. Overrides the model locator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_path: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

fn default_reranker_model_id() -> String {
    DEFAULT_RERANKER_MODEL_ID.to_string()
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model_id: default_reranker_model_id(),
            device: DevicePreference::default(),
            local_path: None,
        }
    }
}

impl RerankerConfig {
    /// Resolve the model directory.
    ///
    /// Uses `local_path` when set, otherwise the model locator search order
    /// ($IRRA_MODELS_DIR → ~/.irra/models → {exe}/models). Returns a path
    /// even if nothing exists there; loading reports the missing files.
    pub fn effective_model_path(&self) -> PathBuf {
        if let Some(ref path) = self.local_path {
            return path.clone();
        }

        match ModelLocator::new().reranker_model_path(&self.model_id) {
            Ok(path) => path,
            Err(_) => dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".irra")
                .join("models")
                .join(RERANKERS_SUBDIR)
                .join(extract_model_name(&self.model_id)),
        }
    }

    /// Create a config with a specific local path.
    pub fn with_local_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.local_path = Some(path.into());
        self
    }
}

// ============================================================================
// CompletionConfig
// ============================================================================

/// Configuration for the text-completion (LLM) provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionConfig {
    /// Base URL of the Ollama-compatible server.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model name as known to the server.
    #[serde(default = "default_completion_model")]
    pub model: String,

    /// Sampling temperature for answer generation.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens generated per call.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Request timeout in seconds.
    #[serde(default = "default_completion_timeout")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_OLLAMA_URL.to_string()
}

fn default_completion_model() -> String {
    DEFAULT_COMPLETION_MODEL.to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_completion_timeout() -> u64 {
    120
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_completion_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_completion_timeout(),
        }
    }
}

impl CompletionConfig {
    /// Same provider and model with a different temperature.
    ///
    /// Scoring and decomposition calls run at 0.0.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

// ============================================================================
// EmbeddingConfig
// ============================================================================

/// Configuration for the embedding provider used by dense search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingConfig {
    /// Base URL of the Ollama-compatible server.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Embedding model name.
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimension (must match the vector store).
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Request timeout in seconds.
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_dimension() -> usize {
    DEFAULT_EMBEDDING_DIMENSION
}

fn default_embedding_timeout() -> u64 {
    60
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_embedding_model(),
            dimension: default_dimension(),
            timeout_secs: default_embedding_timeout(),
        }
    }
}
