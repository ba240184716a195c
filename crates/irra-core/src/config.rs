//! Configuration types for IRRA.
//!
//! [`GlobalConfig`] is the user-level configuration stored in
//! `~/.irra/config.yaml`. Every field has a default, so a missing file (or a
//! partial one) yields a working setup against a local Ollama server.
//!
//! # Example YAML
//!
//! ```yaml
//! device: auto
//! storePath: ~/.irra/store
//! retrieval:
//!   finalK: 5
//!   candidateK: 10
//!   rrfK: 60
//!   useReranker: true
//!   reranker:
//!     modelId: cross-encoder/ms-marco-MiniLM-L6-v2
//!   keyword:
//!     k1: 1.5
//!     b: 0.75
//! reflection:
//!   maxIterations: 2
//!   confidenceThreshold: 0.6
//! multiHop:
//!   autoDetect: true
//! llm:
//!   model: llama3.1:8b
//!   temperature: 0.3
//! embedding:
//!   model: nomic-embed-text
//!   dimension: 768
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::bm25::Bm25Config;
use crate::decompose::DEFAULT_MULTI_HOP_KEYWORDS;
use crate::errors::IrraError;

pub use irra_model::{CompletionConfig, DevicePreference, EmbeddingConfig, RerankerConfig};

/// Name of the per-user IRRA directory under `$HOME`.
pub const IRRA_HOME_DIR: &str = ".irra";

/// Global configuration filename.
pub const GLOBAL_CONFIG_FILENAME: &str = "config.yaml";

/// Default chunk store directory name under [`IRRA_HOME_DIR`].
pub const STORE_DIR_NAME: &str = "store";

/// Final number of chunks returned by retrieval.
pub const DEFAULT_FINAL_K: usize = 5;

/// Over-fetch width per modality and query.
pub const DEFAULT_CANDIDATE_K: usize = 10;

/// RRF smoothing constant.
pub const DEFAULT_RRF_K: usize = 60;

/// Total retrieval+generation cycles of the answer loop.
pub const DEFAULT_MAX_ITERATIONS: usize = 2;

/// Reflection confidence needed to accept an answer early.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.6;

// ============================================================================
// GlobalConfig
// ============================================================================

/// User-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalConfig {
    /// Device preference for the local reranker (auto/gpu/cpu).
    #[serde(default)]
    pub device: DevicePreference,

    /// Chunk store directory. Defaults to `~/.irra/store`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_path: Option<PathBuf>,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub reflection: ReflectionConfig,

    #[serde(default)]
    pub multi_hop: MultiHopConfig,

    /// Completion provider used for generation, reflection and decomposition.
    #[serde(default)]
    pub llm: CompletionConfig,

    /// Embedding provider used by the chunk store.
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

impl GlobalConfig {
    /// Load from `~/.irra/config.yaml`, or defaults when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`IrraError::InvalidGlobalConfig`] if the file exists but cannot be parsed.
    pub fn load_default() -> Result<Self, IrraError> {
        match Self::default_path() {
            Some(path) => Self::from_path(&path),
            None => {
                tracing::debug!("Could not determine home directory, using default config");
                Ok(Self::default())
            }
        }
    }

    /// Load from a specific path, or defaults when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`IrraError::InvalidGlobalConfig`] if the file cannot be read or parsed,
    /// and [`IrraError::InvalidConfiguration`] if validation fails.
    pub fn from_path(path: &Path) -> Result<Self, IrraError> {
        if !path.exists() {
            tracing::debug!(
                "Global config not found at {}, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            IrraError::InvalidGlobalConfig(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let config = Self::from_yaml(&content).map_err(|e| match e {
            IrraError::InvalidGlobalConfig(msg) => {
                IrraError::InvalidGlobalConfig(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })?;

        for warning in config.validate()? {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok(config)
    }

    /// Parse YAML text without validating it.
    pub fn from_yaml(content: &str) -> Result<Self, IrraError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
            .map_err(|e| IrraError::InvalidGlobalConfig(format!("Failed to parse: {}", e)))
    }

    /// `~/.irra`
    pub fn default_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(IRRA_HOME_DIR))
    }

    /// `~/.irra/config.yaml`
    pub fn default_path() -> Option<PathBuf> {
        Self::default_dir().map(|d| d.join(GLOBAL_CONFIG_FILENAME))
    }

    /// Store directory: `storePath` if set (with `~` expanded), else `~/.irra/store`.
    pub fn resolved_store_path(&self) -> PathBuf {
        match &self.store_path {
            Some(path) => expand_home(path),
            None => Self::default_dir()
                .unwrap_or_else(|| PathBuf::from(IRRA_HOME_DIR))
                .join(STORE_DIR_NAME),
        }
    }

    /// Reranker config with the top-level device applied when the reranker
    /// itself says `auto`.
    pub fn effective_reranker_config(&self) -> RerankerConfig {
        let mut reranker = self.retrieval.reranker.clone();
        if reranker.device == DevicePreference::Auto {
            reranker.device = self.device;
        }
        reranker
    }

    /// Validate every section.
    ///
    /// Returns non-fatal warnings; the first critical problem is returned as
    /// [`IrraError::InvalidConfiguration`].
    pub fn validate(&self) -> Result<Vec<String>, IrraError> {
        let mut warnings = Vec::new();
        warnings.extend(self.retrieval.validate()?);
        warnings.extend(self.reflection.validate()?);
        warnings.extend(self.multi_hop.validate());
        warnings.extend(validate_llm(&self.llm)?);
        validate_embedding(&self.embedding)?;
        Ok(warnings)
    }
}

fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}

fn validate_llm(llm: &CompletionConfig) -> Result<Vec<String>, IrraError> {
    let mut warnings = Vec::new();
    if llm.model.trim().is_empty() {
        return Err(IrraError::invalid_configuration(
            "llm.model cannot be empty",
            "Set llm.model to an installed Ollama model (e.g. llama3.1:8b)",
        ));
    }
    if llm.max_tokens == 0 {
        return Err(IrraError::invalid_configuration(
            "llm.maxTokens cannot be 0",
            "Set maxTokens to at least 1 (recommended: 1024)",
        ));
    }
    if !(0.0..=2.0).contains(&llm.temperature) {
        warnings.push(format!(
            "llm.temperature={} is outside the usual 0.0-2.0 range",
            llm.temperature
        ));
    }
    Ok(warnings)
}

fn validate_embedding(embedding: &EmbeddingConfig) -> Result<(), IrraError> {
    if embedding.dimension == 0 {
        return Err(IrraError::invalid_configuration(
            "embedding.dimension cannot be 0",
            "Set dimension to the output size of the embedding model (nomic-embed-text: 768)",
        ));
    }
    Ok(())
}

// ============================================================================
// RetrievalConfig
// ============================================================================

/// Hybrid retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalConfig {
    /// Chunks returned after fusion and reranking.
    #[serde(default = "default_final_k")]
    pub final_k: usize,

    /// Candidates fetched per modality and query before fusion.
    #[serde(default = "default_candidate_k")]
    pub candidate_k: usize,

    /// RRF constant.
    #[serde(default = "default_rrf_k")]
    pub rrf_k: usize,

    /// Whether retrieval reranks the fused set by default.
    #[serde(default = "default_true")]
    pub use_reranker: bool,

    #[serde(default)]
    pub reranker: RerankerConfig,

    /// Keyword index scoring parameters.
    #[serde(default)]
    pub keyword: Bm25Config,
}

fn default_final_k() -> usize {
    DEFAULT_FINAL_K
}

fn default_candidate_k() -> usize {
    DEFAULT_CANDIDATE_K
}

fn default_rrf_k() -> usize {
    DEFAULT_RRF_K
}

fn default_true() -> bool {
    true
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            final_k: DEFAULT_FINAL_K,
            candidate_k: DEFAULT_CANDIDATE_K,
            rrf_k: DEFAULT_RRF_K,
            use_reranker: true,
            reranker: RerankerConfig::default(),
            keyword: Bm25Config::default(),
        }
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> Result<Vec<String>, IrraError> {
        let mut warnings = Vec::new();

        if self.final_k == 0 {
            return Err(IrraError::invalid_configuration(
                "retrieval.finalK cannot be 0",
                "Set finalK to at least 1 (recommended: 5)",
            ));
        }
        if self.candidate_k == 0 {
            return Err(IrraError::invalid_configuration(
                "retrieval.candidateK cannot be 0",
                "Set candidateK to at least finalK (recommended: 10)",
            ));
        }
        if self.candidate_k < self.final_k {
            warnings.push(format!(
                "retrieval.candidateK ({}) < finalK ({}); candidateK will be raised to finalK",
                self.candidate_k, self.final_k
            ));
        }
        if self.rrf_k > 1000 {
            warnings.push(format!(
                "retrieval.rrfK={} is very large; rankings will be heavily smoothed (recommended: 60)",
                self.rrf_k
            ));
        }
        if self.use_reranker && !self.reranker.enabled {
            warnings.push(
                "retrieval.useReranker is true but retrieval.reranker.enabled is false; \
                 results will use fused order"
                    .to_string(),
            );
        }

        self.keyword.validate()?;
        Ok(warnings)
    }
}

// ============================================================================
// ReflectionConfig
// ============================================================================

/// Reflective answer loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReflectionConfig {
    /// Total retrieval+generation cycles.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Confidence at or above which an answer is accepted.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
}

fn default_max_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}

fn default_confidence_threshold() -> f32 {
    DEFAULT_CONFIDENCE_THRESHOLD
}

impl Default for ReflectionConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }
}

impl ReflectionConfig {
    pub fn validate(&self) -> Result<Vec<String>, IrraError> {
        let mut warnings = Vec::new();

        if self.max_iterations == 0 {
            return Err(IrraError::invalid_configuration(
                "reflection.maxIterations cannot be 0",
                "Set maxIterations to at least 1 (recommended: 2)",
            ));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(IrraError::invalid_configuration(
                format!(
                    "reflection.confidenceThreshold={} is outside [0, 1]",
                    self.confidence_threshold
                ),
                "Set confidenceThreshold between 0.0 and 1.0 (recommended: 0.6)",
            ));
        }
        if self.max_iterations == 1 {
            warnings.push(
                "reflection.maxIterations=1 disables reflection; the first answer is always returned"
                    .to_string(),
            );
        }
        if self.max_iterations > 5 {
            warnings.push(format!(
                "reflection.maxIterations={} may cause long response times",
                self.max_iterations
            ));
        }
        Ok(warnings)
    }
}

// ============================================================================
// MultiHopConfig
// ============================================================================

/// Multi-hop (query decomposition) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiHopConfig {
    /// Decompose automatically when the query contains a trigger phrase.
    #[serde(default = "default_true")]
    pub auto_detect: bool,

    /// Trigger phrases (matched case-insensitively as substrings).
    #[serde(default = "default_multi_hop_keywords")]
    pub keywords: Vec<String>,
}

fn default_multi_hop_keywords() -> Vec<String> {
    DEFAULT_MULTI_HOP_KEYWORDS
        .iter()
        .map(|k| k.to_string())
        .collect()
}

impl Default for MultiHopConfig {
    fn default() -> Self {
        Self {
            auto_detect: true,
            keywords: default_multi_hop_keywords(),
        }
    }
}

impl MultiHopConfig {
    pub fn validate(&self) -> Vec<String> {
        if self.auto_detect && self.keywords.iter().all(|k| k.trim().is_empty()) {
            vec!["multiHop.autoDetect is on but no keywords are configured".to_string()]
        } else {
            Vec::new()
        }
    }
}
