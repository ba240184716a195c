//! Vector index settings and the `index.meta.json` stamp.
//!
//! Every index directory carries a small metadata file recording how its
//! vectors were produced. Reopening checks the stamp against the requested
//! settings: vectors from a different embedding model, dimension or metric
//! are not comparable with new query embeddings, so such an index is
//! refused instead of silently returning nonsense neighbours.

use super::traits::VectorMetric;
use crate::error::{DbError, DbResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_BACKEND: &str = "simple";

pub const INDEX_META_FILENAME: &str = "index.meta.json";

const SCHEMA_VERSION: u32 = 1;

/// How to open (or create) a vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorIndexConfig {
    pub path: PathBuf,
    pub dimension: usize,
    /// Model that produces the stored vectors. `None` skips the model check.
    #[serde(default)]
    pub embedding_model: Option<String>,
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default)]
    pub metric: VectorMetric,
    #[serde(default = "default_true")]
    pub create_if_missing: bool,
}

fn default_backend() -> String {
    DEFAULT_BACKEND.to_string()
}

fn default_true() -> bool {
    true
}

impl VectorIndexConfig {
    pub fn new(dimension: usize, path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            dimension,
            embedding_model: None,
            backend: default_backend(),
            metric: VectorMetric::Cosine,
            create_if_missing: true,
        }
    }

    pub fn with_embedding_model(mut self, model_id: impl Into<String>) -> Self {
        self.embedding_model = Some(model_id.into());
        self
    }

    pub fn with_metric(mut self, metric: VectorMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }
}

/// Stamp persisted next to the index data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorIndexMeta {
    pub backend: String,
    pub dimension: usize,
    pub metric: VectorMetric,
    #[serde(default)]
    pub embedding_model: Option<String>,
    #[serde(default = "schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub created_at: Option<String>,
}

fn schema_version() -> u32 {
    SCHEMA_VERSION
}

impl VectorIndexMeta {
    /// Stamp for a fresh index built with `config`.
    pub fn for_config(config: &VectorIndexConfig) -> Self {
        Self {
            backend: config.backend.clone(),
            dimension: config.dimension,
            metric: config.metric,
            embedding_model: config.embedding_model.clone(),
            schema_version: SCHEMA_VERSION,
            created_at: Some(chrono::Utc::now().to_rfc3339()),
        }
    }

    /// First setting in `config` that disagrees with this stamp.
    ///
    /// An index stamped without a model accepts any model.
    pub fn conflict_with(&self, config: &VectorIndexConfig) -> Option<IndexConflict> {
        if let (Some(indexed), Some(configured)) = (&self.embedding_model, &config.embedding_model)
        {
            if indexed != configured {
                return Some(IndexConflict::EmbeddingModel {
                    indexed: indexed.clone(),
                    configured: configured.clone(),
                });
            }
        }
        if self.dimension != config.dimension {
            return Some(IndexConflict::Dimension {
                indexed: self.dimension,
                configured: config.dimension,
            });
        }
        if self.metric != config.metric {
            return Some(IndexConflict::Metric {
                indexed: self.metric,
                configured: config.metric,
            });
        }
        if self.backend != config.backend {
            return Some(IndexConflict::Backend {
                indexed: self.backend.clone(),
                configured: config.backend.clone(),
            });
        }
        None
    }
}

/// Why an existing index cannot serve a config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexConflict {
    EmbeddingModel { indexed: String, configured: String },
    Dimension { indexed: usize, configured: usize },
    Metric { indexed: VectorMetric, configured: VectorMetric },
    Backend { indexed: String, configured: String },
}

impl fmt::Display for IndexConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmbeddingModel {
                indexed,
                configured,
            } => write!(
                f,
                "indexed with embedding model '{}' but '{}' is configured; re-index the corpus",
                indexed, configured
            ),
            Self::Dimension {
                indexed,
                configured,
            } => write!(
                f,
                "vectors have dimension {} but the embedding model produces {}",
                indexed, configured
            ),
            Self::Metric {
                indexed,
                configured,
            } => write!(f, "built for {} distance, {} requested", indexed, configured),
            Self::Backend {
                indexed,
                configured,
            } => write!(f, "written by backend '{}', '{}' requested", indexed, configured),
        }
    }
}

/// What an index directory currently holds.
#[derive(Debug, Clone)]
pub enum IndexState {
    /// Nothing yet (no directory, or an empty one).
    Missing,
    Ready(VectorIndexMeta),
    /// Files exist but the stamp is absent or unreadable.
    Unreadable(String),
}

/// Inspect `path` without modifying it.
pub fn probe_index(path: &Path) -> IndexState {
    if !path.join(INDEX_META_FILENAME).exists() {
        let has_files = path
            .read_dir()
            .map(|mut entries| entries.next().is_some())
            .unwrap_or(false);
        return if has_files {
            IndexState::Unreadable("directory has files but no index metadata".to_string())
        } else {
            IndexState::Missing
        };
    }

    match load_index_meta(path) {
        Ok(meta) => IndexState::Ready(meta),
        Err(e) => IndexState::Unreadable(e.to_string()),
    }
}

pub fn load_index_meta(path: &Path) -> DbResult<VectorIndexMeta> {
    let meta_path = path.join(INDEX_META_FILENAME);
    debug!("Loading index metadata from {:?}", meta_path);

    let content = fs::read_to_string(&meta_path)
        .map_err(|e| DbError::access(&meta_path, e.to_string()))?;
    serde_json::from_str(&content).map_err(|e| DbError::malformed(&meta_path, e.to_string()))
}

/// Write the stamp, creating `path` if needed.
pub fn write_index_meta(path: &Path, meta: &VectorIndexMeta) -> DbResult<()> {
    fs::create_dir_all(path)?;
    fs::write(
        path.join(INDEX_META_FILENAME),
        serde_json::to_string_pretty(meta)?,
    )?;
    Ok(())
}
