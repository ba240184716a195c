//! Vector index backend implementations.
//!
//! Only the file-backed `simple` backend ships today. Course corpora are
//! small (thousands of chunks), so a linear scan is fast enough.

mod simple;

pub use simple::SimpleFileVectorIndex;

use super::config::{probe_index, write_index_meta, IndexState, VectorIndexConfig, VectorIndexMeta};
use super::traits::VectorIndexBackend;
use crate::error::{DbError, DbResult};
use std::sync::Arc;
use tracing::{debug, info};

/// Backend names accepted in [`VectorIndexConfig::backend`].
pub const BACKENDS: &[&str] = &["simple"];

/// Open the index described by `config`, stamping a new one if allowed.
///
/// # Errors
///
/// - `IndexNotFound` when nothing exists and `create_if_missing` is off
/// - `Conflict` when the stamp disagrees with `config`, e.g. after the
///   embedding model was changed
/// - `Malformed` when the directory holds files but no readable stamp
/// - `UnknownBackend` for a backend not in [`BACKENDS`]
pub fn open_vector_index(config: &VectorIndexConfig) -> DbResult<Arc<dyn VectorIndexBackend>> {
    if !BACKENDS.contains(&config.backend.as_str()) {
        return Err(DbError::UnknownBackend(config.backend.clone()));
    }

    match probe_index(&config.path) {
        IndexState::Ready(meta) => {
            if let Some(conflict) = meta.conflict_with(config) {
                return Err(DbError::Conflict {
                    path: config.path.clone(),
                    conflict,
                });
            }
            debug!(
                "Reusing vector index at {:?} (model {:?})",
                config.path, meta.embedding_model
            );
        }
        IndexState::Missing if config.create_if_missing => {
            info!("Creating vector index at {:?}", config.path);
            write_index_meta(&config.path, &VectorIndexMeta::for_config(config))?;
        }
        IndexState::Missing => {
            return Err(DbError::IndexNotFound {
                path: config.path.clone(),
            });
        }
        IndexState::Unreadable(reason) => {
            return Err(DbError::malformed(&config.path, reason));
        }
    }

    Ok(Arc::new(SimpleFileVectorIndex::open(config)?))
}

// ============================================================================
// Tests
// ============================================================================
