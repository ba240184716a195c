//! Adapter layer for irra-db infrastructure.
//!
//! - Error conversion from `DbError` to `IrraError`
//! - Conversion between chunks and stored vector records
//!
//! The chunk store ([`crate::store`]) is the only caller.

use irra_db::vector::{
    AttributeFilter, Attributes, IndexConflict, VectorId, VectorInsert, VectorRecord,
};
use irra_db::DbError;

use crate::errors::IrraError;
use crate::types::{Chunk, MetadataFilter};

// ============================================================================
// Error Conversion
// ============================================================================

/// Convert an irra-db error to an irra-core error.
pub fn from_db_error(err: DbError) -> IrraError {
    match err {
        DbError::Io(io_err) => IrraError::Io(io_err),

        DbError::Json(json_err) => IrraError::Json(json_err),

        DbError::Access { path, message } => IrraError::StoreIo { path, message },

        DbError::Malformed { path, message } => IrraError::StoreIo {
            path,
            message: format!("malformed: {}", message),
        },

        DbError::DimensionMismatch { expected, actual }
        | DbError::Conflict {
            conflict:
                IndexConflict::Dimension {
                    indexed: expected,
                    configured: actual,
                },
            ..
        } => IrraError::DimensionMismatch { expected, actual },

        DbError::Conflict { path, conflict } => IrraError::StoreIncompatible {
            reason: format!("{}: {}", path.display(), conflict),
        },

        DbError::IndexNotFound { path } => IrraError::PathNotFound(path.display().to_string()),

        DbError::UnknownBackend(name) => IrraError::StoreIncompatible {
            reason: format!("unknown vector index backend '{}'", name),
        },

        DbError::Poisoned(message) => IrraError::Internal(message),
    }
}

/// Extension trait to convert `DbResult` to `Result<T, IrraError>`.
pub trait IntoIrraResult<T> {
    fn into_irra_result(self) -> Result<T, IrraError>;
}

impl<T> IntoIrraResult<T> for irra_db::DbResult<T> {
    fn into_irra_result(self) -> Result<T, IrraError> {
        self.map_err(from_db_error)
    }
}

// ============================================================================
// Type Conversion
// ============================================================================

/// Metadata filter as exact-match attribute constraints.
pub fn to_attribute_filter(filter: &MetadataFilter) -> AttributeFilter {
    filter
        .iter()
        .map(|(field, value)| (field.clone(), value.clone()))
        .collect()
}

/// Vector insert carrying the chunk as payload and its flattened metadata as attributes.
pub fn to_vector_insert(
    id: VectorId,
    chunk: &Chunk,
    embedding: Vec<f32>,
) -> Result<VectorInsert, IrraError> {
    let payload = serde_json::to_value(chunk)?;
    Ok(VectorInsert::new(id, embedding, payload).with_attributes(chunk.metadata.to_attributes()))
}

/// Chunk stored in a record payload.
pub fn chunk_from_payload(payload: serde_json::Value) -> Result<Chunk, IrraError> {
    Ok(serde_json::from_value(payload)?)
}

/// Chunk from a scanned record, with its attributes for grouping.
pub fn chunk_from_record(record: VectorRecord) -> Result<(Chunk, Attributes), IrraError> {
    Ok((chunk_from_payload(record.payload)?, record.attributes))
}
