//! Vector index traits and core types.
//!
//! Every stored vector carries two JSON documents:
//!
//! - `payload`: opaque data returned to the caller on a hit (the chunk itself)
//! - `attributes`: a flat object of scalar fields that [`AttributeFilter`]
//!   constraints are evaluated against

use crate::error::DbResult;
use serde::{Deserialize, Serialize};

use super::filter::AttributeFilter;

/// Flat attribute object stored alongside each vector.
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// Position of a vector in the index. Chunk ids are assigned sequentially.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VectorId(pub u64);

impl VectorId {
    pub fn new(id: u64) -> Self {
        VectorId(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// Next id, saturating at `u64::MAX`.
    pub fn next(&self) -> Self {
        VectorId(self.0.saturating_add(1))
    }
}

impl From<u64> for VectorId {
    fn from(id: u64) -> Self {
        VectorId(id)
    }
}

impl std::fmt::Display for VectorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Similarity used to rank neighbours. Embedding models are compared by
/// cosine unless an index was created otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorMetric {
    #[default]
    Cosine,
    Dot,
    /// Euclidean distance, negated so larger is closer.
    L2,
}

impl VectorMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            VectorMetric::Cosine => "cosine",
            VectorMetric::Dot => "dot",
            VectorMetric::L2 => "l2",
        }
    }
}

impl std::fmt::Display for VectorMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One embedded chunk to write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorInsert {
    pub id: VectorId,
    pub vector: Vec<f32>,
    pub payload: serde_json::Value,
    #[serde(default)]
    pub attributes: Attributes,
}

impl VectorInsert {
    pub fn new(id: impl Into<VectorId>, vector: Vec<f32>, payload: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            vector,
            payload,
            attributes: Attributes::new(),
        }
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Nearest-neighbour hit. `score` is higher-is-better for every metric.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorSearchResult {
    pub id: VectorId,
    pub score: f32,
    pub payload: serde_json::Value,
}

impl VectorSearchResult {
    pub fn new(id: impl Into<VectorId>, score: f32, payload: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            score,
            payload,
        }
    }
}

/// Stored entry as listed by [`VectorIndexBackend::scan`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: VectorId,
    pub payload: serde_json::Value,
    pub attributes: Attributes,
}

/// Storage behind the chunk store.
///
/// `query` returns hits best first with ties in storage order, `scan`
/// lists records by ascending id, and upserting an existing id replaces it.
pub trait VectorIndexBackend: Send + Sync {
    /// Up to `limit` nearest vectors among those whose attributes satisfy `filter`.
    fn query(
        &self,
        embedding: &[f32],
        limit: usize,
        filter: Option<&AttributeFilter>,
    ) -> DbResult<Vec<VectorSearchResult>>;

    fn scan(&self, filter: Option<&AttributeFilter>) -> DbResult<Vec<VectorRecord>>;

    fn upsert(&self, vectors: &[VectorInsert]) -> DbResult<()>;

    fn delete(&self, ids: &[VectorId]) -> DbResult<()>;

    /// Delete every vector matching the filter. Returns how many were removed.
    fn delete_matching(&self, filter: &AttributeFilter) -> DbResult<usize> {
        let ids: Vec<VectorId> = self
            .scan(Some(filter))?
            .into_iter()
            .map(|record| record.id)
            .collect();
        if !ids.is_empty() {
            self.delete(&ids)?;
        }
        Ok(ids.len())
    }

    fn max_id(&self) -> DbResult<Option<VectorId>>;

    /// Persist pending writes.
    fn flush(&self) -> DbResult<()>;

    fn len(&self) -> DbResult<usize>;

    fn is_empty(&self) -> DbResult<bool> {
        Ok(self.len()? == 0)
    }

    fn dimension(&self) -> usize;

    fn metric(&self) -> VectorMetric;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_id() {
        let id = VectorId::new(123);
        assert_eq!(id.value(), 123);
        assert_eq!(id.to_string(), "123");
        assert_eq!(id.next(), VectorId(124));
        assert_eq!(VectorId(u64::MAX).next(), VectorId(u64::MAX));
    }

    #[test]
    fn test_metric_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&VectorMetric::L2).unwrap(), "\"l2\"");
        assert_eq!(VectorMetric::default(), VectorMetric::Cosine);
    }

    #[test]
    fn test_vector_insert_attributes() {
        let insert = VectorInsert::new(1u64, vec![1.0, 2.0], serde_json::json!({"content": "x"}))
            .with_attribute("source_file", "w1.pdf")
            .with_attribute("week", 1);

        assert_eq!(insert.id.value(), 1);
        assert_eq!(insert.attributes["source_file"], "w1.pdf");
        assert_eq!(insert.attributes["week"], 1);
    }
}
