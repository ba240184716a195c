//! Core domain types: chunks, their metadata, identity and filters.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Number of leading characters of `content` that identify a chunk.
pub const CHUNK_KEY_CHARS: usize = 200;

/// Source name used when a chunk carries none.
pub const UNKNOWN_SOURCE: &str = "Unknown Document";

// ============================================================================
// ChunkMetadata
// ============================================================================

/// Metadata attached to a chunk by the ingestion producer.
///
/// Keys are snake_case on the wire. Anything not modelled here is kept in
/// `extra` and still participates in metadata filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Source document name (e.g. `week3_osmosis.pdf`).
    #[serde(default = "default_source_file")]
    pub source_file: String,

    /// 1-based page or slide number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_heading: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,

    /// Document type (e.g. `lecture`, `lab`, `slides`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,

    /// Teaching week.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub week: Option<u32>,

    /// Position of the chunk within its source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_index: Option<usize>,

    /// Notebook (scope) the source was uploaded into.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notebook_id: Option<String>,

    /// Producer-specific fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_source_file() -> String {
    UNKNOWN_SOURCE.to_string()
}

impl Default for ChunkMetadata {
    fn default() -> Self {
        Self {
            source_file: default_source_file(),
            page_number: None,
            section_heading: None,
            topic: None,
            doc_type: None,
            week: None,
            chunk_index: None,
            notebook_id: None,
            extra: Map::new(),
        }
    }
}

impl ChunkMetadata {
    /// Metadata for a named source.
    pub fn for_source(source_file: impl Into<String>) -> Self {
        Self {
            source_file: source_file.into(),
            ..Self::default()
        }
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page_number = Some(page);
        self
    }

    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section_heading = Some(section.into());
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn with_week(mut self, week: u32) -> Self {
        self.week = Some(week);
        self
    }

    pub fn with_notebook(mut self, notebook_id: impl Into<String>) -> Self {
        self.notebook_id = Some(notebook_id.into());
        self
    }

    /// Flatten into a single JSON object (typed fields plus `extra`).
    pub fn to_attributes(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

// ============================================================================
// Chunk
// ============================================================================

/// Immutable unit of retrievable text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    #[serde(default)]
    pub metadata: ChunkMetadata,
}

impl Chunk {
    pub fn new(content: impl Into<String>, metadata: ChunkMetadata) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }

    /// Identity used for deduplication during fusion.
    pub fn key(&self) -> ChunkKey {
        ChunkKey::of(&self.content)
    }
}

/// Deduplication identity: the first [`CHUNK_KEY_CHARS`] characters of content.
///
/// Metadata does not participate, so two chunks with the same leading text
/// are duplicates even if their metadata differs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkKey(String);

impl ChunkKey {
    pub fn of(content: &str) -> Self {
        Self(content.chars().take(CHUNK_KEY_CHARS).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// MetadataFilter
// ============================================================================

/// Exact-match metadata constraints combined with AND.
///
/// An empty filter matches every chunk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataFilter {
    constraints: BTreeMap<String, Value>,
}

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a constraint (builder style).
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.constraints.insert(field.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.constraints.iter()
    }

    /// Whether every constraint equals the chunk's field value.
    pub fn matches(&self, metadata: &ChunkMetadata) -> bool {
        if self.constraints.is_empty() {
            return true;
        }
        let attributes = metadata.to_attributes();
        self.constraints
            .iter()
            .all(|(field, expected)| attributes.get(field) == Some(expected))
    }
}

impl FromIterator<(String, Value)> for MetadataFilter {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            constraints: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chunk_deserialize_producer_format() {
        let chunk: Chunk = serde_json::from_value(json!({
            "content": "Osmosis is the diffusion of water.",
            "metadata": {
                "source_file": "week3.pdf",
                "page_number": 4,
                "week": 3,
                "lecturer": "Dr. Chen"
            }
        }))
        .unwrap();

        assert_eq!(chunk.metadata.source_file, "week3.pdf");
        assert_eq!(chunk.metadata.page_number, Some(4));
        assert_eq!(chunk.metadata.week, Some(3));
        assert_eq!(chunk.metadata.extra["lecturer"], "Dr. Chen");
    }

    #[test]
    fn test_missing_metadata_defaults_source() {
        let chunk: Chunk = serde_json::from_str(r#"{"content":"text"}"#).unwrap();
        assert_eq!(chunk.metadata.source_file, UNKNOWN_SOURCE);
        assert!(chunk.metadata.page_number.is_none());
    }

    #[test]
    fn test_chunk_key_uses_content_prefix_only() {
        let prefix = "x".repeat(CHUNK_KEY_CHARS);
        let a = Chunk::new(format!("{prefix}AAA"), ChunkMetadata::for_source("a.pdf"));
        let b = Chunk::new(format!("{prefix}BBB"), ChunkMetadata::for_source("b.pdf"));
        assert_eq!(a.key(), b.key());

        let c = Chunk::new("short", ChunkMetadata::default());
        assert_eq!(c.key().as_str(), "short");
    }

    #[test]
    fn test_chunk_key_counts_characters_not_bytes() {
        let content = "é".repeat(CHUNK_KEY_CHARS + 5);
        assert_eq!(ChunkKey::of(&content).as_str().chars().count(), CHUNK_KEY_CHARS);
    }

    #[test]
    fn test_filter_and_semantics() {
        let meta = ChunkMetadata::for_source("week3.pdf")
            .with_week(3)
            .with_topic("Cells");

        assert!(MetadataFilter::new().matches(&meta));
        assert!(MetadataFilter::new().with("week", 3).matches(&meta));
        assert!(MetadataFilter::new()
            .with("week", 3)
            .with("topic", "Cells")
            .matches(&meta));
        assert!(!MetadataFilter::new()
            .with("week", 3)
            .with("topic", "Genetics")
            .matches(&meta));
        assert!(!MetadataFilter::new().with("doc_type", "lab").matches(&meta));
    }

    #[test]
    fn test_filter_on_extra_field() {
        let mut meta = ChunkMetadata::for_source("a.pdf");
        meta.extra.insert("unit".to_string(), json!("SIT101"));

        assert!(MetadataFilter::new().with("unit", "SIT101").matches(&meta));
    }
}
