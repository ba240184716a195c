//! Persistent chunk store.
//!
//! Chunks are embedded and kept in an irra-db vector index: the chunk JSON
//! is the record payload, its flattened metadata the filterable attributes.
//! The store is both the dense search provider and the corpus snapshot the
//! keyword index is built from.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use irra_db::vector::{open_vector_index, AttributeFilter, VectorIndexBackend, VectorIndexConfig};
use irra_model::EmbeddingModel;
use serde::Serialize;
use tracing::{debug, info};

use crate::corpus::CorpusProvider;
use crate::db_adapter::{self, to_attribute_filter, IntoIrraResult as _};
use crate::dense::DenseSearchProvider;
use crate::errors::IrraError;
use crate::model_adapter::IntoIrraResult as _;
use crate::types::{Chunk, MetadataFilter};

/// Texts embedded per request during ingestion.
const EMBED_BATCH_SIZE: usize = 32;

/// Per-source summary for listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSummary {
    pub source_file: String,
    pub topic: Option<String>,
    pub doc_type: Option<String>,
    pub notebook_id: Option<String>,
    pub chunk_count: usize,
}

/// Distinct filter values present in the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Facets {
    pub weeks: Vec<u32>,
    pub topics: Vec<String>,
}

/// Parse chunks from JSON Lines, one `{content, metadata}` object per line.
///
/// Blank lines are skipped. Records with blank content are rejected.
pub fn parse_chunks_jsonl(text: &str) -> Result<Vec<Chunk>, IrraError> {
    let mut chunks = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let chunk: Chunk = serde_json::from_str(line).map_err(|e| IrraError::ChunkParse {
            line: idx + 1,
            message: e.to_string(),
        })?;
        if chunk.content.trim().is_empty() {
            return Err(IrraError::ChunkParse {
                line: idx + 1,
                message: "content is empty".to_string(),
            });
        }
        chunks.push(chunk);
    }
    Ok(chunks)
}

/// Chunk store over a vector index and an embedding model.
pub struct ChunkStore {
    path: PathBuf,
    index: Arc<dyn VectorIndexBackend>,
    embedder: Arc<dyn EmbeddingModel>,
}

impl std::fmt::Debug for ChunkStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkStore")
            .field("path", &self.path)
            .field("embedder", &self.embedder.model_id())
            .finish()
    }
}

impl ChunkStore {
    /// Open (or create) the store at `path`.
    ///
    /// # Errors
    ///
    /// Fails if an existing store was built by a different embedding model
    /// or with a different dimension, or cannot be read.
    pub fn open(path: &Path, embedder: Arc<dyn EmbeddingModel>) -> Result<Self, IrraError> {
        let config = VectorIndexConfig::new(embedder.dimension(), path)
            .with_embedding_model(embedder.model_id());
        let index = open_vector_index(&config).into_irra_result()?;
        debug!("Opened chunk store at {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            index,
            embedder,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn embedding_model_id(&self) -> &str {
        self.embedder.model_id()
    }

    /// Embed and store chunks. Returns the number stored.
    ///
    /// Ids continue from the highest stored id. Nothing is written if any
    /// batch fails to embed.
    pub fn add_chunks(&self, chunks: &[Chunk]) -> Result<usize, IrraError> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let mut vectors = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(EMBED_BATCH_SIZE) {
            let texts: Vec<&str> = batch.iter().map(|c| c.content.as_str()).collect();
            let embeddings = self.embedder.embed(&texts).into_irra_result()?;
            if embeddings.len() != batch.len() {
                return Err(IrraError::EmbeddingProviderUnavailable {
                    provider: self.embedder.model_id().to_string(),
                    reason: format!(
                        "expected {} embeddings, got {}",
                        batch.len(),
                        embeddings.len()
                    ),
                });
            }
            vectors.extend(embeddings);
        }

        let mut next_id = match self.index.max_id().into_irra_result()? {
            Some(id) => id.next(),
            None => irra_db::vector::VectorId(0),
        };
        let mut inserts = Vec::with_capacity(chunks.len());
        for (chunk, embedding) in chunks.iter().zip(vectors) {
            inserts.push(db_adapter::to_vector_insert(next_id, chunk, embedding)?);
            next_id = next_id.next();
        }

        self.index.upsert(&inserts).into_irra_result()?;
        self.index.flush().into_irra_result()?;
        info!("Stored {} chunks", inserts.len());
        Ok(inserts.len())
    }

    /// Delete every chunk of `source_file`, optionally only within one notebook.
    pub fn remove_source(
        &self,
        source_file: &str,
        notebook_id: Option<&str>,
    ) -> Result<usize, IrraError> {
        let mut filter = AttributeFilter::new().with("source_file", source_file);
        if let Some(notebook) = notebook_id {
            filter.insert("notebook_id", notebook);
        }
        let removed = self.index.delete_matching(&filter).into_irra_result()?;
        self.index.flush().into_irra_result()?;
        info!("Removed {} chunks of '{}'", removed, source_file);
        Ok(removed)
    }

    /// Number of stored chunks, optionally within one notebook.
    pub fn stats(&self, notebook_id: Option<&str>) -> Result<usize, IrraError> {
        match notebook_id {
            None => self.index.len().into_irra_result(),
            Some(notebook) => {
                let filter = AttributeFilter::new().with("notebook_id", notebook);
                Ok(self.index.scan(Some(&filter)).into_irra_result()?.len())
            }
        }
    }

    /// One summary per source file, sorted by source name.
    pub fn sources(&self, notebook_id: Option<&str>) -> Result<Vec<SourceSummary>, IrraError> {
        let filter = notebook_id.map(|n| AttributeFilter::new().with("notebook_id", n));
        let records = self.index.scan(filter.as_ref()).into_irra_result()?;

        let mut by_source: BTreeMap<String, SourceSummary> = BTreeMap::new();
        for record in records {
            let (chunk, _) = db_adapter::chunk_from_record(record)?;
            let meta = chunk.metadata;
            by_source
                .entry(meta.source_file.clone())
                .and_modify(|s| s.chunk_count += 1)
                .or_insert(SourceSummary {
                    source_file: meta.source_file,
                    topic: meta.topic,
                    doc_type: meta.doc_type,
                    notebook_id: meta.notebook_id,
                    chunk_count: 1,
                });
        }
        Ok(by_source.into_values().collect())
    }

    /// Sorted distinct weeks and topics.
    pub fn facets(&self) -> Result<Facets, IrraError> {
        let mut weeks = BTreeSet::new();
        let mut topics = BTreeSet::new();
        for chunk in self.all_chunks()? {
            if let Some(week) = chunk.metadata.week {
                weeks.insert(week);
            }
            if let Some(topic) = chunk.metadata.topic {
                if !topic.is_empty() {
                    topics.insert(topic);
                }
            }
        }
        Ok(Facets {
            weeks: weeks.into_iter().collect(),
            topics: topics.into_iter().collect(),
        })
    }
}

impl CorpusProvider for ChunkStore {
    /// Every stored chunk in insertion (id) order.
    fn all_chunks(&self) -> Result<Vec<Chunk>, IrraError> {
        self.index
            .scan(None)
            .into_irra_result()?
            .into_iter()
            .map(|record| db_adapter::chunk_from_payload(record.payload))
            .collect()
    }
}

impl DenseSearchProvider for ChunkStore {
    fn search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<Chunk>, IrraError> {
        if k == 0 || self.index.is_empty().into_irra_result()? {
            return Ok(Vec::new());
        }

        let embedding = self.embedder.embed_one(query).into_irra_result()?;
        let attribute_filter = filter.map(to_attribute_filter);
        let hits = self
            .index
            .query(&embedding, k, attribute_filter.as_ref())
            .into_irra_result()?;

        hits.into_iter()
            .map(|hit| db_adapter::chunk_from_payload(hit.payload))
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Deterministic embedding model for store tests.

    use irra_model::{EmbeddingModel, ModelResult};

    /// Bag-of-letters embedding: counts of a-z, so texts sharing letters are close.
    #[derive(Debug, Default)]
    pub struct LetterEmbedding;

    pub const LETTER_DIMENSION: usize = 26;

    impl EmbeddingModel for LetterEmbedding {
        fn embed(&self, texts: &[&str]) -> ModelResult<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|text| {
                    let mut v = vec![0.0f32; LETTER_DIMENSION];
                    for c in text.to_lowercase().chars() {
                        if c.is_ascii_lowercase() {
                            v[(c as u8 - b'a') as usize] += 1.0;
                        }
                    }
                    v
                })
                .collect())
        }

        fn dimension(&self) -> usize {
            LETTER_DIMENSION
        }

        fn model_id(&self) -> &str {
            "letters"
        }
    }
}
