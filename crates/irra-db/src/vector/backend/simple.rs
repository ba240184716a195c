//! File-backed vector index.
//!
//! Vectors live in memory in id order and are mirrored to `vectors.jsonl`
//! after every write. The file is rewritten through a temporary sibling and
//! renamed into place, so a crash mid-write leaves the previous snapshot.
//! Search is a linear scan over the entries that pass the attribute filter.

use super::super::config::VectorIndexConfig;
use super::super::filter::AttributeFilter;
use super::super::traits::{
    Attributes, VectorId, VectorIndexBackend, VectorInsert, VectorMetric, VectorRecord,
    VectorSearchResult,
};
use crate::error::{DbError, DbResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, trace, warn};

const DATA_FILENAME: &str = "vectors.jsonl";
const DATA_TMP_FILENAME: &str = "vectors.jsonl.tmp";

/// One JSONL line.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredVector {
    id: u64,
    vector: Vec<f32>,
    payload: serde_json::Value,
    #[serde(default)]
    attributes: Attributes,
}

impl From<&VectorInsert> for StoredVector {
    fn from(insert: &VectorInsert) -> Self {
        Self {
            id: insert.id.value(),
            vector: insert.vector.clone(),
            payload: insert.payload.clone(),
            attributes: insert.attributes.clone(),
        }
    }
}

impl StoredVector {
    fn passes(&self, filter: Option<&AttributeFilter>) -> bool {
        filter.map(|f| f.matches(&self.attributes)).unwrap_or(true)
    }

    fn to_record(&self) -> VectorRecord {
        VectorRecord {
            id: VectorId::new(self.id),
            payload: self.payload.clone(),
            attributes: self.attributes.clone(),
        }
    }
}

pub struct SimpleFileVectorIndex {
    dir: PathBuf,
    dimension: usize,
    metric: VectorMetric,
    vectors: RwLock<BTreeMap<u64, StoredVector>>,
}

impl SimpleFileVectorIndex {
    /// Load the snapshot in `config.path`, if any.
    pub fn open(config: &VectorIndexConfig) -> DbResult<Self> {
        let index = Self {
            dir: config.path.clone(),
            dimension: config.dimension,
            metric: config.metric,
            vectors: RwLock::new(BTreeMap::new()),
        };

        let data_path = config.path.join(DATA_FILENAME);
        if data_path.exists() {
            index.load_from_file(&data_path)?;
        }

        Ok(index)
    }

    fn read(&self) -> DbResult<RwLockReadGuard<'_, BTreeMap<u64, StoredVector>>> {
        self.vectors
            .read()
            .map_err(|e| DbError::Poisoned(e.to_string()))
    }

    fn write(&self) -> DbResult<RwLockWriteGuard<'_, BTreeMap<u64, StoredVector>>> {
        self.vectors
            .write()
            .map_err(|e| DbError::Poisoned(e.to_string()))
    }

    /// Unparseable lines are skipped with a warning.
    fn load_from_file(&self, path: &Path) -> DbResult<()> {
        let reader = BufReader::new(
            File::open(path).map_err(|e| DbError::access(path, e.to_string()))?,
        );
        let mut vectors = self.write()?;

        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<StoredVector>(&line) {
                Ok(stored) => {
                    vectors.insert(stored.id, stored);
                }
                Err(e) => {
                    warn!("Skipping invalid vector line {}: {}", line_num + 1, e);
                }
            }
        }

        debug!("Loaded {} vectors from {:?}", vectors.len(), path);
        Ok(())
    }

    fn save_to_file(&self) -> DbResult<()> {
        let tmp_path = self.dir.join(DATA_TMP_FILENAME);
        let data_path = self.dir.join(DATA_FILENAME);
        let vectors = self.read()?;

        {
            let file =
                File::create(&tmp_path).map_err(|e| DbError::access(&tmp_path, e.to_string()))?;
            let mut writer = BufWriter::new(file);
            for stored in vectors.values() {
                serde_json::to_writer(&mut writer, stored)?;
                writer.write_all(b"\n")?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp_path, &data_path).map_err(|e| DbError::access(&data_path, e.to_string()))?;

        debug!("Saved {} vectors to {:?}", vectors.len(), data_path);
        Ok(())
    }

    fn similarity(&self, a: &[f32], b: &[f32]) -> f32 {
        match self.metric {
            VectorMetric::Cosine => cosine_similarity(a, b),
            VectorMetric::Dot => dot_product(a, b),
            // Negated so that higher is better for every metric
            VectorMetric::L2 => -euclidean_distance(a, b),
        }
    }
}

impl VectorIndexBackend for SimpleFileVectorIndex {
    fn query(
        &self,
        embedding: &[f32],
        limit: usize,
        filter: Option<&AttributeFilter>,
    ) -> DbResult<Vec<VectorSearchResult>> {
        trace!("Vector query, limit={}", limit);

        if embedding.len() != self.dimension {
            return Err(DbError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }

        let vectors = self.read()?;
        let mut scored: Vec<(f32, &StoredVector)> = vectors
            .values()
            .filter(|v| v.passes(filter))
            .map(|v| (self.similarity(embedding, &v.vector), v))
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(score, stored)| {
                VectorSearchResult::new(VectorId::new(stored.id), score, stored.payload.clone())
            })
            .collect())
    }

    fn scan(&self, filter: Option<&AttributeFilter>) -> DbResult<Vec<VectorRecord>> {
        let vectors = self.read()?;
        Ok(vectors
            .values()
            .filter(|v| v.passes(filter))
            .map(StoredVector::to_record)
            .collect())
    }

    fn upsert(&self, vectors: &[VectorInsert]) -> DbResult<()> {
        debug!("Upserting {} vectors", vectors.len());

        // Validate the whole batch before touching the store
        if let Some(bad) = vectors.iter().find(|v| v.vector.len() != self.dimension) {
            return Err(DbError::DimensionMismatch {
                expected: self.dimension,
                actual: bad.vector.len(),
            });
        }

        {
            let mut stored = self.write()?;
            for insert in vectors {
                stored.insert(insert.id.value(), StoredVector::from(insert));
            }
        }

        self.save_to_file()
    }

    fn delete(&self, ids: &[VectorId]) -> DbResult<()> {
        debug!("Deleting {} vectors", ids.len());

        {
            let mut stored = self.write()?;
            for id in ids {
                stored.remove(&id.value());
            }
        }

        self.save_to_file()
    }

    fn max_id(&self) -> DbResult<Option<VectorId>> {
        Ok(self.read()?.keys().next_back().copied().map(VectorId::new))
    }

    fn flush(&self) -> DbResult<()> {
        self.save_to_file()
    }

    fn len(&self) -> DbResult<usize> {
        Ok(self.read()?.len())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn metric(&self) -> VectorMetric {
        self.metric
    }
}

/// Zero when either vector has no magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot = dot_product(a, b);
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f32>()
        .sqrt()
}
