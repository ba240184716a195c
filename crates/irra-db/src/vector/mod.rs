//! Vector index module for irra-db.
//!
//! ## Usage
//!
//! ```ignore
//! use irra_db::vector::{open_vector_index, VectorIndexConfig, VectorInsert};
//!
//! let config = VectorIndexConfig::new(768, "/path/to/store")
//!     .with_embedding_model("nomic-embed-text");
//! let index = open_vector_index(&config)?;
//!
//! index.upsert(&[VectorInsert::new(1u64, embedding, payload)])?;
//! let results = index.query(&query_embedding, 10, None)?;
//! ```

mod backend;
mod config;
mod filter;
mod traits;

pub use config::{
    load_index_meta, probe_index, write_index_meta, IndexConflict, IndexState, VectorIndexConfig,
    VectorIndexMeta, DEFAULT_BACKEND, INDEX_META_FILENAME,
};
pub use filter::AttributeFilter;
pub use traits::{
    Attributes, VectorId, VectorIndexBackend, VectorInsert, VectorMetric, VectorRecord,
    VectorSearchResult,
};

pub use backend::{open_vector_index, SimpleFileVectorIndex, BACKENDS};
