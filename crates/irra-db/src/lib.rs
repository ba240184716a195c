//! # irra-db
//!
//! Storage layer for IRRA - the persistent vector index that backs dense
//! retrieval and the corpus snapshot used to build the keyword index.
//!
//! Keeping storage here means `irra-core` only talks to the
//! [`vector::VectorIndexBackend`] trait and never to a file format.
//!
//! ## Architecture
//!
//! ```text
//! irra-cli → irra-core → (traits)
//!               ↑
//!            irra-db    (vector storage + exact-match attribute filters)
//!            irra-model (reranker, completion, embeddings)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use irra_db::vector::{open_vector_index, AttributeFilter, VectorIndexConfig};
//!
//! let config = VectorIndexConfig::new(768, "/path/to/store");
//! let index = open_vector_index(&config)?;
//!
//! index.upsert(&inserts)?;
//!
//! let filter = AttributeFilter::new().with("week", 3);
//! let results = index.query(&embedding, 10, Some(&filter))?;
//! ```

pub mod error;
pub mod vector;

pub use error::{DbError, DbResult};
