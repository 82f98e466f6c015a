//! VectorStore - embedded vector store for small semantic caches
//!
//! Records carry the text that was embedded, an opaque content payload, JSON
//! metadata and the embedding itself. Search is a brute-force cosine scan,
//! which is plenty for caches of a few thousand entries and needs no SQLite
//! extension.
//!
//! # Architecture
//!
//! ```text
//! {store_dir}/
//! └── vectors.db      # SQLite: id -> (index_text, content, metadata, embedding blob)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use vectorstore::{EmbeddingStore, Filter, NewRecord};
//!
//! let store = EmbeddingStore::open(".vectors")?;
//! store.upsert(&NewRecord { id, index_text, content, metadata, embedding })?;
//! let hits = store.search(&query_embedding, 2, &Filter::default())?;
//! ```

pub mod cli;
pub mod config;
mod similarity;
mod store;

pub use similarity::cosine_similarity;
pub use store::{EmbeddingStore, Filter, NewRecord, Record, ScoredRecord};
