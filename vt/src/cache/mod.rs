//! Semantic cache
//!
//! `VectorStore` is the seam to the storage engine. `SemanticCache` sits on
//! top of it and owns the reuse policy: similarity direction, threshold,
//! exact-match detection and the feedback-notes annotation format.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

mod local;
mod semantic;

pub use local::LocalVectorStore;
pub use semantic::{
    ANNOTATION_SEPARATOR, CacheDecision, CacheEntry, Candidate, SemanticCache, annotate, entry_id, normalize_question,
    strip_annotation,
};
pub use vectorstore::Filter as MetadataFilter;

use crate::embed::EmbedError;

/// Vector store failures; never fatal to a session
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbedError),

    #[error("Vector store error: {0}")]
    Backend(String),

    #[error("Invalid cache document: {0}")]
    InvalidDocument(String),
}

/// A document as the vector store sees it
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    /// Text that is embedded and searched against (the question)
    pub index_text: String,
    /// Payload (the annotated answer)
    pub content: String,
    pub metadata: Value,
}

/// A search hit with its cosine similarity (higher is closer)
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDocument {
    pub document: Document,
    pub score: f32,
}

/// Storage engine behind the semantic cache
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Top `k` documents closest to `query`, best first
    async fn search(&self, query: &str, k: usize, filter: &MetadataFilter) -> Result<Vec<ScoredDocument>, StoreError>;

    /// Insert a document (replacing one with the same id)
    async fn add(&self, document: Document) -> Result<(), StoreError>;
}

/// Store used when the cache is disabled or unavailable: always empty, writes are dropped
pub struct NullVectorStore;

#[async_trait]
impl VectorStore for NullVectorStore {
    async fn search(
        &self,
        _query: &str,
        _k: usize,
        _filter: &MetadataFilter,
    ) -> Result<Vec<ScoredDocument>, StoreError> {
        Ok(vec![])
    }

    async fn add(&self, document: Document) -> Result<(), StoreError> {
        tracing::debug!(id = %document.id, "NullVectorStore::add: dropping document");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_null_store_is_empty() {
        let store = NullVectorStore;
        store
            .add(Document {
                id: "1".to_string(),
                index_text: "q".to_string(),
                content: "a".to_string(),
                metadata: json!({}),
            })
            .await
            .unwrap();
        assert!(store.search("q", 5, &MetadataFilter::default()).await.unwrap().is_empty());
    }
}
