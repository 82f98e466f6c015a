//! Vector store backed by the local `vectorstore` crate

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};
use vectorstore::{EmbeddingStore, NewRecord};

use super::{Document, MetadataFilter, ScoredDocument, StoreError, VectorStore};
use crate::embed::Embedder;

/// Embeds `Document::index_text` and keeps it in a local SQLite store
pub struct LocalVectorStore {
    embedder: Arc<dyn Embedder>,
    db: Mutex<EmbeddingStore>,
}

impl LocalVectorStore {
    pub fn open(dir: impl AsRef<Path>, embedder: Arc<dyn Embedder>) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        debug!(?dir, embedder = embedder.name(), "LocalVectorStore::open: called");
        let db = EmbeddingStore::open(dir).map_err(|e| StoreError::Backend(format!("{:#}", e)))?;
        info!(?dir, "Opened local vector store");
        Ok(Self {
            embedder,
            db: Mutex::new(db),
        })
    }
}

#[async_trait]
impl VectorStore for LocalVectorStore {
    async fn search(&self, query: &str, k: usize, filter: &MetadataFilter) -> Result<Vec<ScoredDocument>, StoreError> {
        debug!(%query, k, "LocalVectorStore::search: called");
        let embedding = self.embedder.embed(query).await?;
        let db = self.db.lock().await;
        let hits = db
            .search(&embedding, k, filter)
            .map_err(|e| StoreError::Backend(format!("{:#}", e)))?;

        Ok(hits
            .into_iter()
            .map(|hit| ScoredDocument {
                document: Document {
                    id: hit.record.id,
                    index_text: hit.record.index_text,
                    content: hit.record.content,
                    metadata: hit.record.metadata,
                },
                score: hit.score,
            })
            .collect())
    }

    async fn add(&self, document: Document) -> Result<(), StoreError> {
        debug!(id = %document.id, "LocalVectorStore::add: called");
        let embedding = self.embedder.embed(&document.index_text).await?;
        let record = NewRecord {
            id: document.id,
            index_text: document.index_text,
            content: document.content,
            metadata: document.metadata,
            embedding,
        };
        let db = self.db.lock().await;
        db.upsert(&record).map_err(|e| StoreError::Backend(format!("{:#}", e)))
    }
}
