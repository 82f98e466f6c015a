//! Reuse policy over a `VectorStore`
//!
//! Scores are cosine similarity: higher means more similar, and a candidate is
//! accepted iff `score >= threshold`. Only the best accepted candidate is
//! considered.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{Document, MetadataFilter, StoreError, VectorStore};

/// Separates an answer from the feedback notes appended when it was validated
pub const ANNOTATION_SEPARATOR: &str = "\n\n---\nAdditional notes:";

/// A validated answer to persist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub question: String,
    pub response: String,
    pub feedback_notes: String,
    pub adapted_from: Option<String>,
}

/// A ranked search result
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub question: String,
    /// Stored answer text, annotation included
    pub response: String,
    pub score: f32,
}

/// What to do with a question given the cache contents
#[derive(Debug, Clone, PartialEq)]
pub enum CacheDecision {
    /// Same question; reuse `response` verbatim
    Exact { candidate: Candidate, response: String },
    /// Similar question; adapt `response` (annotation already stripped)
    Adapt { candidate: Candidate, response: String },
    /// Nothing usable; generate from scratch
    Miss,
}

/// Case-insensitive, surrounding-whitespace-insensitive form used for exact matching
pub fn normalize_question(question: &str) -> String {
    question.trim().to_lowercase()
}

/// Append the feedback-notes block when there are notes
pub fn annotate(response: &str, feedback_notes: &str) -> String {
    let notes = feedback_notes.trim();
    if notes.is_empty() {
        response.to_string()
    } else {
        format!("{}{} {}", response, ANNOTATION_SEPARATOR, notes)
    }
}

/// Drop everything from the first annotation separator onward
pub fn strip_annotation(text: &str) -> &str {
    match text.find(ANNOTATION_SEPARATOR) {
        Some(idx) => &text[..idx],
        None => text,
    }
}

/// Cache entry id for a thread
///
/// Deterministic, so writing the same thread's answer twice replaces the
/// first write.
pub fn entry_id(thread_id: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, thread_id.as_bytes()).to_string()
}

/// Semantic cache client
pub struct SemanticCache {
    store: Arc<dyn VectorStore>,
    threshold: f32,
    top_k: usize,
}

impl SemanticCache {
    pub fn new(store: Arc<dyn VectorStore>, threshold: f32, top_k: usize) -> Self {
        debug!(%threshold, %top_k, "SemanticCache::new: called");
        Self {
            store,
            threshold,
            top_k: top_k.max(1),
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Ranked validated candidates, best first
    ///
    /// A failing store is logged and treated as an empty cache.
    pub async fn search(&self, question: &str) -> Vec<Candidate> {
        debug!(%question, top_k = self.top_k, "search: called");
        let filter = MetadataFilter::default().eq("validated", true);
        let hits = match self.store.search(question, self.top_k, &filter).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "Cache search failed, continuing without cache");
                return vec![];
            }
        };

        let mut candidates: Vec<Candidate> = hits
            .into_iter()
            .map(|hit| {
                let question = hit
                    .document
                    .metadata
                    .get("question")
                    .and_then(|q| q.as_str())
                    .map(str::to_string)
                    .unwrap_or(hit.document.index_text);
                Candidate {
                    question,
                    response: hit.document.content,
                    score: hit.score,
                }
            })
            .collect();
        candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        debug!(count = candidates.len(), "search: candidates");
        candidates
    }

    /// Decide between exact reuse, adaptation and generation
    pub fn classify(&self, question: &str, candidates: &[Candidate]) -> CacheDecision {
        debug!(%question, count = candidates.len(), "classify: called");
        let Some(best) = candidates.iter().find(|c| c.score >= self.threshold) else {
            debug!(threshold = self.threshold, "classify: no candidate above threshold");
            return CacheDecision::Miss;
        };

        let response = strip_annotation(&best.response).to_string();
        if normalize_question(&best.question) == normalize_question(question) {
            info!(score = best.score, "Cache hit: identical question");
            CacheDecision::Exact {
                candidate: best.clone(),
                response,
            }
        } else {
            info!(score = best.score, source = %best.question, "Cache hit: similar question");
            CacheDecision::Adapt {
                candidate: best.clone(),
                response,
            }
        }
    }

    /// Search and classify in one step
    pub async fn lookup(&self, question: &str) -> CacheDecision {
        let candidates = self.search(question).await;
        self.classify(question, &candidates)
    }

    /// Persist a validated answer for `thread_id`
    pub async fn store(&self, thread_id: &str, entry: &CacheEntry) -> Result<(), StoreError> {
        debug!(%thread_id, question = %entry.question, "store: called");
        if entry.question.trim().is_empty() {
            return Err(StoreError::InvalidDocument("empty question".to_string()));
        }

        let document = Document {
            id: entry_id(thread_id),
            index_text: entry.question.clone(),
            content: annotate(&entry.response, &entry.feedback_notes),
            metadata: json!({
                "question": entry.question,
                "validated": true,
                "feedback_notes": entry.feedback_notes,
                "adapted_from": entry.adapted_from,
                "thread_id": thread_id,
                "created_at": chrono::Utc::now().timestamp_millis(),
            }),
        };
        self.store.add(document).await?;
        info!(%thread_id, "Stored validated answer");
        Ok(())
    }
}
