//! Core EmbeddingStore implementation

use eyre::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::similarity::{cosine_similarity, from_bytes, norm, to_bytes};

const DB_FILE: &str = "vectors.db";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS records (
    id          TEXT    PRIMARY KEY,
    index_text  TEXT    NOT NULL,
    content     TEXT    NOT NULL,
    metadata    TEXT    NOT NULL,
    embedding   BLOB    NOT NULL,
    dimensions  INTEGER NOT NULL,
    created_at  INTEGER NOT NULL
);
";

/// A record to insert or replace
#[derive(Debug, Clone)]
pub struct NewRecord {
    /// Caller-chosen id; writing the same id again replaces the record
    pub id: String,
    /// Text the embedding was computed from
    pub index_text: String,
    /// Payload returned with search hits
    pub content: String,
    /// Arbitrary JSON object used for filtering
    pub metadata: Value,
    pub embedding: Vec<f32>,
}

/// A stored record (without its embedding)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub index_text: String,
    pub content: String,
    pub metadata: Value,
    pub dimensions: usize,
    /// Creation timestamp (unix ms)
    pub created_at: i64,
}

/// A search hit
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRecord {
    pub record: Record,
    /// Cosine similarity, higher is closer
    pub score: f32,
}

/// Exact-match conditions on top-level metadata keys
#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub equals: BTreeMap<String, Value>,
}

impl Filter {
    /// Require `metadata[key] == value`
    pub fn eq(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.equals.insert(key.into(), value.into());
        self
    }

    pub fn matches(&self, metadata: &Value) -> bool {
        self.equals
            .iter()
            .all(|(key, expected)| metadata.get(key) == Some(expected))
    }
}

/// The main embedding store
pub struct EmbeddingStore {
    conn: Connection,
    base_path: PathBuf,
}

impl EmbeddingStore {
    /// Open or create an embedding store at the given directory
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path).context("Failed to create store directory")?;

        let db_path = base_path.join(DB_FILE);
        let conn = Connection::open(&db_path).context(format!("Failed to open database: {}", db_path.display()))?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.execute_batch(SCHEMA).context("Failed to initialize schema")?;

        debug!(?base_path, "Opened embedding store");
        Ok(Self { conn, base_path })
    }

    /// Directory backing this store
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Insert a record, replacing any record with the same id
    pub fn upsert(&self, record: &NewRecord) -> Result<()> {
        debug!(id = %record.id, dims = record.embedding.len(), "upsert: called");
        if record.embedding.is_empty() {
            return Err(eyre::eyre!("Record {} has an empty embedding", record.id));
        }

        let metadata = serde_json::to_string(&record.metadata)?;
        self.conn
            .execute(
                "INSERT INTO records (id, index_text, content, metadata, embedding, dimensions, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(id) DO UPDATE SET
                    index_text = excluded.index_text,
                    content = excluded.content,
                    metadata = excluded.metadata,
                    embedding = excluded.embedding,
                    dimensions = excluded.dimensions",
                params![
                    record.id,
                    record.index_text,
                    record.content,
                    metadata,
                    to_bytes(&record.embedding),
                    record.embedding.len() as i64,
                    chrono::Utc::now().timestamp_millis(),
                ],
            )
            .context(format!("Failed to write record: {}", record.id))?;

        info!(id = %record.id, "Stored record");
        Ok(())
    }

    /// Top `k` records by cosine similarity to `query`, best first
    ///
    /// Records with a different dimension than the query are skipped with a
    /// warning, as are records that fail the filter. A zero-norm query
    /// matches nothing.
    pub fn search(&self, query: &[f32], k: usize, filter: &Filter) -> Result<Vec<ScoredRecord>> {
        debug!(dims = query.len(), k, "search: called");
        if k == 0 || norm(query) == 0.0 {
            return Ok(vec![]);
        }

        let mismatched = self.count_dimension_mismatches(query.len())?;
        if mismatched > 0 {
            warn!(
                dims = query.len(),
                skipped = mismatched,
                "Skipping records embedded with a different dimension; was the embedder changed?"
            );
        }

        let mut stmt = self.conn.prepare(
            "SELECT id, index_text, content, metadata, dimensions, created_at, embedding
             FROM records WHERE dimensions = ?1",
        )?;
        let rows = stmt.query_map(params![query.len() as i64], |row| {
            let record = read_record(row)?;
            let blob: Vec<u8> = row.get(6)?;
            Ok((record, blob))
        })?;

        let mut scored = Vec::new();
        for row in rows {
            let (raw, blob) = row?;
            let record = raw.decode()?;
            if !filter.matches(&record.metadata) {
                continue;
            }
            let score = cosine_similarity(query, &from_bytes(&blob));
            scored.push(ScoredRecord { record, score });
        }

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        debug!(hits = scored.len(), "search: done");
        Ok(scored)
    }

    /// Number of records whose embedding dimension differs from `dims`
    pub fn count_dimension_mismatches(&self, dims: usize) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM records WHERE dimensions != ?1",
            params![dims as i64],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Fetch one record by id
    pub fn get(&self, id: &str) -> Result<Option<Record>> {
        let raw = self
            .conn
            .query_row(
                "SELECT id, index_text, content, metadata, dimensions, created_at FROM records WHERE id = ?1",
                params![id],
                read_record,
            )
            .optional()?;
        raw.map(RawRecord::decode).transpose()
    }

    /// All records, newest first
    pub fn list(&self, limit: Option<usize>) -> Result<Vec<Record>> {
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let mut stmt = self.conn.prepare(
            "SELECT id, index_text, content, metadata, dimensions, created_at
             FROM records ORDER BY created_at DESC, id ASC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit], read_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(RawRecord::decode).collect()
    }

    /// Number of stored records
    pub fn count(&self) -> Result<usize> {
        let n: i64 = self.conn.query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    /// Delete a record; returns whether it existed
    pub fn delete(&self, id: &str) -> Result<bool> {
        let removed = self.conn.execute("DELETE FROM records WHERE id = ?1", params![id])?;
        if removed > 0 {
            info!(id, "Deleted record");
        }
        Ok(removed > 0)
    }

    /// Delete every record; returns how many were removed
    pub fn clear(&self) -> Result<usize> {
        let removed = self.conn.execute("DELETE FROM records", [])?;
        info!(removed, "Cleared store");
        Ok(removed)
    }
}

struct RawRecord {
    id: String,
    index_text: String,
    content: String,
    metadata: String,
    dimensions: i64,
    created_at: i64,
}

impl RawRecord {
    fn decode(self) -> Result<Record> {
        let metadata =
            serde_json::from_str(&self.metadata).context(format!("Corrupt metadata for record: {}", self.id))?;
        Ok(Record {
            id: self.id,
            index_text: self.index_text,
            content: self.content,
            metadata,
            dimensions: self.dimensions as usize,
            created_at: self.created_at,
        })
    }
}

fn read_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRecord> {
    Ok(RawRecord {
        id: row.get(0)?,
        index_text: row.get(1)?,
        content: row.get(2)?,
        metadata: row.get(3)?,
        dimensions: row.get(4)?,
        created_at: row.get(5)?,
    })
}
