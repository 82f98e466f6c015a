//! Core CheckpointStore implementation

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{CheckpointError, Result};
use crate::lock::ThreadLock;
use crate::now_ms;

const DB_FILE: &str = "checkpoints.db";
const LOCK_DIR: &str = "locks";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS checkpoints (
    thread_id    TEXT    NOT NULL,
    step         INTEGER NOT NULL,
    pending_node TEXT    NOT NULL,
    snapshot     TEXT    NOT NULL,
    created_at   INTEGER NOT NULL,
    PRIMARY KEY (thread_id, step)
);
";

/// Out-of-band merge into a stored snapshot
///
/// Implemented by the caller's typed patch. Returning `Err` refuses the merge
/// and nothing is written.
pub trait Patch<S> {
    fn apply_to(&self, snapshot: &mut S) -> std::result::Result<(), String>;
}

/// One immutable record in a thread's log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint<S> {
    /// Thread this checkpoint belongs to
    pub thread_id: String,

    /// Position in the thread's log (1-indexed, strictly increasing)
    pub step: u64,

    /// Node to execute when the thread continues
    pub pending_node: String,

    /// State snapshot
    pub snapshot: S,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,
}

/// Undecoded row
struct RawCheckpoint {
    thread_id: String,
    step: i64,
    pending_node: String,
    snapshot: String,
    created_at: i64,
}

impl RawCheckpoint {
    fn decode<S: DeserializeOwned>(self) -> Result<Checkpoint<S>> {
        Ok(Checkpoint {
            thread_id: self.thread_id,
            step: self.step as u64,
            pending_node: self.pending_node,
            snapshot: serde_json::from_str(&self.snapshot)?,
            created_at: self.created_at,
        })
    }
}

/// The main checkpoint store
pub struct CheckpointStore {
    conn: Connection,
    base_path: PathBuf,
}

impl CheckpointStore {
    /// Open or create a checkpoint store at the given directory
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();
        debug!(?base_path, "CheckpointStore::open: called");
        fs::create_dir_all(&base_path)?;
        fs::create_dir_all(base_path.join(LOCK_DIR))?;

        let conn = Connection::open(base_path.join(DB_FILE))?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.execute_batch(SCHEMA)?;

        info!(?base_path, "Opened checkpoint store");
        Ok(Self { conn, base_path })
    }

    /// Directory backing this store
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Append a new checkpoint and return its step
    pub fn save<S: Serialize>(&mut self, thread_id: &str, snapshot: &S, pending_node: &str) -> Result<u64> {
        debug!(%thread_id, %pending_node, "save: called");
        validate_thread_id(thread_id)?;
        let json = serde_json::to_string(snapshot)?;

        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let step = append(&tx, thread_id, pending_node, &json, now_ms())?;
        tx.commit()?;

        debug!(%thread_id, step, "save: appended");
        Ok(step)
    }

    /// Load the checkpoint with the highest step
    pub fn load_latest<S: DeserializeOwned>(&self, thread_id: &str) -> Result<Checkpoint<S>> {
        debug!(%thread_id, "load_latest: called");
        latest_row(&self.conn, thread_id)?
            .ok_or_else(|| CheckpointError::NotFound(thread_id.to_string()))?
            .decode()
    }

    /// Load a specific step of a thread
    pub fn load_step<S: DeserializeOwned>(&self, thread_id: &str, step: u64) -> Result<Checkpoint<S>> {
        debug!(%thread_id, step, "load_step: called");
        self.conn
            .query_row(
                "SELECT thread_id, step, pending_node, snapshot, created_at
                 FROM checkpoints WHERE thread_id = ?1 AND step = ?2",
                params![thread_id, step as i64],
                read_row,
            )
            .optional()?
            .ok_or_else(|| CheckpointError::NotFound(format!("{}@{}", thread_id, step)))?
            .decode()
    }

    /// Merge a patch into the latest snapshot and append the result
    ///
    /// The read, the merge and the append happen in one immediate transaction,
    /// so no other writer can slip a step in between.
    pub fn apply_patch<S, P>(&mut self, thread_id: &str, patch: &P, as_node: &str) -> Result<Checkpoint<S>>
    where
        S: Serialize + DeserializeOwned,
        P: Patch<S>,
    {
        debug!(%thread_id, %as_node, "apply_patch: called");
        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let row = latest_row(&tx, thread_id)?.ok_or_else(|| CheckpointError::NotFound(thread_id.to_string()))?;
        let mut snapshot: S = serde_json::from_str(&row.snapshot)?;
        patch.apply_to(&mut snapshot).map_err(|reason| {
            debug!(%thread_id, %reason, "apply_patch: patch refused");
            CheckpointError::PatchRejected(reason)
        })?;

        let json = serde_json::to_string(&snapshot)?;
        let created_at = now_ms();
        let step = append(&tx, thread_id, as_node, &json, created_at)?;
        tx.commit()?;

        info!(%thread_id, step, %as_node, "Applied patch");
        Ok(Checkpoint {
            thread_id: thread_id.to_string(),
            step,
            pending_node: as_node.to_string(),
            snapshot,
            created_at,
        })
    }

    /// All checkpoints of a thread in step order
    pub fn history<S: DeserializeOwned>(&self, thread_id: &str) -> Result<Vec<Checkpoint<S>>> {
        debug!(%thread_id, "history: called");
        let mut stmt = self.conn.prepare(
            "SELECT thread_id, step, pending_node, snapshot, created_at
             FROM checkpoints WHERE thread_id = ?1 ORDER BY step ASC",
        )?;
        let rows = stmt
            .query_map(params![thread_id], read_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        if rows.is_empty() {
            debug!(%thread_id, "history: no checkpoints");
            return Err(CheckpointError::NotFound(thread_id.to_string()));
        }

        rows.into_iter().map(RawCheckpoint::decode).collect()
    }

    /// Latest checkpoint of every thread, most recently updated first
    pub fn latest_per_thread<S: DeserializeOwned>(&self) -> Result<Vec<Checkpoint<S>>> {
        debug!("latest_per_thread: called");
        let mut stmt = self.conn.prepare(
            "SELECT c.thread_id, c.step, c.pending_node, c.snapshot, c.created_at
             FROM checkpoints c
             JOIN (SELECT thread_id, MAX(step) AS max_step FROM checkpoints GROUP BY thread_id) m
               ON c.thread_id = m.thread_id AND c.step = m.max_step
             ORDER BY c.created_at DESC, c.thread_id ASC",
        )?;
        let rows = stmt.query_map([], read_row)?.collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(RawCheckpoint::decode).collect()
    }

    /// Delete every checkpoint of a thread and its lock file (administrative)
    ///
    /// Fails with `Busy` while a run holds the thread.
    pub fn delete_thread(&mut self, thread_id: &str) -> Result<usize> {
        debug!(%thread_id, "delete_thread: called");
        let lock = self.lock_thread(thread_id)?;
        let removed = self
            .conn
            .execute("DELETE FROM checkpoints WHERE thread_id = ?1", params![thread_id])?;
        match fs::remove_file(lock.path()) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(CheckpointError::Io(e)),
        }
        if removed == 0 {
            return Err(CheckpointError::NotFound(thread_id.to_string()));
        }
        info!(%thread_id, removed, "Deleted thread checkpoints");
        Ok(removed)
    }

    /// Take the exclusive run lock for a thread
    pub fn lock_thread(&self, thread_id: &str) -> Result<ThreadLock> {
        debug!(%thread_id, "lock_thread: called");
        validate_thread_id(thread_id)?;
        ThreadLock::try_acquire(&self.base_path.join(LOCK_DIR), thread_id)
    }
}

fn validate_thread_id(thread_id: &str) -> Result<()> {
    let valid = !thread_id.is_empty()
        && thread_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(CheckpointError::InvalidThreadId(thread_id.to_string()))
    }
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawCheckpoint> {
    Ok(RawCheckpoint {
        thread_id: row.get(0)?,
        step: row.get(1)?,
        pending_node: row.get(2)?,
        snapshot: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn latest_row(conn: &Connection, thread_id: &str) -> Result<Option<RawCheckpoint>> {
    let row = conn
        .query_row(
            "SELECT thread_id, step, pending_node, snapshot, created_at
             FROM checkpoints WHERE thread_id = ?1 ORDER BY step DESC LIMIT 1",
            params![thread_id],
            read_row,
        )
        .optional()?;
    Ok(row)
}

fn append(conn: &Connection, thread_id: &str, pending_node: &str, snapshot: &str, created_at: i64) -> Result<u64> {
    let current: Option<i64> = conn.query_row(
        "SELECT MAX(step) FROM checkpoints WHERE thread_id = ?1",
        params![thread_id],
        |row| row.get(0),
    )?;
    let step = current.unwrap_or(0) + 1;
    conn.execute(
        "INSERT INTO checkpoints (thread_id, step, pending_node, snapshot, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![thread_id, step, pending_node, snapshot, created_at],
    )?;
    Ok(step as u64)
}
