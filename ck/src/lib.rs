//! CheckpointStore - append-only checkpoint log for resumable workflows
//!
//! Every workflow thread owns a monotonically increasing sequence of
//! checkpoints. Each checkpoint is an immutable snapshot of the thread's state
//! plus the id of the node that should run next. Records are only ever
//! appended; the latest step is the current state.
//!
//! # Architecture
//!
//! ```text
//! {store_dir}/
//! ├── checkpoints.db      # SQLite: (thread_id, step) -> snapshot JSON
//! └── locks/
//!     └── {thread_id}.lock  # advisory lock held while a thread is running
//! ```
//!
//! # Example
//!
//! ```ignore
//! use checkpointstore::CheckpointStore;
//!
//! let mut store = CheckpointStore::open(".checkpoints")?;
//! let step = store.save("thread-1", &snapshot, "generate")?;
//! let latest: Checkpoint<MyState> = store.load_latest("thread-1")?;
//! ```

pub mod cli;
pub mod config;
mod error;
mod lock;
mod store;

pub use error::{CheckpointError, Result};
pub use lock::ThreadLock;
pub use store::{Checkpoint, CheckpointStore, Patch};

/// Current time as Unix milliseconds
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
