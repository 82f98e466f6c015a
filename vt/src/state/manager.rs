//! CheckpointManager - actor that owns the CheckpointStore
//!
//! Processes commands via channels for thread-safe access to checkpoints.

use std::path::Path;

use checkpointstore::{Checkpoint, CheckpointStore, ThreadLock};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use super::messages::{CheckpointCommand, StateError, StateResponse};
use crate::domain::{Node, Session, SessionPatch};

/// Handle to send commands to the CheckpointManager
#[derive(Clone)]
pub struct CheckpointManager {
    tx: mpsc::Sender<CheckpointCommand>,
}

impl CheckpointManager {
    /// Spawn a new CheckpointManager actor
    pub fn spawn(store_path: impl AsRef<Path>) -> eyre::Result<Self> {
        debug!(store_path = %store_path.as_ref().display(), "spawn: called");
        let store = CheckpointStore::open(store_path.as_ref())?;

        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(actor_loop(store, rx));

        info!("CheckpointManager spawned");
        Ok(Self { tx })
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<StateResponse<T>>) -> CheckpointCommand,
    ) -> StateResponse<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(make(reply_tx))
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    /// Append a checkpoint for the session's thread
    pub async fn save(&self, session: &Session, pending: Node) -> StateResponse<u64> {
        debug!(thread_id = %session.thread_id, status = %session.status, %pending, "save: called");
        self.request(|reply| CheckpointCommand::Save {
            session: Box::new(session.clone()),
            pending_node: pending.as_str().to_string(),
            reply,
        })
        .await
    }

    /// Latest checkpoint of a thread
    pub async fn load_latest(&self, thread_id: &str) -> StateResponse<Checkpoint<Session>> {
        debug!(%thread_id, "load_latest: called");
        self.request(|reply| CheckpointCommand::LoadLatest {
            thread_id: thread_id.to_string(),
            reply,
        })
        .await
    }

    /// Merge human feedback into the latest checkpoint, recorded as `as_node`
    pub async fn apply_patch(
        &self,
        thread_id: &str,
        patch: SessionPatch,
        as_node: Node,
    ) -> StateResponse<Checkpoint<Session>> {
        debug!(%thread_id, %as_node, "apply_patch: called");
        self.request(|reply| CheckpointCommand::ApplyPatch {
            thread_id: thread_id.to_string(),
            patch,
            as_node: as_node.as_str().to_string(),
            reply,
        })
        .await
    }

    /// All checkpoints of a thread in step order
    pub async fn history(&self, thread_id: &str) -> StateResponse<Vec<Checkpoint<Session>>> {
        debug!(%thread_id, "history: called");
        self.request(|reply| CheckpointCommand::History {
            thread_id: thread_id.to_string(),
            reply,
        })
        .await
    }

    /// Latest checkpoint of every thread, most recent first
    pub async fn list_latest(&self) -> StateResponse<Vec<Checkpoint<Session>>> {
        debug!("list_latest: called");
        self.request(|reply| CheckpointCommand::ListLatest { reply }).await
    }

    /// Take the exclusive run lock for a thread
    pub async fn lock_thread(&self, thread_id: &str) -> StateResponse<ThreadLock> {
        debug!(%thread_id, "lock_thread: called");
        self.request(|reply| CheckpointCommand::LockThread {
            thread_id: thread_id.to_string(),
            reply,
        })
        .await
    }

    /// Shutdown the CheckpointManager
    pub async fn shutdown(&self) -> Result<(), StateError> {
        debug!("shutdown: called");
        self.tx
            .send(CheckpointCommand::Shutdown)
            .await
            .map_err(|_| StateError::ChannelError)
    }
}

/// The actor loop that processes commands
async fn actor_loop(mut store: CheckpointStore, mut rx: mpsc::Receiver<CheckpointCommand>) {
    debug!("CheckpointManager actor started");

    while let Some(cmd) = rx.recv().await {
        match cmd {
            CheckpointCommand::Save {
                session,
                pending_node,
                reply,
            } => {
                debug!(thread_id = %session.thread_id, %pending_node, "actor_loop: Save command");
                let result = store
                    .save(&session.thread_id, session.as_ref(), &pending_node)
                    .map_err(StateError::from);
                let _ = reply.send(result);
            }

            CheckpointCommand::LoadLatest { thread_id, reply } => {
                debug!(%thread_id, "actor_loop: LoadLatest command");
                let result = store.load_latest(&thread_id).map_err(StateError::from);
                let _ = reply.send(result);
            }

            CheckpointCommand::ApplyPatch {
                thread_id,
                patch,
                as_node,
                reply,
            } => {
                debug!(%thread_id, %as_node, "actor_loop: ApplyPatch command");
                let result = store
                    .apply_patch::<Session, SessionPatch>(&thread_id, &patch, &as_node)
                    .map_err(StateError::from);
                let _ = reply.send(result);
            }

            CheckpointCommand::History { thread_id, reply } => {
                debug!(%thread_id, "actor_loop: History command");
                let result = store.history(&thread_id).map_err(StateError::from);
                let _ = reply.send(result);
            }

            CheckpointCommand::ListLatest { reply } => {
                debug!("actor_loop: ListLatest command");
                let result = store.latest_per_thread().map_err(StateError::from);
                let _ = reply.send(result);
            }

            CheckpointCommand::LockThread { thread_id, reply } => {
                debug!(%thread_id, "actor_loop: LockThread command");
                let result = store.lock_thread(&thread_id).map_err(StateError::from);
                let _ = reply.send(result);
            }

            CheckpointCommand::Shutdown => {
                debug!("actor_loop: Shutdown command");
                info!("CheckpointManager shutting down");
                break;
            }
        }
    }

    debug!("CheckpointManager actor stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SessionStatus, Verdict};
    use tempfile::tempdir;

    fn awaiting(thread_id: &str) -> Session {
        let mut session = Session::new(thread_id, "What is X?");
        session.status = SessionStatus::AwaitingFeedback;
        session.record_answer("X is a letter.");
        session
    }

    #[tokio::test]
    async fn test_save_and_load_latest() {
        let temp = tempdir().unwrap();
        let manager = CheckpointManager::spawn(temp.path()).unwrap();

        let session = Session::new("t1", "What is X?");
        assert_eq!(manager.save(&session, Node::Generate).await.unwrap(), 1);
        let session = awaiting("t1");
        assert_eq!(manager.save(&session, Node::Evaluate).await.unwrap(), 2);

        let latest = manager.load_latest("t1").await.unwrap();
        assert_eq!(latest.step, 2);
        assert_eq!(latest.pending_node, "evaluate");
        assert_eq!(latest.snapshot, session);

        manager.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_load_unknown_thread() {
        let temp = tempdir().unwrap();
        let manager = CheckpointManager::spawn(temp.path()).unwrap();

        assert!(matches!(
            manager.load_latest("nope").await,
            Err(StateError::NotFound(id)) if id == "nope"
        ));
    }

    #[tokio::test]
    async fn test_apply_patch_appends_step() {
        let temp = tempdir().unwrap();
        let manager = CheckpointManager::spawn(temp.path()).unwrap();
        manager.save(&awaiting("t1"), Node::Evaluate).await.unwrap();

        let patched = manager
            .apply_patch("t1", SessionPatch::reject(Some("shorter".to_string())), Node::Evaluate)
            .await
            .unwrap();
        assert_eq!(patched.step, 2);
        assert_eq!(patched.snapshot.verdict, Some(Verdict::Reject));

        let history = manager.history("t1").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].snapshot.verdict, None);
    }

    #[tokio::test]
    async fn test_apply_patch_rejected_on_terminal() {
        let temp = tempdir().unwrap();
        let manager = CheckpointManager::spawn(temp.path()).unwrap();
        let mut session = awaiting("t1");
        session.status = SessionStatus::Validated;
        manager.save(&session, Node::End).await.unwrap();

        assert!(matches!(
            manager.apply_patch("t1", SessionPatch::approve(None), Node::Evaluate).await,
            Err(StateError::PatchRejected(_))
        ));
        assert_eq!(manager.history("t1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_lock_thread_contention() {
        let temp = tempdir().unwrap();
        let manager = CheckpointManager::spawn(temp.path()).unwrap();

        let lock = manager.lock_thread("t1").await.unwrap();
        assert!(matches!(manager.lock_thread("t1").await, Err(StateError::Busy(_))));
        drop(lock);
        assert!(manager.lock_thread("t1").await.is_ok());
    }

    #[tokio::test]
    async fn test_list_latest() {
        let temp = tempdir().unwrap();
        let manager = CheckpointManager::spawn(temp.path()).unwrap();
        manager.save(&Session::new("a", "Q1"), Node::Generate).await.unwrap();
        manager.save(&Session::new("b", "Q2"), Node::Generate).await.unwrap();
        manager.save(&awaiting("a"), Node::Evaluate).await.unwrap();

        let latest = manager.list_latest().await.unwrap();
        assert_eq!(latest.len(), 2);
        let a = latest.iter().find(|c| c.thread_id == "a").unwrap();
        assert_eq!(a.step, 2);
    }
}
