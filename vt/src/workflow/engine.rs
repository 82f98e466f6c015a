//! WorkflowEngine - resumable question/feedback state machine
//!
//! Every node runs, checkpoints the session with the next pending node, and
//! hands over to that node. The run stops at `evaluate` when no verdict is
//! waiting (the interrupt point) or at `end`. Resuming loads the latest
//! checkpoint and continues from its pending node, so nothing that already
//! ran is executed again.

use std::sync::Arc;

use checkpointstore::Checkpoint;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::error::WorkflowError;
use crate::cache::{CacheDecision, CacheEntry, SemanticCache};
use crate::domain::{CacheMatch, Node, Provenance, Session, SessionPatch, SessionStatus};
use crate::responder::{GenerationError, Responder};
use crate::retry::{Decision, RetryController};
use crate::state::CheckpointManager;

/// Where a run stopped
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Suspended until a verdict is supplied through `resume`
    AwaitingFeedback(Session),
    Validated(Session),
    Exhausted(Session),
    Aborted { session: Session, reason: String },
}

impl Outcome {
    fn from_session(session: Session) -> Self {
        match session.status {
            SessionStatus::Validated => Outcome::Validated(session),
            SessionStatus::Exhausted => Outcome::Exhausted(session),
            SessionStatus::Aborted => {
                let reason = session.abort_reason.clone().unwrap_or_default();
                Outcome::Aborted { session, reason }
            }
            _ => Outcome::AwaitingFeedback(session),
        }
    }

    pub fn session(&self) -> &Session {
        match self {
            Outcome::AwaitingFeedback(s) | Outcome::Validated(s) | Outcome::Exhausted(s) => s,
            Outcome::Aborted { session, .. } => session,
        }
    }

    pub fn into_session(self) -> Session {
        match self {
            Outcome::AwaitingFeedback(s) | Outcome::Validated(s) | Outcome::Exhausted(s) => s,
            Outcome::Aborted { session, .. } => session,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Outcome::AwaitingFeedback(_))
    }
}

/// One line per known thread
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadSummary {
    pub thread_id: String,
    pub question: String,
    pub status: SessionStatus,
    pub attempt_count: u32,
    pub step: u64,
    pub pending_node: String,
    pub updated_at: i64,
}

impl From<Checkpoint<Session>> for ThreadSummary {
    fn from(checkpoint: Checkpoint<Session>) -> Self {
        Self {
            thread_id: checkpoint.thread_id,
            question: checkpoint.snapshot.question,
            status: checkpoint.snapshot.status,
            attempt_count: checkpoint.snapshot.attempt_count,
            step: checkpoint.step,
            pending_node: checkpoint.pending_node,
            updated_at: checkpoint.created_at,
        }
    }
}

/// What a node hands back to the run loop
enum Step {
    Next(Node),
    Suspend,
}

pub struct WorkflowEngine {
    checkpoints: CheckpointManager,
    responder: Arc<dyn Responder>,
    cache: SemanticCache,
    retry: RetryController,
}

impl WorkflowEngine {
    pub fn new(
        checkpoints: CheckpointManager,
        responder: Arc<dyn Responder>,
        cache: SemanticCache,
        retry: RetryController,
    ) -> Self {
        debug!(max_attempts = retry.max_attempts(), "WorkflowEngine::new: called");
        Self {
            checkpoints,
            responder,
            cache,
            retry,
        }
    }

    /// Create a session for `question` and run it to the first interrupt
    pub async fn start(&self, question: &str) -> Result<Outcome, WorkflowError> {
        debug!(%question, "start: called");
        let question = question.trim();
        if question.is_empty() {
            return Err(WorkflowError::EmptyQuestion);
        }

        let thread_id = Uuid::now_v7().to_string();
        let _lock = self.checkpoints.lock_thread(&thread_id).await?;

        let session = Session::new(&thread_id, question);
        self.checkpoints.save(&session, Node::Generate).await?;
        info!(%thread_id, "Started session");

        self.run(session, Node::Generate).await
    }

    /// Continue a thread, optionally merging a human verdict first
    ///
    /// Without a patch, a suspended session with no pending verdict and a
    /// terminal session are returned as they are and nothing is written.
    pub async fn resume(&self, thread_id: &str, patch: Option<SessionPatch>) -> Result<Outcome, WorkflowError> {
        debug!(%thread_id, has_patch = patch.is_some(), "resume: called");
        let _lock = self.checkpoints.lock_thread(thread_id).await?;

        if let Some(patch) = patch {
            let patched = self.checkpoints.apply_patch(thread_id, patch, Node::Evaluate).await?;
            info!(%thread_id, step = patched.step, "Applied human feedback");
            return self.run(patched.snapshot, Node::Evaluate).await;
        }

        let latest = self.checkpoints.load_latest(thread_id).await?;
        let session = latest.snapshot;
        if session.is_terminal() {
            debug!(%thread_id, status = %session.status, "resume: already terminal");
            return Ok(Outcome::from_session(session));
        }
        if session.status == SessionStatus::AwaitingFeedback && session.verdict.is_none() {
            debug!(%thread_id, "resume: still waiting for feedback");
            return Ok(Outcome::from_session(session));
        }

        let node: Node = latest
            .pending_node
            .parse()
            .map_err(|_| WorkflowError::UnknownNode(latest.pending_node.clone()))?;
        info!(%thread_id, %node, status = %session.status, "Resuming session");
        self.run(session, node).await
    }

    /// Latest snapshot of a thread
    pub async fn session(&self, thread_id: &str) -> Result<Session, WorkflowError> {
        debug!(%thread_id, "session: called");
        Ok(self.checkpoints.load_latest(thread_id).await?.snapshot)
    }

    /// Full checkpoint log of a thread in step order
    pub async fn history(&self, thread_id: &str) -> Result<Vec<Checkpoint<Session>>, WorkflowError> {
        debug!(%thread_id, "history: called");
        Ok(self.checkpoints.history(thread_id).await?)
    }

    /// Every known thread, most recently updated first
    pub async fn sessions(&self) -> Result<Vec<ThreadSummary>, WorkflowError> {
        debug!("sessions: called");
        let latest = self.checkpoints.list_latest().await?;
        Ok(latest.into_iter().map(ThreadSummary::from).collect())
    }

    /// Expand a unique thread id prefix to the full id
    pub async fn resolve_thread(&self, prefix: &str) -> Result<String, WorkflowError> {
        debug!(%prefix, "resolve_thread: called");
        let ids: Vec<String> = self
            .sessions()
            .await?
            .into_iter()
            .map(|s| s.thread_id)
            .filter(|id| id.starts_with(prefix))
            .collect();

        if let Some(exact) = ids.iter().find(|id| id.as_str() == prefix) {
            return Ok(exact.clone());
        }
        match ids.as_slice() {
            [] => Err(WorkflowError::NotFound(prefix.to_string())),
            [only] => Ok(only.clone()),
            _ => Err(WorkflowError::AmbiguousThread {
                prefix: prefix.to_string(),
                count: ids.len(),
            }),
        }
    }

    async fn run(&self, mut session: Session, mut node: Node) -> Result<Outcome, WorkflowError> {
        loop {
            debug!(thread_id = %session.thread_id, %node, status = %session.status, "run: node");
            let step = match node {
                Node::Generate => self.generate(&mut session).await?,
                Node::Evaluate => self.evaluate(&mut session).await?,
                Node::Regenerate => self.regenerate(&mut session).await?,
                Node::Save => self.save(&mut session).await?,
                Node::End => Step::Suspend,
            };
            match step {
                Step::Next(next) => node = next,
                Step::Suspend => {
                    info!(thread_id = %session.thread_id, status = %session.status, "Run stopped");
                    return Ok(Outcome::from_session(session));
                }
            }
        }
    }

    /// Checkpoint and move on to `next`
    async fn checkpoint(&self, session: &Session, next: Node) -> Result<Step, WorkflowError> {
        let step = self.checkpoints.save(session, next).await?;
        debug!(thread_id = %session.thread_id, step, %next, "checkpoint: saved");
        Ok(Step::Next(next))
    }

    async fn abort(&self, session: &mut Session, error: GenerationError) -> Result<Step, WorkflowError> {
        let reason = error.to_string();
        warn!(thread_id = %session.thread_id, question = %session.question, %reason, "Session aborted");
        session.transition(SessionStatus::Aborted)?;
        session.abort_reason = Some(reason);
        self.checkpoint(session, Node::End).await
    }

    async fn generate(&self, session: &mut Session) -> Result<Step, WorkflowError> {
        debug!(thread_id = %session.thread_id, "generate: called");
        session.transition(SessionStatus::Generating)?;

        let question = session.question.clone();
        let produced = match self.cache.lookup(&question).await {
            CacheDecision::Exact { candidate, response } => {
                session.provenance = Provenance::CacheExact;
                session.cache_match = Some(CacheMatch {
                    source_question: candidate.question,
                    score: candidate.score,
                });
                Ok(response)
            }
            CacheDecision::Adapt { candidate, response } => {
                let adapted = self.responder.adapt(&question, &candidate.question, &response).await;
                session.provenance = Provenance::CacheAdapted;
                session.cache_match = Some(CacheMatch {
                    source_question: candidate.question,
                    score: candidate.score,
                });
                adapted
            }
            CacheDecision::Miss => {
                session.provenance = Provenance::Generated;
                self.responder.generate(&question).await
            }
        };

        match produced {
            Ok(answer) => {
                session.record_answer(answer);
                session.transition(SessionStatus::AwaitingFeedback)?;
                info!(thread_id = %session.thread_id, provenance = %session.provenance, "Answer ready for review");
                self.checkpoint(session, Node::Evaluate).await
            }
            Err(e) => self.abort(session, e).await,
        }
    }

    async fn evaluate(&self, session: &mut Session) -> Result<Step, WorkflowError> {
        debug!(thread_id = %session.thread_id, "evaluate: called");
        let Some(verdict) = session.verdict.take() else {
            return Ok(Step::Suspend);
        };
        session.transition(SessionStatus::Evaluating)?;

        match self.retry.decide(session.attempt_count, verdict) {
            Decision::Save => {
                session.transition(SessionStatus::Saving)?;
                self.checkpoint(session, Node::Save).await
            }
            Decision::Regenerate => {
                session.feedback_notes = self.retry.feedback_or_placeholder(&session.feedback_notes);
                session.transition(SessionStatus::Regenerating)?;
                info!(thread_id = %session.thread_id, attempt = session.attempt_count, "Answer rejected, regenerating");
                self.checkpoint(session, Node::Regenerate).await
            }
            Decision::Exhaust => {
                session.transition(SessionStatus::Exhausted)?;
                info!(thread_id = %session.thread_id, attempts = session.attempt_count, "Attempt budget exhausted");
                self.checkpoint(session, Node::End).await
            }
        }
    }

    async fn regenerate(&self, session: &mut Session) -> Result<Step, WorkflowError> {
        debug!(thread_id = %session.thread_id, attempt = session.attempt_count, "regenerate: called");
        let result = self
            .responder
            .regenerate(&session.question, &session.feedback_notes, &session.previous_responses)
            .await;

        match result {
            Ok(answer) => {
                session.record_answer(answer);
                session.provenance = Provenance::Generated;
                session.transition(SessionStatus::AwaitingFeedback)?;
                self.checkpoint(session, Node::Evaluate).await
            }
            Err(e) => self.abort(session, e).await,
        }
    }

    async fn save(&self, session: &mut Session) -> Result<Step, WorkflowError> {
        debug!(thread_id = %session.thread_id, "save: called");
        let entry = CacheEntry {
            question: session.question.clone(),
            response: session.current_response.clone(),
            feedback_notes: session.feedback_notes.clone(),
            adapted_from: session.adapted_from().map(str::to_string),
        };

        if let Err(e) = self.cache.store(&session.thread_id, &entry).await {
            warn!(thread_id = %session.thread_id, error = %e, "Cache write failed, session still validated");
            session.warn(format!("Validated answer was not cached: {}", e));
        }

        session.transition(SessionStatus::Validated)?;
        info!(thread_id = %session.thread_id, "Session validated");
        self.checkpoint(session, Node::End).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::NullVectorStore;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::tempdir;

    /// Responder that returns numbered answers and counts calls
    #[derive(Default)]
    struct Counting {
        calls: Mutex<Vec<&'static str>>,
    }

    #[async_trait]
    impl Responder for Counting {
        async fn generate(&self, _question: &str) -> Result<String, GenerationError> {
            self.calls.lock().unwrap().push("generate");
            Ok("answer 1".to_string())
        }

        async fn adapt(&self, _: &str, _: &str, _: &str) -> Result<String, GenerationError> {
            self.calls.lock().unwrap().push("adapt");
            Ok("adapted".to_string())
        }

        async fn regenerate(&self, _: &str, _: &str, previous: &[String]) -> Result<String, GenerationError> {
            self.calls.lock().unwrap().push("regenerate");
            Ok(format!("answer {}", previous.len() + 1))
        }
    }

    fn engine(dir: &std::path::Path, responder: Arc<Counting>) -> WorkflowEngine {
        let checkpoints = CheckpointManager::spawn(dir).unwrap();
        let cache = SemanticCache::new(Arc::new(NullVectorStore), 0.8, 2);
        WorkflowEngine::new(checkpoints, responder, cache, RetryController::default())
    }

    #[tokio::test]
    async fn test_start_suspends_for_feedback() {
        let temp = tempdir().unwrap();
        let engine = engine(temp.path(), Arc::new(Counting::default()));

        let outcome = engine.start("What is X?").await.unwrap();
        let session = outcome.session();
        assert!(matches!(outcome, Outcome::AwaitingFeedback(_)));
        assert_eq!(session.current_response, "answer 1");
        assert_eq!(session.attempt_count, 1);

        let history = engine.history(&session.thread_id).await.unwrap();
        let nodes: Vec<&str> = history.iter().map(|c| c.pending_node.as_str()).collect();
        assert_eq!(nodes, vec!["generate", "evaluate"]);
    }

    #[tokio::test]
    async fn test_empty_question_rejected() {
        let temp = tempdir().unwrap();
        let engine = engine(temp.path(), Arc::new(Counting::default()));
        assert!(matches!(engine.start("   ").await, Err(WorkflowError::EmptyQuestion)));
        assert!(engine.sessions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reject_then_approve() {
        let temp = tempdir().unwrap();
        let responder = Arc::new(Counting::default());
        let engine = engine(temp.path(), responder.clone());

        let id = engine.start("Q").await.unwrap().session().thread_id.clone();
        let outcome = engine
            .resume(&id, Some(SessionPatch::reject(Some("shorter".into()))))
            .await
            .unwrap();
        assert_eq!(outcome.session().current_response, "answer 2");
        assert_eq!(outcome.session().feedback_notes, "shorter");

        let outcome = engine.resume(&id, Some(SessionPatch::approve(None))).await.unwrap();
        assert!(matches!(outcome, Outcome::Validated(_)));
        assert_eq!(*responder.calls.lock().unwrap(), vec!["generate", "regenerate"]);
    }

    #[tokio::test]
    async fn test_resume_without_patch_writes_nothing() {
        let temp = tempdir().unwrap();
        let engine = engine(temp.path(), Arc::new(Counting::default()));
        let id = engine.start("Q").await.unwrap().session().thread_id.clone();

        let first = engine.resume(&id, None).await.unwrap();
        let second = engine.resume(&id, None).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(engine.history(&id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_resolve_thread_prefix() {
        let temp = tempdir().unwrap();
        let engine = engine(temp.path(), Arc::new(Counting::default()));
        let id = engine.start("Q").await.unwrap().session().thread_id.clone();

        assert_eq!(engine.resolve_thread(&id[..13]).await.unwrap(), id);
        assert!(matches!(
            engine.resolve_thread("zzz").await,
            Err(WorkflowError::NotFound(_))
        ));
    }
}
