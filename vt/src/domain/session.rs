//! Session domain type
//!
//! One session per question. The whole struct is the checkpoint snapshot, so
//! every field here survives a suspend/resume.

use checkpointstore::now_ms;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Session status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Created, nothing run yet
    #[default]
    Init,
    /// Cache lookup and answer production in progress
    Generating,
    /// Suspended until a human verdict arrives
    AwaitingFeedback,
    /// Consuming the verdict
    Evaluating,
    /// Producing a new answer from feedback
    Regenerating,
    /// Writing the approved answer to the cache
    Saving,
    /// Approved (terminal)
    Validated,
    /// Attempt budget spent (terminal)
    Exhausted,
    /// Generation failed (terminal)
    Aborted,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Validated | Self::Exhausted | Self::Aborted)
    }

    /// Whether the state machine allows `self -> to`
    pub fn can_transition_to(&self, to: SessionStatus) -> bool {
        use SessionStatus::*;
        matches!(
            (self, to),
            (Init, Generating)
                | (Generating, AwaitingFeedback)
                | (Generating, Aborted)
                | (AwaitingFeedback, Evaluating)
                | (Evaluating, Saving)
                | (Evaluating, Regenerating)
                | (Evaluating, Exhausted)
                | (Regenerating, AwaitingFeedback)
                | (Regenerating, Aborted)
                | (Saving, Validated)
        )
    }

    /// Every allowed transition, in table order
    pub fn transitions() -> Vec<(SessionStatus, SessionStatus)> {
        use SessionStatus::*;
        let all = [
            Init,
            Generating,
            AwaitingFeedback,
            Evaluating,
            Regenerating,
            Saving,
            Validated,
            Exhausted,
            Aborted,
        ];
        all.iter()
            .flat_map(|from| all.iter().map(move |to| (*from, *to)))
            .filter(|(from, to)| from.can_transition_to(*to))
            .collect()
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Init => "init",
            Self::Generating => "generating",
            Self::AwaitingFeedback => "awaiting_feedback",
            Self::Evaluating => "evaluating",
            Self::Regenerating => "regenerating",
            Self::Saving => "saving",
            Self::Validated => "validated",
            Self::Exhausted => "exhausted",
            Self::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// Where the current answer came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    #[default]
    Generated,
    CacheExact,
    CacheAdapted,
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Generated => "generated",
            Self::CacheExact => "cache (exact)",
            Self::CacheAdapted => "cache (adapted)",
        };
        f.write_str(s)
    }
}

/// Cached question the current answer was taken or adapted from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMatch {
    pub source_question: String,
    pub score: f32,
}

/// Human verdict on the current answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Approve,
    Reject,
}

/// Illegal status change
#[derive(Debug, Error, PartialEq)]
#[error("Invalid transition: {from} -> {to}")]
pub struct TransitionError {
    pub from: SessionStatus,
    pub to: SessionStatus,
}

/// One question's trip through the workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub thread_id: String,

    pub question: String,

    pub status: SessionStatus,

    /// Answer currently shown to the human
    pub current_response: String,

    /// Every answer shown so far, oldest first
    pub previous_responses: Vec<String>,

    /// Answers produced so far (cached and adapted answers count)
    pub attempt_count: u32,

    pub feedback_notes: String,

    pub provenance: Provenance,

    pub cache_match: Option<CacheMatch>,

    /// Verdict merged by the last patch, cleared once evaluated
    #[serde(default)]
    pub verdict: Option<Verdict>,

    /// Why the session was aborted
    #[serde(default)]
    pub abort_reason: Option<String>,

    /// Degraded-path notices
    #[serde(default)]
    pub warnings: Vec<String>,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,

    /// Last update timestamp (Unix milliseconds)
    pub updated_at: i64,
}

impl Session {
    pub fn new(thread_id: impl Into<String>, question: impl Into<String>) -> Self {
        let thread_id = thread_id.into();
        let question = question.into();
        debug!(%thread_id, %question, "Session::new: called");
        let now = now_ms();
        Self {
            thread_id,
            question,
            status: SessionStatus::Init,
            current_response: String::new(),
            previous_responses: Vec::new(),
            attempt_count: 0,
            feedback_notes: String::new(),
            provenance: Provenance::Generated,
            cache_match: None,
            verdict: None,
            abort_reason: None,
            warnings: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move to `to` if the state machine allows it
    pub fn transition(&mut self, to: SessionStatus) -> Result<(), TransitionError> {
        debug!(thread_id = %self.thread_id, from = %self.status, %to, "transition: called");
        if !self.status.can_transition_to(to) {
            return Err(TransitionError { from: self.status, to });
        }
        self.status = to;
        self.touch();
        Ok(())
    }

    /// Show a new answer; counts as one attempt
    pub fn record_answer(&mut self, response: impl Into<String>) {
        let response = response.into();
        self.previous_responses.push(response.clone());
        self.current_response = response;
        self.attempt_count += 1;
        self.touch();
        debug!(thread_id = %self.thread_id, attempt = self.attempt_count, "record_answer: recorded");
    }

    /// Cached question this answer was adapted from, if any
    pub fn adapted_from(&self) -> Option<&str> {
        match (self.provenance, &self.cache_match) {
            (Provenance::CacheAdapted, Some(m)) => Some(&m.source_question),
            _ => None,
        }
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = now_ms();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session() {
        let session = Session::new("t1", "What is X?");
        assert_eq!(session.status, SessionStatus::Init);
        assert_eq!(session.attempt_count, 0);
        assert!(session.previous_responses.is_empty());
        assert!(!session.is_terminal());
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut s = Session::new("t1", "Q");
        s.transition(SessionStatus::Generating).unwrap();
        s.transition(SessionStatus::AwaitingFeedback).unwrap();
        s.transition(SessionStatus::Evaluating).unwrap();
        s.transition(SessionStatus::Saving).unwrap();
        s.transition(SessionStatus::Validated).unwrap();
        assert!(s.is_terminal());
    }

    #[test]
    fn test_terminal_is_immutable() {
        for terminal in [SessionStatus::Validated, SessionStatus::Exhausted, SessionStatus::Aborted] {
            let mut s = Session::new("t1", "Q");
            s.status = terminal;
            for (_, to) in SessionStatus::transitions() {
                assert!(s.transition(to).is_err());
            }
            assert_eq!(s.status, terminal);
        }
    }

    #[test]
    fn test_skipping_states_is_rejected() {
        let mut s = Session::new("t1", "Q");
        assert_eq!(
            s.transition(SessionStatus::AwaitingFeedback),
            Err(TransitionError {
                from: SessionStatus::Init,
                to: SessionStatus::AwaitingFeedback
            })
        );

        s.status = SessionStatus::AwaitingFeedback;
        assert!(s.transition(SessionStatus::Saving).is_err());
        assert!(s.transition(SessionStatus::Regenerating).is_err());
    }

    #[test]
    fn test_transition_table_size() {
        assert_eq!(SessionStatus::transitions().len(), 10);
    }

    #[test]
    fn test_record_answer_counts_attempts() {
        let mut s = Session::new("t1", "Q");
        s.record_answer("a1");
        s.record_answer("a2");
        assert_eq!(s.attempt_count, 2);
        assert_eq!(s.current_response, "a2");
        assert_eq!(s.previous_responses, vec!["a1", "a2"]);
    }

    #[test]
    fn test_adapted_from_only_for_adapted() {
        let mut s = Session::new("t1", "Q");
        s.cache_match = Some(CacheMatch {
            source_question: "P".to_string(),
            score: 0.9,
        });
        s.provenance = Provenance::CacheExact;
        assert_eq!(s.adapted_from(), None);
        s.provenance = Provenance::CacheAdapted;
        assert_eq!(s.adapted_from(), Some("P"));
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_value(SessionStatus::AwaitingFeedback).unwrap();
        assert_eq!(json, "awaiting_feedback");
        let json = serde_json::to_value(Provenance::CacheAdapted).unwrap();
        assert_eq!(json, "cache_adapted");
    }
}
