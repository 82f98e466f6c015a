//! Human feedback patch
//!
//! The only out-of-band change a session accepts. Unknown keys are rejected
//! at deserialization and the target session is checked before merging.

use checkpointstore::Patch;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Session, SessionStatus, Verdict};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionPatch {
    pub verdict: Verdict,
    #[serde(default)]
    pub feedback_notes: Option<String>,
}

impl SessionPatch {
    pub fn approve(notes: Option<String>) -> Self {
        Self {
            verdict: Verdict::Approve,
            feedback_notes: notes,
        }
    }

    pub fn reject(notes: Option<String>) -> Self {
        Self {
            verdict: Verdict::Reject,
            feedback_notes: notes,
        }
    }

    /// Check the patch can be merged into `session`
    pub fn validate(&self, session: &Session) -> Result<(), String> {
        if session.is_terminal() {
            return Err(format!("session is already {}", session.status));
        }
        if session.status != SessionStatus::AwaitingFeedback {
            return Err(format!("session is {}, not awaiting feedback", session.status));
        }
        Ok(())
    }
}

impl Patch<Session> for SessionPatch {
    fn apply_to(&self, session: &mut Session) -> Result<(), String> {
        debug!(thread_id = %session.thread_id, verdict = ?self.verdict, "SessionPatch::apply_to: called");
        self.validate(session)?;
        session.verdict = Some(self.verdict);
        session.feedback_notes = self
            .feedback_notes
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();
        session.touch();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn awaiting() -> Session {
        let mut s = Session::new("t1", "Q");
        s.status = SessionStatus::AwaitingFeedback;
        s.record_answer("A");
        s
    }

    #[test]
    fn test_merge_sets_verdict_and_notes() {
        let mut s = awaiting();
        SessionPatch::reject(Some("  too long ".to_string())).apply_to(&mut s).unwrap();
        assert_eq!(s.verdict, Some(Verdict::Reject));
        assert_eq!(s.feedback_notes, "too long");
        // Nothing else moves
        assert_eq!(s.status, SessionStatus::AwaitingFeedback);
        assert_eq!(s.attempt_count, 1);
    }

    #[test]
    fn test_missing_notes_clear_previous_notes() {
        let mut s = awaiting();
        s.feedback_notes = "old".to_string();
        SessionPatch::approve(None).apply_to(&mut s).unwrap();
        assert_eq!(s.feedback_notes, "");
    }

    #[test]
    fn test_rejects_terminal_session() {
        let mut s = awaiting();
        s.status = SessionStatus::Validated;
        let err = SessionPatch::approve(None).apply_to(&mut s).unwrap_err();
        assert!(err.contains("validated"));
        assert_eq!(s.verdict, None);
    }

    #[test]
    fn test_rejects_session_not_awaiting() {
        let mut s = awaiting();
        s.status = SessionStatus::Regenerating;
        assert!(SessionPatch::approve(None).apply_to(&mut s).is_err());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let ok: Result<SessionPatch, _> = serde_json::from_str(r#"{"verdict": "approve"}"#);
        assert_eq!(ok.unwrap(), SessionPatch::approve(None));

        let bad: Result<SessionPatch, _> = serde_json::from_str(r#"{"verdict": "approve", "attempt_count": 0}"#);
        assert!(bad.is_err());
    }
}
