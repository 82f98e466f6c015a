//! Retry policy for rejected answers

use tracing::debug;

use crate::domain::Verdict;

/// Feedback used when a rejection comes without notes
pub const DEFAULT_PLACEHOLDER_FEEDBACK: &str = "Answer doesn't meet expectations.";

/// What happens after a verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Approved; persist to the cache
    Save,
    /// Rejected with budget left
    Regenerate,
    /// Rejected with no budget left
    Exhaust,
}

#[derive(Debug, Clone)]
pub struct RetryController {
    max_attempts: u32,
    placeholder: String,
}

impl RetryController {
    pub fn new(max_attempts: u32, placeholder: impl Into<String>) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            placeholder: placeholder.into(),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// `attempt_count` is the number of answers shown so far, the current one included
    pub fn decide(&self, attempt_count: u32, verdict: Verdict) -> Decision {
        let decision = match verdict {
            Verdict::Approve => Decision::Save,
            Verdict::Reject if attempt_count < self.max_attempts => Decision::Regenerate,
            Verdict::Reject => Decision::Exhaust,
        };
        debug!(attempt_count, max_attempts = self.max_attempts, ?verdict, ?decision, "decide: called");
        decision
    }

    /// Notes to regenerate from; blank notes become the placeholder
    pub fn feedback_or_placeholder(&self, notes: &str) -> String {
        let notes = notes.trim();
        if notes.is_empty() {
            self.placeholder.clone()
        } else {
            notes.to_string()
        }
    }
}

impl Default for RetryController {
    fn default() -> Self {
        Self::new(3, DEFAULT_PLACEHOLDER_FEEDBACK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_three_rejections_exhaust() {
        let retry = RetryController::default();
        assert_eq!(retry.decide(1, Verdict::Reject), Decision::Regenerate);
        assert_eq!(retry.decide(2, Verdict::Reject), Decision::Regenerate);
        assert_eq!(retry.decide(3, Verdict::Reject), Decision::Exhaust);
    }

    #[test]
    fn test_approve_always_saves() {
        let retry = RetryController::default();
        assert_eq!(retry.decide(3, Verdict::Approve), Decision::Save);
    }

    #[test]
    fn test_single_attempt_budget() {
        let retry = RetryController::new(1, "x");
        assert_eq!(retry.decide(1, Verdict::Reject), Decision::Exhaust);
    }

    #[test]
    fn test_zero_budget_clamped() {
        assert_eq!(RetryController::new(0, "x").max_attempts(), 1);
    }

    #[test]
    fn test_placeholder() {
        let retry = RetryController::default();
        assert_eq!(retry.feedback_or_placeholder("   "), DEFAULT_PLACEHOLDER_FEEDBACK);
        assert_eq!(retry.feedback_or_placeholder(" shorter "), "shorter");
    }

    proptest! {
        #[test]
        fn prop_regenerate_iff_under_budget(max in 1u32..10, count in 1u32..20) {
            let retry = RetryController::new(max, "x");
            let decision = retry.decide(count, Verdict::Reject);
            prop_assert_eq!(decision == Decision::Regenerate, count < max);
        }
    }
}
