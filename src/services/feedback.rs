//! Empirical feedback tracker.
//!
//! Components that learn from reported outcomes (cache-hit prediction,
//! retrieval usefulness) funnel observations through
//! `record_feedback_outcome(key, success)`. The tracker keeps per-key
//! success/attempt counters and exposes observed rates.

use std::collections::HashMap;
use std::sync::RwLock;

/// Success/attempt counters for one feedback key.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct OutcomeStats {
    pub successes: u64,
    pub attempts: u64,
}

impl OutcomeStats {
    pub fn success_rate(&self) -> Option<f64> {
        if self.attempts == 0 {
            None
        } else {
            Some(self.successes as f64 / self.attempts as f64)
        }
    }
}

/// Concurrent map of feedback keys to outcome counters.
#[derive(Debug, Default)]
pub struct FeedbackTracker {
    outcomes: RwLock<HashMap<String, OutcomeStats>>,
}

impl FeedbackTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one observed outcome for `key`.
    pub fn record_outcome(&self, key: &str, success: bool) {
        let mut outcomes = self.outcomes.write().expect("feedback tracker poisoned");
        let stats = outcomes.entry(key.to_string()).or_default();
        stats.attempts += 1;
        if success {
            stats.successes += 1;
        }
    }

    /// Observed success rate for `key`, `None` until any outcome arrives.
    pub fn success_rate(&self, key: &str) -> Option<f64> {
        self.outcomes
            .read()
            .expect("feedback tracker poisoned")
            .get(key)
            .and_then(OutcomeStats::success_rate)
    }

    /// Snapshot of every key's counters, for diagnostics.
    pub fn snapshot(&self) -> HashMap<String, OutcomeStats> {
        self.outcomes
            .read()
            .expect("feedback tracker poisoned")
            .clone()
    }
}
