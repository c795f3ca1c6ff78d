//! Authorization verdicts produced by the permission gate.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::models::MaturityLevel;

/// What the verdict was computed from. Policy denials are real decisions;
/// infrastructure denials mean the gate could not decide and failed closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionBasis {
    Policy,
    Infrastructure,
}

/// A single authorization verdict. Transient: cached with a short TTL and
/// never persisted across restarts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionDecision {
    pub agent_id: String,
    pub action: String,
    /// Tier the action requires. `None` for unknown actions.
    pub required: Option<MaturityLevel>,
    /// Tier the agent held when the verdict was computed. `None` when the
    /// agent could not be read (infrastructure denial).
    pub observed: Option<MaturityLevel>,
    pub allowed: bool,
    /// Human-readable reason, e.g. `requires SUPERVISED, agent is INTERN`.
    pub reason: String,
    pub basis: DecisionBasis,
    pub computed_at: DateTime<Utc>,
    /// Time-to-live in the decision cache, seconds.
    pub ttl_secs: u64,
}

impl PermissionDecision {
    /// An allow verdict computed from current maturity.
    pub fn allowed(
        agent_id: impl Into<String>,
        action: impl Into<String>,
        required: MaturityLevel,
        observed: MaturityLevel,
        ttl_secs: u64,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            action: action.into(),
            required: Some(required),
            observed: Some(observed),
            allowed: true,
            reason: format!("requires {required}, agent is {observed}"),
            basis: DecisionBasis::Policy,
            computed_at: Utc::now(),
            ttl_secs,
        }
    }

    /// A policy denial: the agent's tier does not satisfy the action's tier.
    pub fn denied_tier(
        agent_id: impl Into<String>,
        action: impl Into<String>,
        required: MaturityLevel,
        observed: MaturityLevel,
        ttl_secs: u64,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            action: action.into(),
            required: Some(required),
            observed: Some(observed),
            allowed: false,
            reason: format!("requires {required}, agent is {observed}"),
            basis: DecisionBasis::Policy,
            computed_at: Utc::now(),
            ttl_secs,
        }
    }

    /// Fail-closed denial for an action with no registered tier.
    pub fn denied_unknown_action(
        agent_id: impl Into<String>,
        action: impl Into<String>,
        ttl_secs: u64,
    ) -> Self {
        let action = action.into();
        Self {
            agent_id: agent_id.into(),
            reason: format!("unknown action {action:?}"),
            action,
            required: None,
            observed: None,
            allowed: false,
            basis: DecisionBasis::Policy,
            computed_at: Utc::now(),
            ttl_secs,
        }
    }

    /// Fail-closed denial because the agent store could not be consulted.
    /// Never cached: the outage should not poison the TTL window.
    pub fn denied_unavailable(
        agent_id: impl Into<String>,
        action: impl Into<String>,
        detail: &str,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            action: action.into(),
            required: None,
            observed: None,
            allowed: false,
            reason: format!("agent store unavailable: {detail}"),
            basis: DecisionBasis::Infrastructure,
            computed_at: Utc::now(),
            ttl_secs: 0,
        }
    }

    /// Whether the cached verdict has outlived its TTL.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.computed_at >= Duration::seconds(self.ttl_secs as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_denied_tier_reason_format() {
        let decision = PermissionDecision::denied_tier(
            "intern-agent",
            "submit_form",
            MaturityLevel::Supervised,
            MaturityLevel::Intern,
            60,
        );
        assert!(!decision.allowed);
        assert_eq!(decision.reason, "requires SUPERVISED, agent is INTERN");
        assert_eq!(decision.basis, DecisionBasis::Policy);
    }

    #[test]
    fn test_unknown_action_fails_closed() {
        let decision = PermissionDecision::denied_unknown_action("a", "launch_rocket", 60);
        assert!(!decision.allowed);
        assert!(decision.reason.contains("unknown action"));
        assert!(decision.required.is_none());
    }

    #[test]
    fn test_infrastructure_denial_not_cacheable() {
        let decision = PermissionDecision::denied_unavailable("a", "act", "connection refused");
        assert_eq!(decision.basis, DecisionBasis::Infrastructure);
        assert_eq!(decision.ttl_secs, 0);
    }

    #[test]
    fn test_expiry() {
        let mut decision = PermissionDecision::allowed(
            "a",
            "act",
            MaturityLevel::Student,
            MaturityLevel::Intern,
            60,
        );
        let now = Utc::now();
        assert!(!decision.is_expired(now));
        decision.computed_at = now - Duration::seconds(61);
        assert!(decision.is_expired(now));
    }
}
