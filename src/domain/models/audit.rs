//! Audit trail entries.
//!
//! Every authorization verdict and every graduation attempt — success or
//! failure — produces exactly one entry. Entries are append-only and
//! retained indefinitely.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Actor that caused the audited event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditActor {
    /// The governance core itself.
    System,
    /// A platform agent.
    Agent { id: String },
    /// A human operator (CLI, approval flows).
    Operator { identifier: String },
}

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    AuthorizationAllowed,
    AuthorizationDenied,
    GraduationPromoted,
    GraduationDenied,
    GraduationDeferred,
    GraduationRejected,
    CacheInvalidated,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AuthorizationAllowed => "authorization_allowed",
            Self::AuthorizationDenied => "authorization_denied",
            Self::GraduationPromoted => "graduation_promoted",
            Self::GraduationDenied => "graduation_denied",
            Self::GraduationDeferred => "graduation_deferred",
            Self::GraduationRejected => "graduation_rejected",
            Self::CacheInvalidated => "cache_invalidated",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "authorization_allowed" => Some(Self::AuthorizationAllowed),
            "authorization_denied" => Some(Self::AuthorizationDenied),
            "graduation_promoted" => Some(Self::GraduationPromoted),
            "graduation_denied" => Some(Self::GraduationDenied),
            "graduation_deferred" => Some(Self::GraduationDeferred),
            "graduation_rejected" => Some(Self::GraduationRejected),
            "cache_invalidated" => Some(Self::CacheInvalidated),
            _ => None,
        }
    }
}

/// Outcome classification, distinct from the action so operators can
/// filter "couldn't decide" apart from "decided no".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Success,
    Denied,
    Error,
}

impl AuditOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Denied => "denied",
            Self::Error => "error",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Self::Success),
            "denied" => Some(Self::Denied),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// A single append-only audit entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub actor: AuditActor,
    pub action: AuditAction,
    pub outcome: AuditOutcome,
    /// Human-readable detail, e.g. the denial reason.
    pub detail: String,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl AuditEntry {
    pub fn new(
        actor: AuditActor,
        action: AuditAction,
        outcome: AuditOutcome,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            actor,
            action,
            outcome,
            detail: detail.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// The agent this entry concerns, when the actor is an agent.
    pub fn agent_id(&self) -> Option<&str> {
        match &self.actor {
            AuditActor::Agent { id } => Some(id),
            _ => None,
        }
    }
}

/// Filter for querying the audit log.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub agent_id: Option<String>,
    pub action: Option<AuditAction>,
    pub outcome: Option<AuditOutcome>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl AuditFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn with_action(mut self, action: AuditAction) -> Self {
        self.action = Some(action);
        self
    }

    pub fn with_outcome(mut self, outcome: AuditOutcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Check if an entry matches this filter.
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        if let Some(ref agent_id) = self.agent_id {
            if entry.agent_id() != Some(agent_id.as_str()) {
                return false;
            }
        }
        if let Some(action) = self.action {
            if entry.action != action {
                return false;
            }
        }
        if let Some(outcome) = self.outcome {
            if entry.outcome != outcome {
                return false;
            }
        }
        if let Some(from) = self.from {
            if entry.timestamp < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if entry.timestamp > to {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_builder() {
        let entry = AuditEntry::new(
            AuditActor::Agent {
                id: "agent-1".to_string(),
            },
            AuditAction::AuthorizationDenied,
            AuditOutcome::Denied,
            "requires SUPERVISED, agent is INTERN",
        )
        .with_metadata("action", serde_json::json!("submit_form"));

        assert_eq!(entry.agent_id(), Some("agent-1"));
        assert_eq!(entry.action, AuditAction::AuthorizationDenied);
        assert_eq!(
            entry.metadata.get("action"),
            Some(&serde_json::json!("submit_form"))
        );
    }

    #[test]
    fn test_filter_matches_agent() {
        let entry = AuditEntry::new(
            AuditActor::Agent {
                id: "agent-1".to_string(),
            },
            AuditAction::AuthorizationAllowed,
            AuditOutcome::Success,
            "ok",
        );

        assert!(AuditFilter::new().with_agent("agent-1").matches(&entry));
        assert!(!AuditFilter::new().with_agent("agent-2").matches(&entry));
        assert!(!AuditFilter::new()
            .with_action(AuditAction::GraduationDenied)
            .matches(&entry));
    }
}
