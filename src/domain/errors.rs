//! Domain errors for the Warden governance core.
//!
//! Policy-level negative outcomes (a denied action, an unmet graduation
//! threshold) are ordinary data carried by [`PermissionDecision`] and
//! [`GraduationOutcome`]; only infrastructure and contract violations are
//! errors. Callers can therefore tell "couldn't decide" apart from
//! "decided no".
//!
//! [`PermissionDecision`]: crate::domain::models::PermissionDecision
//! [`GraduationOutcome`]: crate::domain::models::GraduationOutcome

use thiserror::Error;

use crate::domain::models::MaturityLevel;

/// Errors raised by the governance core.
#[derive(Debug, Error)]
pub enum GovernanceError {
    /// A transition request that skips or reverses a maturity level.
    /// Rejected outright, never auto-corrected to the nearest legal step.
    #[error("invalid maturity transition {from} -> {to}: only single forward steps are permitted")]
    InvalidTransition {
        from: MaturityLevel,
        to: MaturityLevel,
    },

    #[error("agent not found: {0}")]
    AgentNotFound(String),

    /// The backing store could not be reached or answered with a failure.
    /// Authorization fails closed on this; graduation defers and retries.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// The embedding provider failed or timed out. Retrieval degrades to
    /// keyword-only scoring instead of surfacing this to callers.
    #[error("embedding provider unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("validation failed: {0}")]
    ValidationFailed(String),

    #[error("serialization error: {0}")]
    SerializationError(String),

    /// A compare-and-set on agent maturity lost a race with a concurrent
    /// promotion.
    #[error("concurrency conflict: agent {agent_id} maturity changed during promotion")]
    ConcurrencyConflict { agent_id: String },
}

pub type GovernanceResult<T> = Result<T, GovernanceError>;

impl From<sqlx::Error> for GovernanceError {
    fn from(err: sqlx::Error) -> Self {
        GovernanceError::StoreUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for GovernanceError {
    fn from(err: serde_json::Error) -> Self {
        GovernanceError::SerializationError(err.to_string())
    }
}
