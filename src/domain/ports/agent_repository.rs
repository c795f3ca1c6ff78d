//! Agent repository port.

use async_trait::async_trait;

use crate::domain::errors::GovernanceResult;
use crate::domain::models::{Agent, MaturityLevel};

/// Repository for agent identities and their maturity.
///
/// `promote` is a compare-and-set: the update only applies while the agent
/// still holds `from`. This is what makes promotion atomic relative to
/// concurrent authorization checks — a racing check may observe the old
/// level, but never a level the agent has not actually reached.
#[async_trait]
pub trait AgentRepository: Send + Sync {
    /// Fetch an agent by id. `Ok(None)` when the agent does not exist.
    async fn get(&self, agent_id: &str) -> GovernanceResult<Option<Agent>>;

    /// Insert or replace an agent.
    async fn upsert(&self, agent: &Agent) -> GovernanceResult<()>;

    /// Compare-and-set maturity from `from` to `to`.
    ///
    /// # Errors
    /// - `AgentNotFound` when the agent does not exist
    /// - `ConcurrencyConflict` when the agent no longer holds `from`
    async fn promote(
        &self,
        agent_id: &str,
        from: MaturityLevel,
        to: MaturityLevel,
    ) -> GovernanceResult<()>;

    /// All known agents, for operator tooling.
    async fn list(&self) -> GovernanceResult<Vec<Agent>>;
}
