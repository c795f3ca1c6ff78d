//! Episode store port.
//!
//! Episodes are produced by the execution runtime; this core only reads
//! them. The store is queryable by agent and time range.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::errors::GovernanceResult;
use crate::domain::models::Episode;

/// Read access to an agent's episodic history.
#[async_trait]
pub trait EpisodeStore: Send + Sync {
    /// Episodes for `agent_id` whose `ended_at` falls in `[since, until]`.
    async fn list_episodes(
        &self,
        agent_id: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> GovernanceResult<Vec<Episode>>;

    /// Count of recorded interventions for `agent_id` in the window.
    async fn count_interventions(
        &self,
        agent_id: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> GovernanceResult<u64>;
}
