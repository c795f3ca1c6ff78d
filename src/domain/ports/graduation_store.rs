//! Graduation record store port.

use async_trait::async_trait;

use crate::domain::errors::GovernanceResult;
use crate::domain::models::GraduationRecord;

/// Append-only store of successful promotions, retained indefinitely.
#[async_trait]
pub trait GraduationRecordStore: Send + Sync {
    /// Append one record; written exactly once per successful promotion.
    async fn append(&self, record: &GraduationRecord) -> GovernanceResult<()>;

    /// Records for one agent, oldest first.
    async fn list_for_agent(&self, agent_id: &str) -> GovernanceResult<Vec<GraduationRecord>>;
}
