//! Audit sink port.

use async_trait::async_trait;

use crate::domain::errors::GovernanceResult;
use crate::domain::models::{AuditEntry, AuditFilter};

/// Append-only destination for audit entries.
///
/// Writes go through the background audit worker; failures are logged
/// there and never re-raised to the code that produced the entry.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Append one entry. Entries are never updated or deleted.
    async fn append(&self, entry: &AuditEntry) -> GovernanceResult<()>;

    /// Query entries, newest first.
    async fn query(&self, filter: AuditFilter) -> GovernanceResult<Vec<AuditEntry>>;
}
