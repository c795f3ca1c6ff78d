//! SQLite audit sink: append-only, retained indefinitely.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::errors::{GovernanceError, GovernanceResult};
use crate::domain::models::{AuditAction, AuditEntry, AuditFilter, AuditOutcome};
use crate::domain::ports::AuditSink;
use crate::infrastructure::database::utils::parse_datetime;

pub struct SqliteAuditSink {
    pool: SqlitePool,
}

impl SqliteAuditSink {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> GovernanceResult<AuditEntry> {
        let id: String = row.get("id");
        let actor: String = row.get("actor");
        let action: String = row.get("action");
        let outcome: String = row.get("outcome");
        let metadata: String = row.get("metadata");

        Ok(AuditEntry {
            id: Uuid::parse_str(&id)
                .map_err(|e| GovernanceError::SerializationError(format!("bad audit id: {e}")))?,
            timestamp: parse_datetime(row.get("timestamp"))?,
            actor: serde_json::from_str(&actor)?,
            action: AuditAction::parse_str(&action).ok_or_else(|| {
                GovernanceError::SerializationError(format!("bad audit action {action:?}"))
            })?,
            outcome: AuditOutcome::parse_str(&outcome).ok_or_else(|| {
                GovernanceError::SerializationError(format!("bad audit outcome {outcome:?}"))
            })?,
            detail: row.get("detail"),
            metadata: serde_json::from_str(&metadata)?,
        })
    }
}

#[async_trait]
impl AuditSink for SqliteAuditSink {
    async fn append(&self, entry: &AuditEntry) -> GovernanceResult<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_log (id, timestamp, actor, action, outcome, detail, metadata)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.id.to_string())
        .bind(entry.timestamp.to_rfc3339())
        .bind(serde_json::to_string(&entry.actor)?)
        .bind(entry.action.as_str())
        .bind(entry.outcome.as_str())
        .bind(&entry.detail)
        .bind(serde_json::to_string(&entry.metadata)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn query(&self, filter: AuditFilter) -> GovernanceResult<Vec<AuditEntry>> {
        // Time and pagination constraints push down; the rest of the
        // filter is applied row-side on the decoded entry.
        let limit = filter.limit.map_or(i64::MAX, |l| l as i64);
        let rows = sqlx::query(
            r#"
            SELECT id, timestamp, actor, action, outcome, detail, metadata
            FROM audit_log
            WHERE (? IS NULL OR timestamp >= ?) AND (? IS NULL OR timestamp <= ?)
            ORDER BY timestamp DESC
            "#,
        )
        .bind(filter.from.map(|t| t.to_rfc3339()))
        .bind(filter.from.map(|t| t.to_rfc3339()))
        .bind(filter.to.map(|t| t.to_rfc3339()))
        .bind(filter.to.map(|t| t.to_rfc3339()))
        .fetch_all(&self.pool)
        .await?;

        let mut entries = Vec::new();
        for row in &rows {
            let entry = Self::row_to_entry(row)?;
            if filter.matches(&entry) {
                entries.push(entry);
                if entries.len() as i64 >= limit {
                    break;
                }
            }
        }
        Ok(entries)
    }
}
