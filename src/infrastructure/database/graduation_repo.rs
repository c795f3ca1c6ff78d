//! SQLite graduation record store: append-only, retained indefinitely.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::errors::{GovernanceError, GovernanceResult};
use crate::domain::models::GraduationRecord;
use crate::domain::ports::GraduationRecordStore;
use crate::infrastructure::database::utils::{parse_datetime, parse_maturity};

pub struct SqliteGraduationStore {
    pool: SqlitePool,
}

impl SqliteGraduationStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> GovernanceResult<GraduationRecord> {
        let id: String = row.get("id");
        Ok(GraduationRecord {
            id: Uuid::parse_str(&id).map_err(|e| {
                GovernanceError::SerializationError(format!("bad record id: {e}"))
            })?,
            agent_id: row.get("agent_id"),
            from_level: parse_maturity(row.get("from_level"))?,
            to_level: parse_maturity(row.get("to_level"))?,
            readiness: row.get("readiness"),
            episode_count: row.get::<i64, _>("episode_count") as u64,
            intervention_rate: row.get("intervention_rate"),
            constitutional_score: row.get("constitutional_score"),
            approved_by: row.get("approved_by"),
            decided_at: parse_datetime(row.get("decided_at"))?,
        })
    }
}

#[async_trait]
impl GraduationRecordStore for SqliteGraduationStore {
    async fn append(&self, record: &GraduationRecord) -> GovernanceResult<()> {
        sqlx::query(
            r#"
            INSERT INTO graduation_records (
                id, agent_id, from_level, to_level, readiness,
                episode_count, intervention_rate, constitutional_score,
                approved_by, decided_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id.to_string())
        .bind(&record.agent_id)
        .bind(record.from_level.to_string())
        .bind(record.to_level.to_string())
        .bind(record.readiness)
        .bind(record.episode_count as i64)
        .bind(record.intervention_rate)
        .bind(record.constitutional_score)
        .bind(&record.approved_by)
        .bind(record.decided_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_for_agent(&self, agent_id: &str) -> GovernanceResult<Vec<GraduationRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, agent_id, from_level, to_level, readiness,
                   episode_count, intervention_rate, constitutional_score,
                   approved_by, decided_at
            FROM graduation_records
            WHERE agent_id = ?
            ORDER BY decided_at ASC
            "#,
        )
        .bind(agent_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_record).collect()
    }
}
