//! SQLite implementation of `EpisodeStore`.
//!
//! The trait surface is read-only; the inherent `record_*` methods are the
//! ingestion boundary and validate payloads before they land.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::errors::{GovernanceError, GovernanceResult};
use crate::domain::models::{Episode, EpisodeSegment, Intervention};
use crate::domain::ports::EpisodeStore;
use crate::infrastructure::database::utils::parse_datetime;

pub struct SqliteEpisodeStore {
    pool: SqlitePool,
}

impl SqliteEpisodeStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Persist one episode. Validation happens here, at the ingestion
    /// boundary, so malformed runtime payloads never reach scoring.
    pub async fn record_episode(&self, episode: &Episode) -> GovernanceResult<()> {
        episode
            .validate()
            .map_err(GovernanceError::ValidationFailed)?;
        let segments = serde_json::to_string(&episode.segments)?;

        sqlx::query(
            r#"
            INSERT INTO episodes (
                id, agent_id, title, summary, started_at, ended_at,
                status, constitutional_score, violation_count, segments
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(episode.id.to_string())
        .bind(&episode.agent_id)
        .bind(&episode.title)
        .bind(&episode.summary)
        .bind(episode.started_at.to_rfc3339())
        .bind(episode.ended_at.to_rfc3339())
        .bind(episode.status.to_string())
        .bind(episode.constitutional_score)
        .bind(i64::from(episode.violation_count))
        .bind(segments)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Persist one intervention.
    pub async fn record_intervention(&self, intervention: &Intervention) -> GovernanceResult<()> {
        sqlx::query(
            r#"
            INSERT INTO interventions (id, agent_id, episode_id, reason, occurred_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(intervention.id.to_string())
        .bind(&intervention.agent_id)
        .bind(intervention.episode_id.map(|id| id.to_string()))
        .bind(&intervention.reason)
        .bind(intervention.occurred_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn row_to_episode(row: &sqlx::sqlite::SqliteRow) -> GovernanceResult<Episode> {
        let id: String = row.get("id");
        let segments: String = row.get("segments");
        let segments: Vec<EpisodeSegment> = serde_json::from_str(&segments)?;
        let status: String = row.get("status");

        Ok(Episode {
            id: Uuid::parse_str(&id)
                .map_err(|e| GovernanceError::SerializationError(format!("bad episode id: {e}")))?,
            agent_id: row.get("agent_id"),
            title: row.get("title"),
            summary: row.get("summary"),
            started_at: parse_datetime(row.get("started_at"))?,
            ended_at: parse_datetime(row.get("ended_at"))?,
            status: status
                .parse()
                .map_err(|_| GovernanceError::SerializationError(format!("bad status {status:?}")))?,
            constitutional_score: row.get("constitutional_score"),
            violation_count: row.get::<i64, _>("violation_count") as u32,
            segments,
        })
    }
}

#[async_trait]
impl EpisodeStore for SqliteEpisodeStore {
    async fn list_episodes(
        &self,
        agent_id: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> GovernanceResult<Vec<Episode>> {
        let rows = sqlx::query(
            r#"
            SELECT id, agent_id, title, summary, started_at, ended_at,
                   status, constitutional_score, violation_count, segments
            FROM episodes
            WHERE agent_id = ? AND ended_at >= ? AND ended_at <= ?
            ORDER BY ended_at DESC
            "#,
        )
        .bind(agent_id)
        .bind(since.to_rfc3339())
        .bind(until.to_rfc3339())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_episode).collect()
    }

    async fn count_interventions(
        &self,
        agent_id: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> GovernanceResult<u64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM interventions WHERE agent_id = ? AND occurred_at >= ? AND occurred_at <= ?",
        )
        .bind(agent_id)
        .bind(since.to_rfc3339())
        .bind(until.to_rfc3339())
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get::<i64, _>("n") as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::connection::DatabaseConnection;

    async fn store() -> SqliteEpisodeStore {
        let connection = DatabaseConnection::in_memory().await.unwrap();
        SqliteEpisodeStore::new(connection.pool())
    }

    #[tokio::test]
    async fn test_record_and_list_round_trip() {
        let store = store().await;
        let episode = Episode::new("agent-1", "deploy api")
            .with_summary("rolled out v2")
            .with_segment(EpisodeSegment::ToolCall {
                tool: "kubectl".to_string(),
                summary: "applied manifest".to_string(),
            });
        store.record_episode(&episode).await.unwrap();

        let listed = store
            .list_episodes("agent-1", DateTime::<Utc>::MIN_UTC, Utc::now())
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "deploy api");
        assert!(listed[0].has_rich_context());

        let other = store
            .list_episodes("agent-2", DateTime::<Utc>::MIN_UTC, Utc::now())
            .await
            .unwrap();
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_episode_rejected_at_ingestion() {
        let store = store().await;
        let episode = Episode::new("agent-1", "bad").with_constitutional_score(2.0);
        assert!(matches!(
            store.record_episode(&episode).await,
            Err(GovernanceError::ValidationFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_count_interventions_windowed() {
        let store = store().await;
        store
            .record_intervention(&Intervention::new("agent-1", "blocked risky call"))
            .await
            .unwrap();
        store
            .record_intervention(&Intervention::new("agent-1", "manual correction"))
            .await
            .unwrap();

        let count = store
            .count_interventions("agent-1", DateTime::<Utc>::MIN_UTC, Utc::now())
            .await
            .unwrap();
        assert_eq!(count, 2);

        let none = store
            .count_interventions("agent-1", Utc::now(), Utc::now())
            .await
            .unwrap();
        assert_eq!(none, 0);
    }
}
