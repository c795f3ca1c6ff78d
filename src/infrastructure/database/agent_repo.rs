//! SQLite implementation of `AgentRepository`.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::domain::errors::{GovernanceError, GovernanceResult};
use crate::domain::models::{Agent, MaturityLevel};
use crate::domain::ports::AgentRepository;
use crate::infrastructure::database::utils::{parse_datetime, parse_maturity};

pub struct SqliteAgentRepository {
    pool: SqlitePool,
}

impl SqliteAgentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_agent(row: &sqlx::sqlite::SqliteRow) -> GovernanceResult<Agent> {
        Ok(Agent {
            id: row.get("id"),
            display_name: row.get("display_name"),
            maturity: parse_maturity(row.get("maturity"))?,
            created_at: parse_datetime(row.get("created_at"))?,
            updated_at: parse_datetime(row.get("updated_at"))?,
        })
    }
}

#[async_trait]
impl AgentRepository for SqliteAgentRepository {
    async fn get(&self, agent_id: &str) -> GovernanceResult<Option<Agent>> {
        let row = sqlx::query(
            "SELECT id, display_name, maturity, created_at, updated_at FROM agents WHERE id = ?",
        )
        .bind(agent_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_agent).transpose()
    }

    async fn upsert(&self, agent: &Agent) -> GovernanceResult<()> {
        sqlx::query(
            r#"
            INSERT INTO agents (id, display_name, maturity, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                display_name = excluded.display_name,
                maturity = excluded.maturity,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&agent.id)
        .bind(&agent.display_name)
        .bind(agent.maturity.to_string())
        .bind(agent.created_at.to_rfc3339())
        .bind(agent.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn promote(
        &self,
        agent_id: &str,
        from: MaturityLevel,
        to: MaturityLevel,
    ) -> GovernanceResult<()> {
        // Compare-and-set: the WHERE clause pins the expected current
        // level, so a lost race affects zero rows instead of clobbering a
        // concurrent promotion.
        let result = sqlx::query(
            "UPDATE agents SET maturity = ?, updated_at = ? WHERE id = ? AND maturity = ?",
        )
        .bind(to.to_string())
        .bind(Utc::now().to_rfc3339())
        .bind(agent_id)
        .bind(from.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        match self.get(agent_id).await? {
            None => Err(GovernanceError::AgentNotFound(agent_id.to_string())),
            Some(_) => Err(GovernanceError::ConcurrencyConflict {
                agent_id: agent_id.to_string(),
            }),
        }
    }

    async fn list(&self) -> GovernanceResult<Vec<Agent>> {
        let rows = sqlx::query(
            "SELECT id, display_name, maturity, created_at, updated_at FROM agents ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_agent).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::connection::DatabaseConnection;

    async fn repo() -> SqliteAgentRepository {
        let connection = DatabaseConnection::in_memory().await.unwrap();
        SqliteAgentRepository::new(connection.pool())
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let repo = repo().await;
        let agent = Agent::new("agent-1", "Agent One");
        repo.upsert(&agent).await.unwrap();

        let loaded = repo.get("agent-1").await.unwrap().unwrap();
        assert_eq!(loaded.id, "agent-1");
        assert_eq!(loaded.maturity, MaturityLevel::Student);

        assert!(repo.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_promote_cas() {
        let repo = repo().await;
        repo.upsert(&Agent::new("agent-1", "Agent One")).await.unwrap();

        repo.promote("agent-1", MaturityLevel::Student, MaturityLevel::Intern)
            .await
            .unwrap();
        let loaded = repo.get("agent-1").await.unwrap().unwrap();
        assert_eq!(loaded.maturity, MaturityLevel::Intern);

        // Stale expected level loses the race.
        let err = repo
            .promote("agent-1", MaturityLevel::Student, MaturityLevel::Intern)
            .await
            .unwrap_err();
        assert!(matches!(err, GovernanceError::ConcurrencyConflict { .. }));

        let err = repo
            .promote("ghost", MaturityLevel::Student, MaturityLevel::Intern)
            .await
            .unwrap_err();
        assert!(matches!(err, GovernanceError::AgentNotFound(_)));
    }
}
