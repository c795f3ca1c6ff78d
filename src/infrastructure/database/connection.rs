//! SQLite connection pool with schema bootstrap.

use anyhow::{Context, Result};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::str::FromStr;
use std::time::Duration;

use crate::domain::models::DatabaseConfig;

/// Database connection pool manager.
///
/// SQLite with WAL mode for concurrent readers, NORMAL synchronous, and a
/// busy timeout to ride out lock contention. The schema is created on
/// connect; every table the core persists to is append-only except
/// `agents`.
pub struct DatabaseConnection {
    pool: SqlitePool,
}

impl DatabaseConnection {
    /// Open (creating if missing) the database at `config.path`.
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let url = format!("sqlite:{}", config.path);
        let options = SqliteConnectOptions::from_str(&url)
            .context("invalid database URL")?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .context("failed to open database")?;

        let connection = Self { pool };
        connection.init_schema().await?;
        Ok(connection)
    }

    /// In-memory database for tests.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .context("invalid database URL")?
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .context("failed to open in-memory database")?;

        let connection = Self { pool };
        connection.init_schema().await?;
        Ok(connection)
    }

    pub fn pool(&self) -> SqlitePool {
        self.pool.clone()
    }

    async fn init_schema(&self) -> Result<()> {
        // One statement per query: the sqlite driver prepares statements
        // individually.
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS agents (
                id TEXT PRIMARY KEY,
                display_name TEXT NOT NULL,
                maturity TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS episodes (
                id TEXT PRIMARY KEY,
                agent_id TEXT NOT NULL,
                title TEXT NOT NULL,
                summary TEXT NOT NULL,
                started_at TEXT NOT NULL,
                ended_at TEXT NOT NULL,
                status TEXT NOT NULL,
                constitutional_score REAL NOT NULL,
                violation_count INTEGER NOT NULL,
                segments TEXT NOT NULL
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_episodes_agent_ended ON episodes(agent_id, ended_at)",
            r#"
            CREATE TABLE IF NOT EXISTS interventions (
                id TEXT PRIMARY KEY,
                agent_id TEXT NOT NULL,
                episode_id TEXT,
                reason TEXT NOT NULL,
                occurred_at TEXT NOT NULL
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_interventions_agent_time ON interventions(agent_id, occurred_at)",
            r#"
            CREATE TABLE IF NOT EXISTS graduation_records (
                id TEXT PRIMARY KEY,
                agent_id TEXT NOT NULL,
                from_level TEXT NOT NULL,
                to_level TEXT NOT NULL,
                readiness REAL NOT NULL,
                episode_count INTEGER NOT NULL,
                intervention_rate REAL NOT NULL,
                constitutional_score REAL NOT NULL,
                approved_by TEXT NOT NULL,
                decided_at TEXT NOT NULL
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_graduation_agent ON graduation_records(agent_id, decided_at)",
            r#"
            CREATE TABLE IF NOT EXISTS audit_log (
                id TEXT PRIMARY KEY,
                timestamp TEXT NOT NULL,
                actor TEXT NOT NULL,
                action TEXT NOT NULL,
                outcome TEXT NOT NULL,
                detail TEXT NOT NULL,
                metadata TEXT NOT NULL
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_log(timestamp)",
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .context("failed to initialize schema")?;
        }
        Ok(())
    }
}
