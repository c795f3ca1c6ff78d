//! End-to-end test: the governance core wired against real SQLite stores.

mod common;

use std::sync::Arc;

use common::HashEmbeddingProvider;
use tempfile::TempDir;
use warden::application::GovernanceCore;
use warden::domain::models::{
    ActionRule, AuditFilter, DatabaseConfig, Episode, EpisodeSegment, Intervention, MaturityLevel,
    WardenConfig,
};
use warden::domain::ports::{AgentRepository, GraduationRecordStore};
use warden::infrastructure::database::{
    DatabaseConnection, SqliteAgentRepository, SqliteAuditSink, SqliteEpisodeStore,
    SqliteGraduationStore,
};
use warden::Agent;

struct Deployment {
    core: GovernanceCore,
    agents: Arc<SqliteAgentRepository>,
    episodes: Arc<SqliteEpisodeStore>,
    records: Arc<SqliteGraduationStore>,
    _dir: TempDir,
}

async fn deploy() -> Deployment {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("warden.db");

    let mut config = WardenConfig::default();
    config.database = DatabaseConfig {
        path: db_path.to_string_lossy().into_owned(),
        max_connections: 5,
    };
    config.actions = vec![
        ActionRule {
            name: "read_docs".to_string(),
            required: MaturityLevel::Student,
        },
        ActionRule {
            name: "submit_form".to_string(),
            required: MaturityLevel::Supervised,
        },
    ];

    let connection = DatabaseConnection::new(&config.database).await.unwrap();
    let agents = Arc::new(SqliteAgentRepository::new(connection.pool()));
    let episodes = Arc::new(SqliteEpisodeStore::new(connection.pool()));
    let records = Arc::new(SqliteGraduationStore::new(connection.pool()));
    let core = GovernanceCore::new(
        &config,
        Arc::clone(&agents) as _,
        Arc::clone(&episodes) as _,
        Arc::new(HashEmbeddingProvider::new()),
        Arc::new(SqliteAuditSink::new(connection.pool())),
        Arc::clone(&records) as _,
    )
    .unwrap();

    Deployment {
        core,
        agents,
        episodes,
        records,
        _dir: dir,
    }
}

#[tokio::test]
async fn test_full_lifecycle_against_sqlite() {
    let d = deploy().await;

    d.agents
        .upsert(&Agent::new("field-agent", "Field Agent"))
        .await
        .unwrap();

    // A student can read docs but not submit forms.
    assert!(d.core.authorize("field-agent", "read_docs").await.allowed);
    let denied = d.core.authorize("field-agent", "submit_form").await;
    assert!(!denied.allowed);
    assert_eq!(denied.reason, "requires SUPERVISED, agent is STUDENT");

    // Ingest a clean body of work.
    for i in 0..12 {
        d.episodes
            .record_episode(
                &Episode::new("field-agent", format!("ticket triage {i}"))
                    .with_summary("triaged support tickets with policy checks")
                    .with_segment(EpisodeSegment::ToolCall {
                        tool: "ticketing".to_string(),
                        summary: "resolved queue".to_string(),
                    }),
            )
            .await
            .unwrap();
    }

    // STUDENT -> INTERN clears.
    let outcome = d.core.evaluate_graduation("field-agent", None).await.unwrap();
    assert!(outcome.promoted);
    assert_eq!(outcome.to_level, MaturityLevel::Intern);

    let stored = d.agents.get("field-agent").await.unwrap().unwrap();
    assert_eq!(stored.maturity, MaturityLevel::Intern);
    assert_eq!(d.records.list_for_agent("field-agent").await.unwrap().len(), 1);

    // INTERN -> SUPERVISED blocked: an intervention-heavy window.
    for i in 0..3 {
        d.episodes
            .record_intervention(
                &Intervention::new("field-agent", format!("manual correction {i}")),
            )
            .await
            .unwrap();
    }
    let outcome = d.core.evaluate_graduation("field-agent", None).await.unwrap();
    assert!(!outcome.promoted);
    assert!(outcome
        .failed_thresholds()
        .contains(&"episode_count"));

    // Every decision and attempt is on the audit log.
    d.core.flush_audit().await;
    let entries = d
        .core
        .query_audit(AuditFilter::new().with_agent("field-agent"))
        .await
        .unwrap();
    assert!(entries.len() >= 4);

    // Retrieval over the ingested episodes.
    let ranked = d
        .core
        .retrieve_episodes("field-agent", "ticket triage policy", 5)
        .await
        .unwrap();
    assert_eq!(ranked.len(), 5);
    assert!(ranked[0].score > 0.5);
}
