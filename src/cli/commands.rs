//! CLI command execution.

use std::sync::Arc;

use anyhow::{Context, Result};
use comfy_table::{presets::UTF8_FULL, Table};

use crate::application::GovernanceCore;
use crate::cli::{AgentCommands, EpisodeCommands};
use crate::domain::models::{
    Agent, AuditFilter, Episode, Intervention, MaturityLevel, WardenConfig,
};
use crate::domain::ports::{EmbeddingProvider, NullEmbeddingProvider};
use crate::infrastructure::database::{
    DatabaseConnection, SqliteAgentRepository, SqliteAuditSink, SqliteEpisodeStore,
    SqliteGraduationStore,
};
use crate::infrastructure::embeddings::{
    CachedEmbeddingProvider, OpenAiEmbeddingConfig, OpenAiEmbeddingProvider,
};
use crate::services::ApprovalRequest;

const CONFIG_TEMPLATE: &str = r#"# Warden configuration. Values omitted here fall back to built-in
# defaults; WARDEN_* environment variables override everything.
database:
  path: .warden/warden.db

logging:
  level: info
  format: pretty

cache:
  capacity: 4096
  ttl_secs: 30

actions:
  - name: read_docs
    required: student
  - name: run_sandboxed
    required: intern
  - name: submit_form
    required: supervised
  - name: deploy_production
    required: autonomous
"#;

/// Everything a command needs: the wired core plus direct store handles
/// for ingestion-style commands.
pub struct Runtime {
    pub core: GovernanceCore,
    pub agents: Arc<SqliteAgentRepository>,
    pub episodes: Arc<SqliteEpisodeStore>,
}

/// Open the database and wire a `GovernanceCore` from the loaded config.
pub async fn open_runtime(config: &WardenConfig) -> Result<Runtime> {
    let connection = DatabaseConnection::new(&config.database).await?;
    let agents = Arc::new(SqliteAgentRepository::new(connection.pool()));
    let episodes = Arc::new(SqliteEpisodeStore::new(connection.pool()));
    let audit_sink = Arc::new(SqliteAuditSink::new(connection.pool()));
    let records = Arc::new(SqliteGraduationStore::new(connection.pool()));

    // Embeddings are optional: without an API key retrieval degrades to
    // keyword-only scoring.
    let embedder: Arc<dyn EmbeddingProvider> = if std::env::var("OPENAI_API_KEY").is_ok() {
        let provider = OpenAiEmbeddingProvider::new(OpenAiEmbeddingConfig::default())
            .context("failed to construct embedding provider")?;
        Arc::new(CachedEmbeddingProvider::new(Arc::new(provider)))
    } else {
        Arc::new(NullEmbeddingProvider::new())
    };

    let core = GovernanceCore::new(
        config,
        agents.clone(),
        episodes.clone(),
        embedder,
        audit_sink,
        records,
    )
    .context("failed to wire governance core")?;

    Ok(Runtime {
        core,
        agents,
        episodes,
    })
}

pub async fn init(config: &WardenConfig, json: bool) -> Result<()> {
    std::fs::create_dir_all(".warden").context("failed to create .warden directory")?;
    let config_path = std::path::Path::new(".warden/config.yaml");
    if config_path.exists() {
        anyhow::bail!(".warden/config.yaml already exists");
    }
    std::fs::write(config_path, CONFIG_TEMPLATE).context("failed to write config")?;

    // Opening the runtime bootstraps the database schema.
    let _runtime = open_runtime(config).await?;

    if json {
        println!("{}", serde_json::json!({ "initialized": true }));
    } else {
        println!("Initialized .warden/config.yaml and database");
    }
    Ok(())
}

pub async fn agent(command: AgentCommands, config: &WardenConfig, json: bool) -> Result<()> {
    use crate::domain::ports::AgentRepository;

    let runtime = open_runtime(config).await?;
    match command {
        AgentCommands::Add {
            agent_id,
            display_name,
        } => {
            let display = display_name.unwrap_or_else(|| agent_id.clone());
            let agent = Agent::new(agent_id.clone(), display);
            runtime.agents.upsert(&agent).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&agent)?);
            } else {
                println!("Registered {} at {}", agent.id, agent.maturity);
            }
        }
        AgentCommands::List => {
            let agents = runtime.agents.list().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&agents)?);
            } else {
                let mut table = Table::new();
                table.load_preset(UTF8_FULL);
                table.set_header(vec!["ID", "Name", "Maturity", "Updated"]);
                for agent in &agents {
                    table.add_row(vec![
                        agent.id.clone(),
                        agent.display_name.clone(),
                        agent.maturity.to_string(),
                        agent.updated_at.to_rfc3339(),
                    ]);
                }
                println!("{table}");
            }
        }
    }
    Ok(())
}

pub async fn episode(command: EpisodeCommands, config: &WardenConfig, json: bool) -> Result<()> {
    let runtime = open_runtime(config).await?;
    match command {
        EpisodeCommands::Add {
            agent_id,
            title,
            summary,
            compliance,
            violations,
        } => {
            let episode = Episode::new(agent_id, title)
                .with_summary(summary)
                .with_constitutional_score(compliance)
                .with_violations(violations);
            runtime.episodes.record_episode(&episode).await?;
            if json {
                println!("{}", serde_json::json!({ "episode_id": episode.id }));
            } else {
                println!("Recorded episode {}", episode.id);
            }
        }
        EpisodeCommands::Intervene { agent_id, reason } => {
            let intervention = Intervention::new(agent_id, reason);
            runtime.episodes.record_intervention(&intervention).await?;
            if json {
                println!(
                    "{}",
                    serde_json::json!({ "intervention_id": intervention.id })
                );
            } else {
                println!("Recorded intervention {}", intervention.id);
            }
        }
    }
    Ok(())
}

pub async fn authorize(
    agent_id: &str,
    action: &str,
    force: bool,
    config: &WardenConfig,
    json: bool,
) -> Result<()> {
    let runtime = open_runtime(config).await?;
    let decision = if force {
        runtime.core.force_authorize(agent_id, action).await
    } else {
        runtime.core.authorize(agent_id, action).await
    };
    runtime.core.flush_audit().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&decision)?);
    } else if decision.allowed {
        println!("ALLOWED: {}", decision.reason);
    } else {
        println!("DENIED: {}", decision.reason);
    }
    Ok(())
}

pub async fn graduate(
    agent_id: &str,
    target: Option<MaturityLevel>,
    approver: Option<String>,
    token: Option<String>,
    config: &WardenConfig,
    json: bool,
) -> Result<()> {
    let runtime = open_runtime(config).await?;

    let approval = match (approver, token) {
        (Some(approver), Some(token)) => Some(ApprovalRequest { approver, token }),
        _ => None,
    };

    let result = match target {
        Some(target) => {
            runtime
                .core
                .request_transition(agent_id, target, approval.as_ref())
                .await
        }
        None => {
            runtime
                .core
                .evaluate_graduation(agent_id, approval.as_ref())
                .await
        }
    };
    runtime.core.flush_audit().await;
    let outcome = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else if outcome.promoted {
        println!(
            "PROMOTED {} -> {} (readiness {:.3})",
            outcome.from_level, outcome.to_level, outcome.readiness.score
        );
    } else {
        println!(
            "NOT PROMOTED ({} -> {}, readiness {:.3})",
            outcome.from_level, outcome.to_level, outcome.readiness.score
        );
        for unmet in &outcome.unmet {
            println!("  unmet {unmet}");
        }
    }
    Ok(())
}

pub async fn retrieve(
    agent_id: &str,
    query: &str,
    k: usize,
    config: &WardenConfig,
    json: bool,
) -> Result<()> {
    let runtime = open_runtime(config).await?;
    let ranked = runtime.core.retrieve_episodes(agent_id, query, k).await?;

    if json {
        let rows: Vec<_> = ranked
            .iter()
            .map(|r| serde_json::json!({ "episode_id": r.episode_id, "score": r.score }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec!["Episode", "Score"]);
        for r in &ranked {
            table.add_row(vec![r.episode_id.to_string(), format!("{:.4}", r.score)]);
        }
        println!("{table}");
    }
    Ok(())
}

pub async fn audit(
    agent: Option<String>,
    limit: usize,
    config: &WardenConfig,
    json: bool,
) -> Result<()> {
    let runtime = open_runtime(config).await?;
    let mut filter = AuditFilter::new().with_limit(limit);
    if let Some(agent) = agent {
        filter = filter.with_agent(agent);
    }
    let entries = runtime.core.query_audit(filter).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec!["Time", "Action", "Outcome", "Detail"]);
        for entry in &entries {
            table.add_row(vec![
                entry.timestamp.to_rfc3339(),
                entry.action.as_str().to_string(),
                entry.outcome.as_str().to_string(),
                entry.detail.clone(),
            ]);
        }
        println!("{table}");
    }
    Ok(())
}
