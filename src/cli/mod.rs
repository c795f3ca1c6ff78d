//! Operator command-line interface.

pub mod commands;

use clap::{Parser, Subcommand};

use crate::domain::models::MaturityLevel;

/// Warden - trust and access control for autonomous agents
#[derive(Debug, Parser)]
#[command(name = "warden", version, about)]
pub struct Cli {
    /// Emit machine-readable JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    /// Path to a config file (defaults to .warden/config.yaml hierarchy)
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create the .warden directory, config, and database
    Init,

    /// Manage agents
    #[command(subcommand)]
    Agent(AgentCommands),

    /// Record episodes and interventions (ingestion tooling)
    #[command(subcommand)]
    Episode(EpisodeCommands),

    /// Authorize an agent to perform an action
    Authorize {
        agent_id: String,
        action: String,
        /// Bypass and refresh the cached verdict
        #[arg(long)]
        force: bool,
    },

    /// Evaluate graduation to the agent's next maturity level
    Graduate {
        agent_id: String,
        /// Explicit target level; anything but the next level is rejected
        #[arg(long)]
        target: Option<MaturityLevel>,
        /// Approver identity recorded on the graduation record
        #[arg(long)]
        approver: Option<String>,
        /// Approval token, checked against the configured secret
        #[arg(long, env = "WARDEN_APPROVAL_TOKEN")]
        token: Option<String>,
    },

    /// Retrieve the most relevant episodes for a query
    Retrieve {
        agent_id: String,
        query: String,
        #[arg(short, default_value_t = 10)]
        k: usize,
    },

    /// Inspect the audit log
    Audit {
        /// Filter by agent id
        #[arg(long)]
        agent: Option<String>,
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
}

#[derive(Debug, Subcommand)]
pub enum AgentCommands {
    /// Register a new agent at STUDENT level
    Add {
        agent_id: String,
        #[arg(long)]
        display_name: Option<String>,
    },
    /// List all agents and their maturity
    List,
}

#[derive(Debug, Subcommand)]
pub enum EpisodeCommands {
    /// Record a completed episode
    Add {
        agent_id: String,
        title: String,
        #[arg(long, default_value = "")]
        summary: String,
        #[arg(long, default_value_t = 1.0)]
        compliance: f64,
        #[arg(long, default_value_t = 0)]
        violations: u32,
    },
    /// Record an intervention
    Intervene { agent_id: String, reason: String },
}

/// Print an error in the requested format and exit non-zero.
pub fn handle_error(err: anyhow::Error, json: bool) {
    if json {
        eprintln!(
            "{}",
            serde_json::json!({ "error": format!("{err:#}") })
        );
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1);
}
