//! Warden - Trust and Access Control Core
//!
//! Warden decides, for every action an autonomous agent attempts, whether
//! the agent has earned sufficient privilege, and it is the mechanism by
//! which privilege grows: agents graduate through maturity levels on the
//! strength of auditable episodic history.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Pure models, ports, and the error taxonomy
//! - **Service Layer** (`services`): Permission gate, graduation engine,
//!   hybrid retrieval, decision cache, audit trail
//! - **Infrastructure Layer** (`infrastructure`): Config, logging, SQLite
//!   persistence, embedding providers
//! - **Application Layer** (`application`): The `GovernanceCore`
//!   composition root
//! - **CLI Layer** (`cli`): Operator command-line interface
//!
//! # Example
//!
//! ```ignore
//! use warden::application::GovernanceCore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Wire a GovernanceCore and authorize actions
//!     Ok(())
//! }
//! ```

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use application::GovernanceCore;
pub use domain::errors::{GovernanceError, GovernanceResult};
pub use domain::models::{
    Agent, AuditEntry, AuditFilter, Episode, EpisodeSegment, GraduationOutcome, GraduationRecord,
    MaturityLevel, PermissionDecision, WardenConfig,
};
pub use domain::ports::{
    AgentRepository, AuditSink, EmbeddingProvider, EpisodeStore, GraduationRecordStore,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{ApprovalRequest, DecisionCache, GraduationEngine, HybridRetrievalEngine, PermissionGate};
