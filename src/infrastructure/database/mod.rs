//! SQLite persistence adapters.

pub mod agent_repo;
pub mod audit_repo;
pub mod connection;
pub mod episode_repo;
pub mod graduation_repo;
pub mod utils;

pub use agent_repo::SqliteAgentRepository;
pub use audit_repo::SqliteAuditSink;
pub use connection::DatabaseConnection;
pub use episode_repo::SqliteEpisodeStore;
pub use graduation_repo::SqliteGraduationStore;
