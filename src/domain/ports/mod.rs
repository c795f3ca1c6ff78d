//! Ports: the traits external collaborators implement.

pub mod agent_repository;
pub mod audit_sink;
pub mod embedding;
pub mod episode_store;
pub mod graduation_store;
pub mod null_embedding;

pub use agent_repository::AgentRepository;
pub use audit_sink::AuditSink;
pub use embedding::{EmbeddingInput, EmbeddingOutput, EmbeddingProvider};
pub use episode_store::EpisodeStore;
pub use graduation_store::GraduationRecordStore;
pub use null_embedding::NullEmbeddingProvider;
