//! Domain models: pure data with no IO.

pub mod agent;
pub mod audit;
pub mod config;
pub mod decision;
pub mod episode;
pub mod graduation;

pub use agent::{Agent, MaturityLevel};
pub use audit::{AuditAction, AuditActor, AuditEntry, AuditFilter, AuditOutcome};
pub use config::{
    ActionRule, ApprovalConfig, AuditConfig, CacheConfig, DatabaseConfig, GraduationConfig,
    LoggingConfig, RetrievalConfig, WardenConfig,
};
pub use decision::{DecisionBasis, PermissionDecision};
pub use episode::{Episode, EpisodeSegment, EpisodeStatus, Intervention};
pub use graduation::{
    GraduationOutcome, GraduationRecord, GraduationThresholds, ReadinessScore, ReadinessWeights,
    UnmetThreshold, WindowStats,
};
