//! Service layer: the governance subsystems.

pub mod approval;
pub mod audit_trail;
pub mod decision_cache;
pub mod feedback;
pub mod graduation;
pub mod permission;
pub mod retrieval;

pub use approval::{verify_approval_token, ApprovalRequest};
pub use audit_trail::{AuditTrail, AuditTrailStats};
pub use decision_cache::{CacheStats, DecisionCache};
pub use feedback::{FeedbackTracker, OutcomeStats};
pub use graduation::{compute_readiness, GraduationEngine};
pub use permission::{ActionRegistry, PermissionGate};
pub use retrieval::{HybridRetrievalEngine, RankedEpisode, RERANK_EPSILON};
