//! Typed configuration for the Warden core.
//!
//! Every tunable the platform policy leaves open (threshold literals, readiness
//! weights, cache sizing, retrieval depths) lives here, loaded once by the
//! `ConfigLoader` and validated before anything is constructed from it.

use serde::{Deserialize, Serialize};

use crate::domain::models::graduation::{GraduationThresholds, ReadinessWeights};
use crate::domain::models::MaturityLevel;

/// Main configuration structure for Warden.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WardenConfig {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Decision cache configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Hybrid retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Graduation engine configuration
    #[serde(default)]
    pub graduation: GraduationConfig,

    /// Audit trail configuration
    #[serde(default)]
    pub audit: AuditConfig,

    /// Action-to-tier policy. Unknown actions always fail closed, so this
    /// list is the complete authorization surface.
    #[serde(default)]
    pub actions: Vec<ActionRule>,
}

impl Default for WardenConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
            cache: CacheConfig::default(),
            retrieval: RetrievalConfig::default(),
            graduation: GraduationConfig::default(),
            audit: AuditConfig::default(),
            actions: Vec::new(),
        }
    }
}

/// One action-name-to-required-tier mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ActionRule {
    pub name: String,
    pub required: MaturityLevel,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".warden/warden.db".to_string()
}

const fn default_max_connections() -> u32 {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Optional directory for rolling file output; stderr only when unset.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            directory: None,
        }
    }
}

/// Decision cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CacheConfig {
    /// Maximum cached verdicts before LRU eviction.
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,

    /// Verdict time-to-live, seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

const fn default_cache_capacity() -> usize {
    4096
}

const fn default_cache_ttl_secs() -> u64 {
    30
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

/// Hybrid retrieval configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetrievalConfig {
    /// Candidates selected by the coarse pass.
    #[serde(default = "default_coarse_k")]
    pub coarse_k: usize,

    /// Results surviving the rerank pass.
    #[serde(default = "default_final_k")]
    pub final_k: usize,

    /// Budget for one embedding call before degrading to keyword-only.
    #[serde(default = "default_embed_timeout_ms")]
    pub embed_timeout_ms: u64,

    /// Coarse blend weight for keyword overlap.
    #[serde(default = "default_keyword_weight")]
    pub keyword_weight: f64,

    /// Coarse blend weight for vector similarity.
    #[serde(default = "default_vector_weight")]
    pub vector_weight: f64,
}

const fn default_coarse_k() -> usize {
    50
}

const fn default_final_k() -> usize {
    10
}

const fn default_embed_timeout_ms() -> u64 {
    2_000
}

const fn default_keyword_weight() -> f64 {
    0.5
}

const fn default_vector_weight() -> f64 {
    0.5
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            coarse_k: default_coarse_k(),
            final_k: default_final_k(),
            embed_timeout_ms: default_embed_timeout_ms(),
            keyword_weight: default_keyword_weight(),
            vector_weight: default_vector_weight(),
        }
    }
}

/// Per-transition thresholds plus the readiness formula's tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GraduationConfig {
    /// Evaluation window, days of history considered.
    #[serde(default = "default_window_days")]
    pub window_days: i64,

    #[serde(default)]
    pub weights: ReadinessWeights,

    /// Cap on the context-aware evidence bonus. Never negative.
    #[serde(default = "default_context_bonus_cap")]
    pub context_bonus_cap: f64,

    /// Probe query used to select exam evidence via the retrieval engine.
    #[serde(default = "default_evidence_query")]
    pub evidence_query: String,

    /// Evidence episodes inspected for the context bonus.
    #[serde(default = "default_evidence_k")]
    pub evidence_k: usize,

    #[serde(default = "default_student_to_intern")]
    pub student_to_intern: GraduationThresholds,

    #[serde(default = "default_intern_to_supervised")]
    pub intern_to_supervised: GraduationThresholds,

    #[serde(default = "default_supervised_to_autonomous")]
    pub supervised_to_autonomous: GraduationThresholds,

    #[serde(default)]
    pub approval: ApprovalConfig,
}

const fn default_window_days() -> i64 {
    90
}

const fn default_context_bonus_cap() -> f64 {
    0.1
}

fn default_evidence_query() -> String {
    "policy compliance interventions corrections".to_string()
}

const fn default_evidence_k() -> usize {
    10
}

const fn default_student_to_intern() -> GraduationThresholds {
    GraduationThresholds {
        min_episodes: 10,
        max_intervention_rate: 0.50,
        min_compliance: 0.70,
    }
}

const fn default_intern_to_supervised() -> GraduationThresholds {
    GraduationThresholds {
        min_episodes: 25,
        max_intervention_rate: 0.20,
        min_compliance: 0.85,
    }
}

const fn default_supervised_to_autonomous() -> GraduationThresholds {
    GraduationThresholds {
        min_episodes: 50,
        max_intervention_rate: 0.0,
        min_compliance: 0.95,
    }
}

impl Default for GraduationConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
            weights: ReadinessWeights::default(),
            context_bonus_cap: default_context_bonus_cap(),
            evidence_query: default_evidence_query(),
            evidence_k: default_evidence_k(),
            student_to_intern: default_student_to_intern(),
            intern_to_supervised: default_intern_to_supervised(),
            supervised_to_autonomous: default_supervised_to_autonomous(),
            approval: ApprovalConfig::default(),
        }
    }
}

impl GraduationConfig {
    /// Thresholds for a promotion into `target`, or `None` when `target`
    /// is not a promotion destination (STUDENT has no inbound transition).
    pub fn thresholds_into(&self, target: MaturityLevel) -> Option<GraduationThresholds> {
        match target {
            MaturityLevel::Student => None,
            MaturityLevel::Intern => Some(self.student_to_intern),
            MaturityLevel::Supervised => Some(self.intern_to_supervised),
            MaturityLevel::Autonomous => Some(self.supervised_to_autonomous),
        }
    }
}

/// Human-approval gating for sensitive promotions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ApprovalConfig {
    /// Promotions into these levels require a valid approval token.
    #[serde(default = "default_approval_levels")]
    pub required_for: Vec<MaturityLevel>,

    /// Shared secret the token is checked against, in constant time.
    /// Usually injected via `WARDEN_GRADUATION__APPROVAL__SECRET`.
    #[serde(default)]
    pub secret: Option<String>,
}

fn default_approval_levels() -> Vec<MaturityLevel> {
    vec![MaturityLevel::Autonomous]
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            required_for: default_approval_levels(),
            secret: None,
        }
    }
}

/// Audit trail configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AuditConfig {
    /// Bounded queue depth between callers and the audit worker.
    #[serde(default = "default_audit_queue_capacity")]
    pub queue_capacity: usize,
}

const fn default_audit_queue_capacity() -> usize {
    1024
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_audit_queue_capacity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds_match_policy() {
        let config = GraduationConfig::default();
        assert_eq!(config.student_to_intern.min_episodes, 10);
        assert!((config.student_to_intern.max_intervention_rate - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.intern_to_supervised.min_episodes, 25);
        assert_eq!(config.supervised_to_autonomous.min_episodes, 50);
        assert!((config.supervised_to_autonomous.max_intervention_rate).abs() < f64::EPSILON);
    }

    #[test]
    fn test_thresholds_into() {
        let config = GraduationConfig::default();
        assert!(config.thresholds_into(MaturityLevel::Student).is_none());
        assert_eq!(
            config
                .thresholds_into(MaturityLevel::Supervised)
                .unwrap()
                .min_episodes,
            25
        );
    }

    #[test]
    fn test_config_deserializes_from_partial_yaml() {
        let config: WardenConfig = serde_json::from_value(serde_json::json!({
            "cache": {"capacity": 16},
            "actions": [{"name": "submit_form", "required": "supervised"}]
        }))
        .unwrap();
        assert_eq!(config.cache.capacity, 16);
        assert_eq!(config.cache.ttl_secs, default_cache_ttl_secs());
        assert_eq!(config.actions[0].required, MaturityLevel::Supervised);
    }
}
