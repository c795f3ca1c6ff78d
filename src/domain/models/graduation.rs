//! Graduation domain types: thresholds, readiness breakdown, outcomes,
//! and the append-only promotion record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::models::MaturityLevel;

/// Hard thresholds for one transition. Literals are configuration, not law;
/// the defaults mirror the platform's published policy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GraduationThresholds {
    /// Minimum completed episodes in the evaluation window.
    pub min_episodes: u64,
    /// Maximum intervention rate, in [0.0, 1.0].
    pub max_intervention_rate: f64,
    /// Minimum aggregate constitutional score, in [0.0, 1.0].
    pub min_compliance: f64,
}

/// Weights of the readiness formula. Must sum to 1.0.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ReadinessWeights {
    pub episode_volume: f64,
    pub intervention: f64,
    pub compliance: f64,
}

impl Default for ReadinessWeights {
    fn default() -> Self {
        Self {
            episode_volume: 0.4,
            intervention: 0.3,
            compliance: 0.3,
        }
    }
}

impl ReadinessWeights {
    pub fn sum(&self) -> f64 {
        self.episode_volume + self.intervention + self.compliance
    }
}

/// Episode statistics gathered over the evaluation window.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WindowStats {
    pub episode_count: u64,
    pub intervention_count: u64,
    pub violation_count: u64,
    /// Mean constitutional score across window episodes; 0 when empty.
    pub compliance_score: f64,
}

impl WindowStats {
    /// `interventions / episodes`, clamped to [0, 1]. An empty window has
    /// no meaningful rate and is treated as non-satisfying by the engine.
    pub fn intervention_rate(&self) -> f64 {
        if self.episode_count == 0 {
            return 1.0;
        }
        (self.intervention_count as f64 / self.episode_count as f64).clamp(0.0, 1.0)
    }
}

/// Readiness score with its component terms, every one clamped to [0, 1].
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessScore {
    pub score: f64,
    pub episode_score: f64,
    pub intervention_score: f64,
    pub compliance_score: f64,
    pub context_bonus: f64,
}

/// A threshold the agent failed to meet. Denied graduations enumerate every
/// unmet threshold, not just the first.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "threshold", rename_all = "snake_case")]
pub enum UnmetThreshold {
    EpisodeCount { have: u64, need: u64 },
    InterventionRate { have: f64, max: f64 },
    ComplianceScore { have: f64, min: f64 },
    /// The zero-tolerance exam: any logged violation fails promotion
    /// regardless of aggregate compliance.
    ConstitutionalViolations { count: u64 },
    /// Promotion into this level requires a valid approval token.
    Approval,
}

impl UnmetThreshold {
    /// Stable machine-readable name, used in audit metadata and outcomes.
    pub fn name(&self) -> &'static str {
        match self {
            Self::EpisodeCount { .. } => "episode_count",
            Self::InterventionRate { .. } => "intervention_rate",
            Self::ComplianceScore { .. } => "compliance_score",
            Self::ConstitutionalViolations { .. } => "constitutional_violations",
            Self::Approval => "approval",
        }
    }
}

impl fmt::Display for UnmetThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EpisodeCount { have, need } => {
                write!(f, "episode_count: {have} of {need} required")
            }
            Self::InterventionRate { have, max } => {
                write!(f, "intervention_rate: {have:.3} exceeds max {max:.3}")
            }
            Self::ComplianceScore { have, min } => {
                write!(f, "compliance_score: {have:.3} below min {min:.3}")
            }
            Self::ConstitutionalViolations { count } => {
                write!(f, "constitutional_violations: {count} logged, zero tolerated")
            }
            Self::Approval => write!(f, "approval: missing or invalid approval token"),
        }
    }
}

/// Result of one graduation evaluation. A failed evaluation is a normal,
/// fully audited outcome, not an error.
#[derive(Debug, Clone, Serialize)]
pub struct GraduationOutcome {
    pub agent_id: String,
    pub from_level: MaturityLevel,
    pub to_level: MaturityLevel,
    pub promoted: bool,
    pub readiness: ReadinessScore,
    pub stats: WindowStats,
    /// Empty when promoted.
    pub unmet: Vec<UnmetThreshold>,
}

impl GraduationOutcome {
    /// Names of all unmet thresholds, e.g. `["episode_count"]`.
    pub fn failed_thresholds(&self) -> Vec<&'static str> {
        self.unmet.iter().map(UnmetThreshold::name).collect()
    }
}

/// Append-only record written exactly once per successful promotion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraduationRecord {
    pub id: Uuid,
    pub agent_id: String,
    pub from_level: MaturityLevel,
    pub to_level: MaturityLevel,
    pub readiness: f64,
    pub episode_count: u64,
    pub intervention_rate: f64,
    pub constitutional_score: f64,
    pub approved_by: String,
    pub decided_at: DateTime<Utc>,
}

impl GraduationRecord {
    pub fn from_outcome(outcome: &GraduationOutcome, approved_by: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            agent_id: outcome.agent_id.clone(),
            from_level: outcome.from_level,
            to_level: outcome.to_level,
            readiness: outcome.readiness.score,
            episode_count: outcome.stats.episode_count,
            intervention_rate: outcome.stats.intervention_rate(),
            constitutional_score: outcome.stats.compliance_score,
            approved_by: approved_by.into(),
            decided_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intervention_rate_clamped() {
        let stats = WindowStats {
            episode_count: 4,
            intervention_count: 10,
            ..Default::default()
        };
        assert!((stats.intervention_rate() - 1.0).abs() < f64::EPSILON);

        let stats = WindowStats {
            episode_count: 30,
            intervention_count: 2,
            ..Default::default()
        };
        assert!((stats.intervention_rate() - (2.0 / 30.0)).abs() < 1e-9);
    }

    #[test]
    fn test_empty_window_rate_is_non_satisfying() {
        let stats = WindowStats::default();
        assert!((stats.intervention_rate() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_unmet_threshold_names() {
        let unmet = UnmetThreshold::EpisodeCount { have: 5, need: 10 };
        assert_eq!(unmet.name(), "episode_count");
        assert!(unmet.to_string().contains("5 of 10"));

        let unmet = UnmetThreshold::ConstitutionalViolations { count: 1 };
        assert_eq!(unmet.name(), "constitutional_violations");
    }

    #[test]
    fn test_default_weights_sum_to_one() {
        let weights = ReadinessWeights::default();
        assert!((weights.sum() - 1.0).abs() < 1e-9);
    }
}
