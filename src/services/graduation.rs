//! Graduation engine: readiness scoring and maturity promotion.
//!
//! Evaluates an agent's episodic history against the configured
//! thresholds, applies the zero-tolerance compliance exam, and on success
//! promotes the agent one level, writes the graduation record, and
//! invalidates the agent's cached decisions. A failed evaluation is a
//! normal audited outcome carrying every unmet threshold.

use std::sync::Arc;
use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use chrono::Utc;

use crate::domain::errors::{GovernanceError, GovernanceResult};
use crate::domain::models::{
    Agent, AuditAction, AuditActor, AuditEntry, AuditOutcome, Episode, GraduationConfig,
    GraduationOutcome, GraduationRecord, GraduationThresholds, MaturityLevel, ReadinessScore,
    ReadinessWeights, UnmetThreshold, WindowStats,
};
use crate::domain::ports::{AgentRepository, EpisodeStore, GraduationRecordStore};
use crate::services::approval::{verify_approval_token, ApprovalRequest};
use crate::services::audit_trail::AuditTrail;
use crate::services::decision_cache::DecisionCache;
use crate::services::retrieval::HybridRetrievalEngine;

/// Pure readiness computation. Every term is clamped to [0, 1] before
/// weighting and the weighted sum plus bonus is clamped again, so no
/// combination of extreme inputs can leave the unit interval.
pub fn compute_readiness(
    stats: &WindowStats,
    thresholds: &GraduationThresholds,
    weights: &ReadinessWeights,
    context_bonus: f64,
) -> ReadinessScore {
    let episode_score = if thresholds.min_episodes == 0 {
        1.0
    } else {
        (stats.episode_count as f64 / thresholds.min_episodes as f64).clamp(0.0, 1.0)
    };

    let intervention_score = if stats.episode_count == 0 {
        // No history: the rate is undefined and treated as non-satisfying.
        0.0
    } else if thresholds.max_intervention_rate <= 0.0 {
        if stats.intervention_count == 0 {
            1.0
        } else {
            0.0
        }
    } else {
        (1.0 - stats.intervention_rate() / thresholds.max_intervention_rate).clamp(0.0, 1.0)
    };

    let compliance_score = stats.compliance_score.clamp(0.0, 1.0);
    let context_bonus = context_bonus.max(0.0);

    let score = (weights.episode_volume * episode_score
        + weights.intervention * intervention_score
        + weights.compliance * compliance_score
        + context_bonus)
        .clamp(0.0, 1.0);

    ReadinessScore {
        score,
        episode_score,
        intervention_score,
        compliance_score,
        context_bonus,
    }
}

/// The graduation engine.
pub struct GraduationEngine {
    agents: Arc<dyn AgentRepository>,
    episodes: Arc<dyn EpisodeStore>,
    retrieval: Arc<HybridRetrievalEngine>,
    records: Arc<dyn GraduationRecordStore>,
    cache: Arc<DecisionCache>,
    audit: AuditTrail,
    config: GraduationConfig,
}

impl GraduationEngine {
    pub fn new(
        agents: Arc<dyn AgentRepository>,
        episodes: Arc<dyn EpisodeStore>,
        retrieval: Arc<HybridRetrievalEngine>,
        records: Arc<dyn GraduationRecordStore>,
        cache: Arc<DecisionCache>,
        audit: AuditTrail,
        config: GraduationConfig,
    ) -> Self {
        Self {
            agents,
            episodes,
            retrieval,
            records,
            cache,
            audit,
            config,
        }
    }

    /// Evaluate promotion to the next level for `agent_id`.
    pub async fn evaluate_graduation(
        &self,
        agent_id: &str,
        approval: Option<&ApprovalRequest>,
    ) -> GovernanceResult<GraduationOutcome> {
        let agent = self.require_agent(agent_id).await?;
        let Some(target) = agent.maturity.next() else {
            return Err(GovernanceError::InvalidTransition {
                from: agent.maturity,
                to: agent.maturity,
            });
        };
        self.evaluate_transition(&agent, target, approval).await
    }

    /// Evaluate a promotion to an explicit target level.
    ///
    /// Anything other than `current + 1` — skips, reverses, standing still
    /// — is rejected with `InvalidTransition` and audited, never clamped
    /// to the nearest legal step.
    pub async fn request_transition(
        &self,
        agent_id: &str,
        target: MaturityLevel,
        approval: Option<&ApprovalRequest>,
    ) -> GovernanceResult<GraduationOutcome> {
        let agent = self.require_agent(agent_id).await?;
        if agent.maturity.next() != Some(target) {
            self.audit.record(
                AuditEntry::new(
                    AuditActor::Agent {
                        id: agent_id.to_string(),
                    },
                    AuditAction::GraduationRejected,
                    AuditOutcome::Denied,
                    format!(
                        "transition {} -> {} rejected: only single forward steps are permitted",
                        agent.maturity, target
                    ),
                )
                .with_metadata("from", serde_json::json!(agent.maturity.to_string()))
                .with_metadata("to", serde_json::json!(target.to_string())),
            );
            return Err(GovernanceError::InvalidTransition {
                from: agent.maturity,
                to: target,
            });
        }
        self.evaluate_transition(&agent, target, approval).await
    }

    async fn require_agent(&self, agent_id: &str) -> GovernanceResult<Agent> {
        self.agents
            .get(agent_id)
            .await?
            .ok_or_else(|| GovernanceError::AgentNotFound(agent_id.to_string()))
    }

    async fn evaluate_transition(
        &self,
        agent: &Agent,
        target: MaturityLevel,
        approval: Option<&ApprovalRequest>,
    ) -> GovernanceResult<GraduationOutcome> {
        let thresholds = self
            .config
            .thresholds_into(target)
            .ok_or(GovernanceError::InvalidTransition {
                from: agent.maturity,
                to: target,
            })?;

        let (stats, window_episodes) = match self.gather_stats_with_retry(&agent.id).await {
            Ok(gathered) => gathered,
            Err(err) => {
                // Deferred, not skipped: the caller is expected to retry.
                self.audit.record(
                    AuditEntry::new(
                        AuditActor::Agent {
                            id: agent.id.clone(),
                        },
                        AuditAction::GraduationDeferred,
                        AuditOutcome::Error,
                        format!("evaluation deferred: {err}"),
                    )
                    .with_metadata("to", serde_json::json!(target.to_string())),
                );
                return Err(err);
            }
        };

        let context_bonus = self.context_bonus(&agent.id, &window_episodes).await;
        let readiness = compute_readiness(&stats, &thresholds, &self.config.weights, context_bonus);

        let mut unmet = self.check_thresholds(&stats, &thresholds);
        if let Some(unmet_approval) = self.check_approval(target, approval) {
            unmet.push(unmet_approval);
        }

        let outcome = GraduationOutcome {
            agent_id: agent.id.clone(),
            from_level: agent.maturity,
            to_level: target,
            promoted: unmet.is_empty(),
            readiness,
            stats,
            unmet,
        };

        if outcome.promoted {
            self.commit_promotion(agent, &outcome, approval).await?;
        } else {
            self.audit.record(
                AuditEntry::new(
                    AuditActor::Agent {
                        id: agent.id.clone(),
                    },
                    AuditAction::GraduationDenied,
                    AuditOutcome::Denied,
                    outcome
                        .unmet
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join("; "),
                )
                .with_metadata("to", serde_json::json!(target.to_string()))
                .with_metadata(
                    "failed_thresholds",
                    serde_json::json!(outcome.failed_thresholds()),
                )
                .with_metadata("readiness", serde_json::json!(outcome.readiness.score)),
            );
        }

        Ok(outcome)
    }

    /// Promote, record, invalidate — in that order. The cache is only
    /// invalidated after the store commit, so a racing authorization can
    /// observe the old level but never one not yet reached.
    async fn commit_promotion(
        &self,
        agent: &Agent,
        outcome: &GraduationOutcome,
        approval: Option<&ApprovalRequest>,
    ) -> GovernanceResult<()> {
        self.agents
            .promote(&agent.id, outcome.from_level, outcome.to_level)
            .await?;

        let approved_by = approval.map_or("auto", |a| a.approver.as_str());
        let record = GraduationRecord::from_outcome(outcome, approved_by);
        if let Err(err) = self.records.append(&record).await {
            // The promotion is already committed; losing the record is an
            // operational problem, not grounds to revoke the new level.
            tracing::error!(agent_id = %agent.id, error = %err, "failed to append graduation record");
        }

        let invalidated = self.cache.invalidate_agent(&agent.id);
        tracing::info!(
            agent_id = %agent.id,
            from = %outcome.from_level,
            to = %outcome.to_level,
            readiness = outcome.readiness.score,
            invalidated,
            "agent promoted"
        );

        self.audit.record(
            AuditEntry::new(
                AuditActor::Agent {
                    id: agent.id.clone(),
                },
                AuditAction::GraduationPromoted,
                AuditOutcome::Success,
                format!("promoted {} -> {}", outcome.from_level, outcome.to_level),
            )
            .with_metadata("readiness", serde_json::json!(outcome.readiness.score))
            .with_metadata("approved_by", serde_json::json!(approved_by))
            .with_metadata("record_id", serde_json::json!(record.id)),
        );
        Ok(())
    }

    /// Gather window statistics, retrying transient store failures with
    /// exponential backoff before deferring the evaluation.
    async fn gather_stats_with_retry(
        &self,
        agent_id: &str,
    ) -> GovernanceResult<(WindowStats, Vec<Episode>)> {
        let until = Utc::now();
        let since = until - chrono::Duration::days(self.config.window_days);

        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(100))
            .with_max_elapsed_time(Some(Duration::from_secs(2)))
            .build();

        backoff::future::retry(policy, || async {
            self.gather_stats(agent_id, since, until)
                .await
                .map_err(|err| match err {
                    GovernanceError::StoreUnavailable(_) => backoff::Error::transient(err),
                    other => backoff::Error::permanent(other),
                })
        })
        .await
    }

    async fn gather_stats(
        &self,
        agent_id: &str,
        since: chrono::DateTime<Utc>,
        until: chrono::DateTime<Utc>,
    ) -> GovernanceResult<(WindowStats, Vec<Episode>)> {
        let (episodes, interventions) = futures::try_join!(
            self.episodes.list_episodes(agent_id, since, until),
            self.episodes.count_interventions(agent_id, since, until),
        )?;

        let episode_count = episodes.len() as u64;
        let violation_count = episodes.iter().map(|e| u64::from(e.violation_count)).sum();
        let compliance_score = if episodes.is_empty() {
            0.0
        } else {
            episodes
                .iter()
                .map(|e| e.constitutional_score.clamp(0.0, 1.0))
                .sum::<f64>()
                / episodes.len() as f64
        };

        Ok((
            WindowStats {
                episode_count,
                intervention_count: interventions,
                violation_count,
                compliance_score,
            },
            episodes,
        ))
    }

    /// Context-aware evidence bonus: retrieval picks the window episodes
    /// most relevant to the configured evidence query, and the fraction of
    /// those carrying rich interaction context scales into
    /// `[0, context_bonus_cap]`. Never negative; retrieval failure means
    /// no bonus, never a failed evaluation.
    async fn context_bonus(&self, agent_id: &str, window_episodes: &[Episode]) -> f64 {
        let cap = self.config.context_bonus_cap.max(0.0);
        if cap == 0.0 || window_episodes.is_empty() {
            return 0.0;
        }

        let evidence = match self
            .retrieval
            .retrieve_episodes(agent_id, &self.config.evidence_query, self.config.evidence_k)
            .await
        {
            Ok(ranked) => ranked,
            Err(err) => {
                tracing::warn!(agent_id, error = %err, "evidence retrieval failed, skipping context bonus");
                return 0.0;
            }
        };
        if evidence.is_empty() {
            return 0.0;
        }

        let rich = evidence
            .iter()
            .filter(|ranked| {
                window_episodes
                    .iter()
                    .any(|e| e.id == ranked.episode_id && e.has_rich_context())
            })
            .count();
        cap * (rich as f64 / evidence.len() as f64)
    }

    fn check_thresholds(
        &self,
        stats: &WindowStats,
        thresholds: &GraduationThresholds,
    ) -> Vec<UnmetThreshold> {
        let mut unmet = Vec::new();

        if stats.episode_count < thresholds.min_episodes {
            unmet.push(UnmetThreshold::EpisodeCount {
                have: stats.episode_count,
                need: thresholds.min_episodes,
            });
        }

        let rate = stats.intervention_rate();
        if rate > thresholds.max_intervention_rate {
            unmet.push(UnmetThreshold::InterventionRate {
                have: rate,
                max: thresholds.max_intervention_rate,
            });
        }

        if stats.compliance_score < thresholds.min_compliance {
            unmet.push(UnmetThreshold::ComplianceScore {
                have: stats.compliance_score,
                min: thresholds.min_compliance,
            });
        }

        // The exam: any logged violation fails promotion outright,
        // regardless of how high the aggregate score is.
        if stats.violation_count > 0 {
            unmet.push(UnmetThreshold::ConstitutionalViolations {
                count: stats.violation_count,
            });
        }

        unmet
    }

    fn check_approval(
        &self,
        target: MaturityLevel,
        approval: Option<&ApprovalRequest>,
    ) -> Option<UnmetThreshold> {
        if !self.config.approval.required_for.contains(&target) {
            return None;
        }
        let Some(secret) = self.config.approval.secret.as_deref() else {
            // No secret configured: approval gating is effectively off.
            return None;
        };
        match approval {
            Some(request) if verify_approval_token(&request.token, secret) => None,
            _ => Some(UnmetThreshold::Approval),
        }
    }
}
