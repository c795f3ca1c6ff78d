//! Permission gate: maturity-gated action authorization.
//!
//! Every action name maps to exactly one required tier; unknown actions
//! and unreachable stores both fail closed. Verdicts are memoized in the
//! [`DecisionCache`] and recomputed from the agent's *current* maturity on
//! every miss — never from a stale snapshot.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::models::{
    ActionRule, AuditAction, AuditActor, AuditEntry, AuditOutcome, DecisionBasis, MaturityLevel,
    PermissionDecision,
};
use crate::domain::ports::AgentRepository;
use crate::services::audit_trail::AuditTrail;
use crate::services::decision_cache::DecisionCache;

/// Immutable action-to-tier policy, validated at construction.
#[derive(Debug, Clone, Default)]
pub struct ActionRegistry {
    map: HashMap<String, MaturityLevel>,
}

impl ActionRegistry {
    /// Build from configuration rules. Later duplicates are rejected so
    /// an action never maps to two tiers.
    pub fn from_rules(rules: &[ActionRule]) -> Result<Self, String> {
        let mut map = HashMap::with_capacity(rules.len());
        for rule in rules {
            if rule.name.is_empty() {
                return Err("action rule with empty name".to_string());
            }
            if map.insert(rule.name.clone(), rule.required).is_some() {
                return Err(format!("duplicate action rule: {}", rule.name));
            }
        }
        Ok(Self { map })
    }

    pub fn required_tier(&self, action: &str) -> Option<MaturityLevel> {
        self.map.get(action).copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// The permission gate.
pub struct PermissionGate {
    agents: Arc<dyn AgentRepository>,
    registry: ActionRegistry,
    cache: Arc<DecisionCache>,
    audit: AuditTrail,
    ttl_secs: u64,
}

impl PermissionGate {
    pub fn new(
        agents: Arc<dyn AgentRepository>,
        registry: ActionRegistry,
        cache: Arc<DecisionCache>,
        audit: AuditTrail,
        ttl_secs: u64,
    ) -> Self {
        Self {
            agents,
            registry,
            cache,
            audit,
            ttl_secs,
        }
    }

    /// Authorize `agent_id` to perform `action`.
    ///
    /// Always returns a verdict; "couldn't decide" surfaces as a denial
    /// with `basis = Infrastructure`, not as an error. Freshly computed
    /// verdicts are audited; cache hits repeat the already-audited one.
    pub async fn authorize(&self, agent_id: &str, action: &str) -> PermissionDecision {
        if let Some(cached) = self.cache.get(agent_id, action) {
            tracing::debug!(agent_id, action, "authorization served from cache");
            return cached;
        }

        let decision = self.compute(agent_id, action).await;

        // Infrastructure denials are never cached: a transient outage
        // must not poison the TTL window.
        if decision.basis == DecisionBasis::Policy {
            self.cache.insert(decision.clone());
        }
        self.record_audit(&decision);
        decision
    }

    /// Bypass and refresh the cached verdict for one `(agent, action)`.
    pub async fn force_authorize(&self, agent_id: &str, action: &str) -> PermissionDecision {
        self.cache.invalidate(agent_id, action);
        self.authorize(agent_id, action).await
    }

    /// Drop every cached verdict for an agent (called on maturity change).
    pub fn invalidate_agent(&self, agent_id: &str) -> usize {
        let removed = self.cache.invalidate_agent(agent_id);
        if removed > 0 {
            self.audit.record(
                AuditEntry::new(
                    AuditActor::System,
                    AuditAction::CacheInvalidated,
                    AuditOutcome::Success,
                    format!("invalidated {removed} cached decisions for {agent_id}"),
                )
                .with_metadata("agent_id", serde_json::json!(agent_id)),
            );
        }
        removed
    }

    async fn compute(&self, agent_id: &str, action: &str) -> PermissionDecision {
        let Some(required) = self.registry.required_tier(action) else {
            tracing::warn!(agent_id, action, "authorization for unregistered action");
            return PermissionDecision::denied_unknown_action(agent_id, action, self.ttl_secs);
        };

        match self.agents.get(agent_id).await {
            Ok(Some(agent)) => {
                if agent.satisfies(required) {
                    PermissionDecision::allowed(
                        agent_id,
                        action,
                        required,
                        agent.maturity,
                        self.ttl_secs,
                    )
                } else {
                    PermissionDecision::denied_tier(
                        agent_id,
                        action,
                        required,
                        agent.maturity,
                        self.ttl_secs,
                    )
                }
            }
            Ok(None) => {
                let mut decision =
                    PermissionDecision::denied_unknown_action(agent_id, action, self.ttl_secs);
                decision.required = Some(required);
                decision.reason = format!("unknown agent {agent_id:?}");
                decision
            }
            Err(err) => {
                tracing::error!(agent_id, action, error = %err, "agent store unreachable, failing closed");
                PermissionDecision::denied_unavailable(agent_id, action, &err.to_string())
            }
        }
    }

    fn record_audit(&self, decision: &PermissionDecision) {
        let (action, outcome) = if decision.allowed {
            (AuditAction::AuthorizationAllowed, AuditOutcome::Success)
        } else if decision.basis == DecisionBasis::Infrastructure {
            (AuditAction::AuthorizationDenied, AuditOutcome::Error)
        } else {
            (AuditAction::AuthorizationDenied, AuditOutcome::Denied)
        };

        let mut entry = AuditEntry::new(
            AuditActor::Agent {
                id: decision.agent_id.clone(),
            },
            action,
            outcome,
            decision.reason.clone(),
        )
        .with_metadata("action", serde_json::json!(decision.action));
        if let Some(required) = decision.required {
            entry = entry.with_metadata("required", serde_json::json!(required.to_string()));
        }
        if let Some(observed) = decision.observed {
            entry = entry.with_metadata("observed", serde_json::json!(observed.to_string()));
        }
        self.audit.record(entry);
    }
}
