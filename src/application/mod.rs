//! Application layer: the `GovernanceCore` composition root.
//!
//! Everything is explicitly constructed and injected here — no global
//! registries or singletons. The process builds one `GovernanceCore` from
//! its configuration and port implementations and passes it by reference
//! to whoever needs verdicts.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::domain::errors::{GovernanceError, GovernanceResult};
use crate::domain::models::{
    AuditEntry, AuditFilter, GraduationOutcome, MaturityLevel, PermissionDecision, WardenConfig,
};
use crate::domain::ports::{
    AgentRepository, AuditSink, EmbeddingProvider, EpisodeStore, GraduationRecordStore,
};
use crate::services::{
    ActionRegistry, ApprovalRequest, AuditTrail, AuditTrailStats, CacheStats, DecisionCache,
    FeedbackTracker, GraduationEngine, HybridRetrievalEngine, PermissionGate, RankedEpisode,
};

/// The assembled governance core: permission gate, graduation engine,
/// hybrid retrieval, decision cache, audit trail, feedback tracker.
pub struct GovernanceCore {
    cache: Arc<DecisionCache>,
    gate: PermissionGate,
    graduation: GraduationEngine,
    retrieval: Arc<HybridRetrievalEngine>,
    audit: AuditTrail,
    audit_sink: Arc<dyn AuditSink>,
    feedback: FeedbackTracker,
    // Held so the audit worker stays a managed task rather than a
    // detached one; aborted when the core is dropped.
    audit_worker: JoinHandle<()>,
}

impl GovernanceCore {
    /// Wire the core from configuration and port implementations.
    pub fn new(
        config: &WardenConfig,
        agents: Arc<dyn AgentRepository>,
        episodes: Arc<dyn EpisodeStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        audit_sink: Arc<dyn AuditSink>,
        records: Arc<dyn GraduationRecordStore>,
    ) -> GovernanceResult<Self> {
        let registry =
            ActionRegistry::from_rules(&config.actions).map_err(GovernanceError::ValidationFailed)?;

        let cache = Arc::new(DecisionCache::new(
            config.cache.capacity,
            std::time::Duration::from_secs(config.cache.ttl_secs),
        ));
        let (audit, audit_worker) =
            AuditTrail::spawn(Arc::clone(&audit_sink), config.audit.queue_capacity);

        let retrieval = Arc::new(HybridRetrievalEngine::new(
            Arc::clone(&episodes),
            embedder,
            config.retrieval.clone(),
        ));

        let gate = PermissionGate::new(
            Arc::clone(&agents),
            registry,
            Arc::clone(&cache),
            audit.clone(),
            config.cache.ttl_secs,
        );

        let graduation = GraduationEngine::new(
            agents,
            episodes,
            Arc::clone(&retrieval),
            records,
            Arc::clone(&cache),
            audit.clone(),
            config.graduation.clone(),
        );

        Ok(Self {
            cache,
            gate,
            graduation,
            retrieval,
            audit,
            audit_sink,
            feedback: FeedbackTracker::new(),
            audit_worker,
        })
    }

    /// Authorize an action; cache-backed, fail-closed, synchronous from
    /// the caller's point of view.
    pub async fn authorize(&self, agent_id: &str, action: &str) -> PermissionDecision {
        self.gate.authorize(agent_id, action).await
    }

    /// Authorize bypassing (and refreshing) the cached verdict.
    pub async fn force_authorize(&self, agent_id: &str, action: &str) -> PermissionDecision {
        self.gate.force_authorize(agent_id, action).await
    }

    /// Evaluate promotion to the agent's next maturity level.
    pub async fn evaluate_graduation(
        &self,
        agent_id: &str,
        approval: Option<&ApprovalRequest>,
    ) -> GovernanceResult<GraduationOutcome> {
        self.graduation.evaluate_graduation(agent_id, approval).await
    }

    /// Evaluate promotion to an explicit target level; anything other
    /// than the next level is rejected.
    pub async fn request_transition(
        &self,
        agent_id: &str,
        target: MaturityLevel,
        approval: Option<&ApprovalRequest>,
    ) -> GovernanceResult<GraduationOutcome> {
        self.graduation
            .request_transition(agent_id, target, approval)
            .await
    }

    /// Retrieve the `k` most relevant episodes for a query.
    pub async fn retrieve_episodes(
        &self,
        agent_id: &str,
        query: &str,
        k: usize,
    ) -> GovernanceResult<Vec<RankedEpisode>> {
        self.retrieval.retrieve_episodes(agent_id, query, k).await
    }

    /// Record an empirically observed outcome (e.g. cache-hit prediction).
    pub fn record_feedback_outcome(&self, key: &str, success: bool) {
        self.feedback.record_outcome(key, success);
    }

    pub fn feedback_success_rate(&self, key: &str) -> Option<f64> {
        self.feedback.success_rate(key)
    }

    /// Drop every cached verdict for an agent.
    pub fn invalidate_agent(&self, agent_id: &str) -> usize {
        self.gate.invalidate_agent(agent_id)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn audit_stats(&self) -> AuditTrailStats {
        self.audit.stats()
    }

    /// Query the audit log directly (operator tooling).
    pub async fn query_audit(&self, filter: AuditFilter) -> GovernanceResult<Vec<AuditEntry>> {
        self.audit_sink.query(filter).await
    }

    /// Barrier: wait for recorded audit entries to reach the sink.
    pub async fn flush_audit(&self) {
        self.audit.flush().await;
    }
}

impl Drop for GovernanceCore {
    fn drop(&mut self) {
        self.audit_worker.abort();
    }
}
