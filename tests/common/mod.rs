//! Shared mock ports and fixtures for integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use warden::domain::errors::{GovernanceError, GovernanceResult};
use warden::domain::models::{
    Agent, AuditEntry, AuditFilter, Episode, EpisodeSegment, GraduationRecord, MaturityLevel,
};
use warden::domain::ports::embedding::{EmbeddingInput, EmbeddingOutput};
use warden::domain::ports::{
    AgentRepository, AuditSink, EmbeddingProvider, EpisodeStore, GraduationRecordStore,
};

// ========================
// Mock Implementations
// ========================

pub struct MockAgentRepository {
    agents: Mutex<HashMap<String, Agent>>,
    pub get_count: AtomicUsize,
    pub unavailable: AtomicBool,
}

impl MockAgentRepository {
    pub fn new() -> Self {
        Self {
            agents: Mutex::new(HashMap::new()),
            get_count: AtomicUsize::new(0),
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn with_agent(self, id: &str, maturity: MaturityLevel) -> Self {
        self.add_agent(id, maturity);
        self
    }

    pub fn add_agent(&self, id: &str, maturity: MaturityLevel) {
        let agent = Agent::new(id, id).with_maturity(maturity);
        self.agents.lock().unwrap().insert(id.to_string(), agent);
    }

    pub fn get_calls(&self) -> usize {
        self.get_count.load(Ordering::SeqCst)
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn maturity_of(&self, id: &str) -> Option<MaturityLevel> {
        self.agents.lock().unwrap().get(id).map(|a| a.maturity)
    }
}

#[async_trait]
impl AgentRepository for MockAgentRepository {
    async fn get(&self, agent_id: &str) -> GovernanceResult<Option<Agent>> {
        self.get_count.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(GovernanceError::StoreUnavailable(
                "mock store offline".to_string(),
            ));
        }
        Ok(self.agents.lock().unwrap().get(agent_id).cloned())
    }

    async fn upsert(&self, agent: &Agent) -> GovernanceResult<()> {
        self.agents
            .lock()
            .unwrap()
            .insert(agent.id.clone(), agent.clone());
        Ok(())
    }

    async fn promote(
        &self,
        agent_id: &str,
        from: MaturityLevel,
        to: MaturityLevel,
    ) -> GovernanceResult<()> {
        let mut agents = self.agents.lock().unwrap();
        let agent = agents
            .get_mut(agent_id)
            .ok_or_else(|| GovernanceError::AgentNotFound(agent_id.to_string()))?;
        if agent.maturity != from {
            return Err(GovernanceError::ConcurrencyConflict {
                agent_id: agent_id.to_string(),
            });
        }
        agent.maturity = to;
        agent.updated_at = Utc::now();
        Ok(())
    }

    async fn list(&self) -> GovernanceResult<Vec<Agent>> {
        Ok(self.agents.lock().unwrap().values().cloned().collect())
    }
}

pub struct MockEpisodeStore {
    episodes: Mutex<Vec<Episode>>,
    interventions: Mutex<HashMap<String, u64>>,
    pub unavailable: AtomicBool,
    pub list_count: AtomicUsize,
}

impl MockEpisodeStore {
    pub fn new() -> Self {
        Self {
            episodes: Mutex::new(Vec::new()),
            interventions: Mutex::new(HashMap::new()),
            unavailable: AtomicBool::new(false),
            list_count: AtomicUsize::new(0),
        }
    }

    pub fn add_episode(&self, episode: Episode) {
        self.episodes.lock().unwrap().push(episode);
    }

    pub fn set_interventions(&self, agent_id: &str, count: u64) {
        self.interventions
            .lock()
            .unwrap()
            .insert(agent_id.to_string(), count);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl EpisodeStore for MockEpisodeStore {
    async fn list_episodes(
        &self,
        agent_id: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> GovernanceResult<Vec<Episode>> {
        self.list_count.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(GovernanceError::StoreUnavailable(
                "mock store offline".to_string(),
            ));
        }
        Ok(self
            .episodes
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.agent_id == agent_id && e.ended_at >= since && e.ended_at <= until)
            .cloned()
            .collect())
    }

    async fn count_interventions(
        &self,
        agent_id: &str,
        _since: DateTime<Utc>,
        _until: DateTime<Utc>,
    ) -> GovernanceResult<u64> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(GovernanceError::StoreUnavailable(
                "mock store offline".to_string(),
            ));
        }
        Ok(*self
            .interventions
            .lock()
            .unwrap()
            .get(agent_id)
            .unwrap_or(&0))
    }
}

pub struct MemoryAuditSink {
    pub entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn append(&self, entry: &AuditEntry) -> GovernanceResult<()> {
        self.entries.lock().unwrap().push(entry.clone());
        Ok(())
    }

    async fn query(&self, filter: AuditFilter) -> GovernanceResult<Vec<AuditEntry>> {
        let mut matched: Vec<AuditEntry> = self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        if let Some(limit) = filter.limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }
}

pub struct MemoryGraduationStore {
    pub records: Mutex<Vec<GraduationRecord>>,
}

impl MemoryGraduationStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
        }
    }

    pub fn records(&self) -> Vec<GraduationRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl GraduationRecordStore for MemoryGraduationStore {
    async fn append(&self, record: &GraduationRecord) -> GovernanceResult<()> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn list_for_agent(&self, agent_id: &str) -> GovernanceResult<Vec<GraduationRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.agent_id == agent_id)
            .cloned()
            .collect())
    }
}

/// Deterministic bag-of-words embedding: each token hashes (FNV-1a) to a
/// bucket. Identical text always yields an identical vector, which is the
/// determinism contract real providers promise per model version.
pub struct HashEmbeddingProvider {
    dimension: usize,
    pub call_count: AtomicUsize,
}

impl HashEmbeddingProvider {
    pub fn new() -> Self {
        Self {
            dimension: 64,
            call_count: AtomicUsize::new(0),
        }
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
            for byte in token.bytes() {
                hash ^= u64::from(byte);
                hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
            }
            vector[(hash % self.dimension as u64) as usize] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbeddingProvider {
    fn name(&self) -> &'static str {
        "hash"
    }

    fn model_version(&self) -> &str {
        "fnv-64"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> GovernanceResult<Vec<f32>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        Ok(self.vectorize(text))
    }

    async fn embed_batch(
        &self,
        inputs: &[EmbeddingInput],
    ) -> GovernanceResult<Vec<EmbeddingOutput>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        Ok(inputs
            .iter()
            .map(|i| EmbeddingOutput {
                id: i.id.clone(),
                vector: self.vectorize(&i.text),
            })
            .collect())
    }

    fn max_batch_size(&self) -> usize {
        1024
    }
}

/// Provider that sleeps past any reasonable timeout before answering.
pub struct SlowEmbeddingProvider {
    pub delay_ms: u64,
}

#[async_trait]
impl EmbeddingProvider for SlowEmbeddingProvider {
    fn name(&self) -> &'static str {
        "slow"
    }

    fn model_version(&self) -> &str {
        "slow-1"
    }

    fn dimension(&self) -> usize {
        4
    }

    async fn embed(&self, _text: &str) -> GovernanceResult<Vec<f32>> {
        tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        Ok(vec![1.0; 4])
    }

    async fn embed_batch(
        &self,
        inputs: &[EmbeddingInput],
    ) -> GovernanceResult<Vec<EmbeddingOutput>> {
        tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        Ok(inputs
            .iter()
            .map(|i| EmbeddingOutput {
                id: i.id.clone(),
                vector: vec![1.0; 4],
            })
            .collect())
    }

    fn max_batch_size(&self) -> usize {
        1024
    }
}

// ========================
// Fixtures
// ========================

/// A completed episode ended `age_hours` ago.
pub fn episode(agent_id: &str, title: &str, summary: &str, age_hours: i64) -> Episode {
    Episode::new(agent_id, title)
        .with_summary(summary)
        .with_ended_at(Utc::now() - Duration::hours(age_hours))
}

/// An episode carrying rich interaction context.
pub fn rich_episode(agent_id: &str, title: &str, summary: &str, age_hours: i64) -> Episode {
    episode(agent_id, title, summary, age_hours).with_segment(EpisodeSegment::ToolCall {
        tool: "shell".to_string(),
        summary: summary.to_string(),
    })
}

/// Seed `count` clean episodes for an agent.
pub fn seed_episodes(store: &MockEpisodeStore, agent_id: &str, count: usize, compliance: f64) {
    for i in 0..count {
        store.add_episode(
            episode(
                agent_id,
                &format!("task {i}"),
                "routine work item",
                (i + 1) as i64,
            )
            .with_constitutional_score(compliance),
        );
    }
}
