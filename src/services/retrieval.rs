//! Hybrid episode retrieval: coarse pass then rerank.
//!
//! The coarse pass scores an agent's episodes with a cheap blend of
//! keyword overlap and embedding similarity over title + summary, keeping
//! the top `coarse_k`. The rerank pass re-scores only those survivors
//! against the full episode text and truncates to `final_k`.
//!
//! Guarantees enforced here:
//! - a reranked score is `max(refined, coarse)`, so reranking never drops
//!   a candidate below its coarse score (tolerance [`RERANK_EPSILON`]);
//! - no candidate is filtered between the passes, so whatever the coarse
//!   set ranked highest is still present when the final cut is taken;
//! - ordering is total (score, then `ended_at`, then id), so identical
//!   inputs under a fixed provider version return identical rankings.
//!
//! A slow or dead embedding provider degrades the engine to keyword-only
//! scoring instead of failing or blocking: every embedding call is bounded
//! by the configured timeout.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::errors::GovernanceResult;
use crate::domain::models::{Episode, RetrievalConfig};
use crate::domain::ports::embedding::EmbeddingInput;
use crate::domain::ports::{EmbeddingProvider, EpisodeStore};

/// Tolerance on the "rerank never lowers a score" invariant.
pub const RERANK_EPSILON: f64 = 1e-6;

/// One ranked retrieval result.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedEpisode {
    pub episode_id: Uuid,
    pub score: f64,
}

#[derive(Debug)]
struct Candidate {
    episode_id: Uuid,
    ended_at: DateTime<Utc>,
    coarse: f64,
    score: f64,
}

/// Coarse-then-rerank retrieval over an agent's episode history.
pub struct HybridRetrievalEngine {
    store: Arc<dyn EpisodeStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    config: RetrievalConfig,
}

impl HybridRetrievalEngine {
    pub fn new(
        store: Arc<dyn EpisodeStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            config,
        }
    }

    /// Convenience wrapper using the configured depths.
    pub async fn retrieve_episodes(
        &self,
        agent_id: &str,
        query: &str,
        k: usize,
    ) -> GovernanceResult<Vec<RankedEpisode>> {
        self.retrieve(agent_id, query, self.config.coarse_k, k, true)
            .await
    }

    /// Retrieve the `final_k` most relevant episodes for `query`.
    ///
    /// An empty episode history yields an empty list, not an error.
    pub async fn retrieve(
        &self,
        agent_id: &str,
        query: &str,
        coarse_k: usize,
        final_k: usize,
        use_rerank: bool,
    ) -> GovernanceResult<Vec<RankedEpisode>> {
        let episodes = self
            .store
            .list_episodes(agent_id, DateTime::<Utc>::MIN_UTC, Utc::now())
            .await?;
        if episodes.is_empty() || final_k == 0 {
            return Ok(Vec::new());
        }

        let query_tokens = tokenize(query);
        let query_vector = self.embed_bounded(query).await;

        let mut candidates = self
            .coarse_pass(&episodes, &query_tokens, query_vector.as_deref())
            .await;
        sort_candidates(&mut candidates);
        candidates.truncate(coarse_k.max(1));

        if use_rerank {
            self.rerank(&episodes, &query_tokens, query_vector.as_deref(), &mut candidates)
                .await;
            sort_candidates(&mut candidates);
        }
        candidates.truncate(final_k);

        Ok(candidates
            .into_iter()
            .map(|c| RankedEpisode {
                episode_id: c.episode_id,
                score: c.score,
            })
            .collect())
    }

    /// Coarse scores over title + summary for every episode.
    async fn coarse_pass(
        &self,
        episodes: &[Episode],
        query_tokens: &HashSet<String>,
        query_vector: Option<&[f32]>,
    ) -> Vec<Candidate> {
        let vectors = match query_vector {
            Some(_) => self.embed_texts(episodes, Episode::coarse_text).await,
            None => HashMap::new(),
        };

        episodes
            .iter()
            .map(|episode| {
                let keyword = keyword_score(query_tokens, &tokenize(&episode.coarse_text()));
                let score = self.blend(
                    keyword,
                    query_vector
                        .zip(vectors.get(&episode.id))
                        .map(|(q, v)| cosine_similarity(q, v)),
                );
                Candidate {
                    episode_id: episode.id,
                    ended_at: episode.ended_at,
                    coarse: score,
                    score,
                }
            })
            .collect()
    }

    /// Re-score coarse survivors against the full episode text. The final
    /// score never falls below the coarse score.
    async fn rerank(
        &self,
        episodes: &[Episode],
        query_tokens: &HashSet<String>,
        query_vector: Option<&[f32]>,
        candidates: &mut [Candidate],
    ) {
        let surviving: HashSet<Uuid> = candidates.iter().map(|c| c.episode_id).collect();
        let survivors: Vec<&Episode> = episodes
            .iter()
            .filter(|e| surviving.contains(&e.id))
            .collect();

        let vectors = match query_vector {
            Some(_) => {
                self.embed_borrowed_texts(&survivors, |e| e.full_text())
                    .await
            }
            None => HashMap::new(),
        };
        let by_id: HashMap<Uuid, &Episode> = survivors.iter().map(|e| (e.id, *e)).collect();

        for candidate in candidates.iter_mut() {
            let Some(episode) = by_id.get(&candidate.episode_id) else {
                continue;
            };
            let keyword = keyword_score(query_tokens, &tokenize(&episode.full_text()));
            let refined = self.blend(
                keyword,
                query_vector
                    .zip(vectors.get(&episode.id))
                    .map(|(q, v)| cosine_similarity(q, v)),
            );
            candidate.score = refined.max(candidate.coarse);
        }
    }

    /// Blend keyword and vector scores per configured weights. With no
    /// vector available the keyword weight carries the whole score.
    fn blend(&self, keyword: f64, vector: Option<f64>) -> f64 {
        let kw = self.config.keyword_weight.max(0.0);
        let vw = self.config.vector_weight.max(0.0);
        match vector {
            Some(v) if kw + vw > 0.0 => ((kw * keyword + vw * v) / (kw + vw)).clamp(0.0, 1.0),
            _ => keyword.clamp(0.0, 1.0),
        }
    }

    /// Embed one text inside the configured budget; `None` degrades the
    /// caller to keyword-only scoring.
    async fn embed_bounded(&self, text: &str) -> Option<Vec<f32>> {
        if self.config.vector_weight <= 0.0 {
            return None;
        }
        let budget = Duration::from_millis(self.config.embed_timeout_ms);
        match tokio::time::timeout(budget, self.embedder.embed(text)).await {
            Ok(Ok(vector)) => Some(vector),
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "embedding failed, degrading to keyword-only retrieval");
                None
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.config.embed_timeout_ms,
                    "embedding timed out, degrading to keyword-only retrieval"
                );
                None
            }
        }
    }

    async fn embed_texts(
        &self,
        episodes: &[Episode],
        text_of: impl Fn(&Episode) -> String,
    ) -> HashMap<Uuid, Vec<f32>> {
        let refs: Vec<&Episode> = episodes.iter().collect();
        self.embed_borrowed_texts(&refs, text_of).await
    }

    /// Batch-embed episode texts inside the timeout budget. An empty map
    /// means the provider was unavailable and scoring should degrade.
    async fn embed_borrowed_texts(
        &self,
        episodes: &[&Episode],
        text_of: impl Fn(&Episode) -> String,
    ) -> HashMap<Uuid, Vec<f32>> {
        if episodes.is_empty() {
            return HashMap::new();
        }
        let inputs: Vec<EmbeddingInput> = episodes
            .iter()
            .copied()
            .map(|e| EmbeddingInput {
                id: e.id.to_string(),
                text: text_of(e),
            })
            .collect();

        let budget = Duration::from_millis(self.config.embed_timeout_ms);
        match tokio::time::timeout(budget, self.embedder.embed_batch(&inputs)).await {
            Ok(Ok(outputs)) => outputs
                .into_iter()
                .filter_map(|o| Uuid::parse_str(&o.id).ok().map(|id| (id, o.vector)))
                .collect(),
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "batch embedding failed, degrading to keyword-only retrieval");
                HashMap::new()
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.config.embed_timeout_ms,
                    "batch embedding timed out, degrading to keyword-only retrieval"
                );
                HashMap::new()
            }
        }
    }
}

/// Score desc, then `ended_at` desc, then id for a total, stable order.
fn sort_candidates(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| b.ended_at.cmp(&a.ended_at))
            .then_with(|| a.episode_id.cmp(&b.episode_id))
    });
}

/// Lowercased alphanumeric tokens.
fn tokenize(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Fraction of query tokens present in the document, in [0, 1].
fn keyword_score(query: &HashSet<String>, document: &HashSet<String>) -> f64 {
    if query.is_empty() {
        return 0.0;
    }
    let matched = query.iter().filter(|t| document.contains(*t)).count();
    matched as f64 / query.len() as f64
}

/// Cosine similarity clamped to [0, 1]; zero for mismatched or empty
/// vectors.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += f64::from(*x) * f64::from(*y);
        norm_a += f64::from(*x) * f64::from(*x);
        norm_b += f64::from(*y) * f64::from(*y);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(0.0, 1.0)
}
