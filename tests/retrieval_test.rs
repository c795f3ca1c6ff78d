//! Integration tests for the hybrid retrieval engine: recall and ranking
//! quality, rerank monotonicity, determinism, and degraded modes.

mod common;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use common::{episode, HashEmbeddingProvider, MockEpisodeStore, SlowEmbeddingProvider};
use uuid::Uuid;
use warden::domain::models::RetrievalConfig;
use warden::domain::ports::NullEmbeddingProvider;
use warden::services::{HybridRetrievalEngine, RankedEpisode, RERANK_EPSILON};

const AGENT: &str = "researcher";

fn engine_with(
    store: Arc<MockEpisodeStore>,
    embedder: Arc<dyn warden::domain::ports::EmbeddingProvider>,
) -> HybridRetrievalEngine {
    HybridRetrievalEngine::new(store, embedder, RetrievalConfig::default())
}

/// Ten episodes about payment refunds (relevant) among twenty on
/// unrelated subjects. Returns the relevant ids.
fn seed_refund_corpus(store: &MockEpisodeStore) -> HashSet<Uuid> {
    let mut relevant = HashSet::new();
    for i in 0..10 {
        let e = episode(
            AGENT,
            &format!("payment refund dispute {i}"),
            "customer payment refund dispute resolved",
            i + 1,
        );
        relevant.insert(e.id);
        store.add_episode(e);
    }
    for i in 0..20 {
        store.add_episode(episode(
            AGENT,
            &format!("kernel scheduling research {i}"),
            "benchmarked context switch latency",
            i + 30,
        ));
    }
    relevant
}

fn ndcg_at_k(ranking: &[RankedEpisode], grade_of: impl Fn(Uuid) -> f64, k: usize) -> f64 {
    let dcg: f64 = ranking
        .iter()
        .take(k)
        .enumerate()
        .map(|(i, r)| (2f64.powf(grade_of(r.episode_id)) - 1.0) / ((i + 2) as f64).log2())
        .sum();

    let mut grades: Vec<f64> = ranking.iter().map(|r| grade_of(r.episode_id)).collect();
    grades.sort_by(|a, b| b.total_cmp(a));
    let ideal: f64 = grades
        .iter()
        .take(k)
        .enumerate()
        .map(|(i, g)| (2f64.powf(*g) - 1.0) / ((i + 2) as f64).log2())
        .sum();

    if ideal == 0.0 {
        0.0
    } else {
        dcg / ideal
    }
}

#[tokio::test]
async fn test_recall_at_10_meets_floor() {
    let store = Arc::new(MockEpisodeStore::new());
    let relevant = seed_refund_corpus(&store);
    let engine = engine_with(Arc::clone(&store), Arc::new(HashEmbeddingProvider::new()));

    let ranked = engine
        .retrieve(AGENT, "payment refund dispute", 30, 10, true)
        .await
        .unwrap();
    assert_eq!(ranked.len(), 10);

    let hit = ranked
        .iter()
        .filter(|r| relevant.contains(&r.episode_id))
        .count();
    let recall = hit as f64 / relevant.len().min(10) as f64;
    assert!(recall >= 0.90, "recall@10 was {recall}");
}

#[tokio::test]
async fn test_ndcg_at_10_meets_floor() {
    let store = Arc::new(MockEpisodeStore::new());

    // Graded corpus: strong matches, partial matches, noise.
    let mut strong = HashSet::new();
    let mut partial = HashSet::new();
    for i in 0..5 {
        let e = episode(
            AGENT,
            &format!("database migration rollback {i}"),
            "database migration rollback rehearsal",
            i + 1,
        );
        strong.insert(e.id);
        store.add_episode(e);
    }
    for i in 0..5 {
        let e = episode(
            AGENT,
            &format!("weekly migration notes {i}"),
            "summarized progress for stakeholders",
            i + 10,
        );
        partial.insert(e.id);
        store.add_episode(e);
    }
    for i in 0..15 {
        store.add_episode(episode(
            AGENT,
            &format!("ui polish pass {i}"),
            "tweaked button spacing",
            i + 20,
        ));
    }

    let engine = engine_with(Arc::clone(&store), Arc::new(HashEmbeddingProvider::new()));
    let ranked = engine
        .retrieve(AGENT, "database migration rollback", 25, 10, true)
        .await
        .unwrap();

    let grade = |id: Uuid| {
        if strong.contains(&id) {
            3.0
        } else if partial.contains(&id) {
            1.0
        } else {
            0.0
        }
    };
    let ndcg = ndcg_at_k(&ranked, grade, 10);
    assert!(ndcg >= 0.85, "ndcg@10 was {ndcg}");
}

#[tokio::test]
async fn test_rerank_never_lowers_coarse_scores() {
    let store = Arc::new(MockEpisodeStore::new());
    seed_refund_corpus(&store);
    let engine = engine_with(Arc::clone(&store), Arc::new(HashEmbeddingProvider::new()));

    let coarse_only = engine
        .retrieve(AGENT, "payment refund dispute", 30, 30, false)
        .await
        .unwrap();
    let reranked = engine
        .retrieve(AGENT, "payment refund dispute", 30, 30, true)
        .await
        .unwrap();

    for coarse in &coarse_only {
        let after = reranked
            .iter()
            .find(|r| r.episode_id == coarse.episode_id)
            .expect("rerank dropped a coarse candidate");
        assert!(
            after.score >= coarse.score - RERANK_EPSILON,
            "episode {} fell from {} to {}",
            coarse.episode_id,
            coarse.score,
            after.score
        );
    }
}

#[tokio::test]
async fn test_identical_queries_are_deterministic() {
    let store = Arc::new(MockEpisodeStore::new());
    seed_refund_corpus(&store);
    let engine = engine_with(Arc::clone(&store), Arc::new(HashEmbeddingProvider::new()));

    let first = engine
        .retrieve(AGENT, "payment refund dispute", 30, 10, true)
        .await
        .unwrap();
    let second = engine
        .retrieve(AGENT, "payment refund dispute", 30, 10, true)
        .await
        .unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_identical_text_yields_identical_embeddings() {
    use warden::domain::ports::EmbeddingProvider;

    let provider = HashEmbeddingProvider::new();
    let (a, b) = tokio_test::block_on(async {
        (
            provider.embed("customer payment refund dispute").await.unwrap(),
            provider.embed("customer payment refund dispute").await.unwrap(),
        )
    });
    assert_eq!(a, b);
}

#[tokio::test]
async fn test_empty_history_returns_empty_list() {
    let store = Arc::new(MockEpisodeStore::new());
    let engine = engine_with(store, Arc::new(HashEmbeddingProvider::new()));

    let ranked = engine
        .retrieve(AGENT, "anything at all", 30, 10, true)
        .await
        .unwrap();
    assert!(ranked.is_empty());
}

#[tokio::test]
async fn test_dead_provider_degrades_to_keyword_only() {
    let store = Arc::new(MockEpisodeStore::new());
    let relevant = seed_refund_corpus(&store);
    let engine = engine_with(Arc::clone(&store), Arc::new(NullEmbeddingProvider::new()));

    let ranked = engine
        .retrieve(AGENT, "payment refund dispute", 30, 10, true)
        .await
        .unwrap();
    // Reduced fidelity, not a hard failure: keyword overlap still finds
    // the refund episodes.
    assert_eq!(ranked.len(), 10);
    assert!(ranked.iter().all(|r| relevant.contains(&r.episode_id)));
}

#[tokio::test]
async fn test_slow_provider_hits_timeout_and_degrades() {
    let store = Arc::new(MockEpisodeStore::new());
    let relevant = seed_refund_corpus(&store);

    let config = RetrievalConfig {
        embed_timeout_ms: 50,
        ..Default::default()
    };
    let engine = HybridRetrievalEngine::new(
        Arc::clone(&store) as _,
        Arc::new(SlowEmbeddingProvider { delay_ms: 10_000 }),
        config,
    );

    let start = Instant::now();
    let ranked = engine
        .retrieve(AGENT, "payment refund dispute", 30, 10, true)
        .await
        .unwrap();
    // Bounded by the timeout budget, nowhere near the provider's delay.
    assert!(start.elapsed().as_millis() < 2_000);
    assert_eq!(ranked.len(), 10);
    assert!(ranked.iter().all(|r| relevant.contains(&r.episode_id)));
}

#[tokio::test]
async fn test_score_ties_break_by_recency() {
    let store = Arc::new(MockEpisodeStore::new());
    let older = episode(AGENT, "refund processed", "payment refund issued", 48);
    let newer = episode(AGENT, "refund processed", "payment refund issued", 1);
    let older_id = older.id;
    let newer_id = newer.id;
    store.add_episode(older);
    store.add_episode(newer);

    let engine = engine_with(store, Arc::new(HashEmbeddingProvider::new()));
    let ranked = engine
        .retrieve(AGENT, "payment refund", 10, 2, true)
        .await
        .unwrap();

    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0].episode_id, newer_id);
    assert_eq!(ranked[1].episode_id, older_id);
}
