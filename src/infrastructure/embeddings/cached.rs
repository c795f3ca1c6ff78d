//! Cached wrapper for `EmbeddingProvider` using a moka TTL cache.
//!
//! Providers are deterministic per model version, so identical text can be
//! served from cache without changing retrieval results. Batch calls are
//! split into cached hits and a residual batch for the inner provider.

use async_trait::async_trait;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::errors::GovernanceResult;
use crate::domain::ports::embedding::{EmbeddingInput, EmbeddingOutput, EmbeddingProvider};

/// Default TTL for cached vectors.
const VECTOR_CACHE_TTL_SECS: u64 = 600;

/// Maximum number of cached vectors.
const VECTOR_CACHE_MAX_CAPACITY: u64 = 10_000;

/// Caching decorator over any embedding provider.
pub struct CachedEmbeddingProvider<P: EmbeddingProvider> {
    inner: Arc<P>,
    /// Cache keyed by input text -> vector.
    vectors: Cache<String, Arc<Vec<f32>>>,
}

impl<P: EmbeddingProvider> CachedEmbeddingProvider<P> {
    /// Create with default TTL and capacity.
    pub fn new(inner: Arc<P>) -> Self {
        Self::with_ttl(inner, Duration::from_secs(VECTOR_CACHE_TTL_SECS))
    }

    /// Create with custom TTL.
    pub fn with_ttl(inner: Arc<P>, ttl: Duration) -> Self {
        let vectors = Cache::builder()
            .max_capacity(VECTOR_CACHE_MAX_CAPACITY)
            .time_to_live(ttl)
            .build();
        Self { inner, vectors }
    }

    pub fn entry_count(&self) -> u64 {
        self.vectors.entry_count()
    }
}

#[async_trait]
impl<P: EmbeddingProvider + 'static> EmbeddingProvider for CachedEmbeddingProvider<P> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn model_version(&self) -> &str {
        self.inner.model_version()
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    async fn embed(&self, text: &str) -> GovernanceResult<Vec<f32>> {
        if let Some(cached) = self.vectors.get(text).await {
            return Ok((*cached).clone());
        }

        let vector = self.inner.embed(text).await?;
        self.vectors
            .insert(text.to_string(), Arc::new(vector.clone()))
            .await;
        Ok(vector)
    }

    async fn embed_batch(
        &self,
        inputs: &[EmbeddingInput],
    ) -> GovernanceResult<Vec<EmbeddingOutput>> {
        let mut outputs = Vec::with_capacity(inputs.len());
        let mut misses = Vec::new();

        for input in inputs {
            match self.vectors.get(&input.text).await {
                Some(cached) => outputs.push(EmbeddingOutput {
                    id: input.id.clone(),
                    vector: (*cached).clone(),
                }),
                None => misses.push(input.clone()),
            }
        }

        if !misses.is_empty() {
            let fresh = self.inner.embed_batch(&misses).await?;
            for (input, output) in misses.iter().zip(&fresh) {
                self.vectors
                    .insert(input.text.clone(), Arc::new(output.vector.clone()))
                    .await;
            }
            outputs.extend(fresh);
        }

        Ok(outputs)
    }

    fn max_batch_size(&self) -> usize {
        self.inner.max_batch_size()
    }
}
