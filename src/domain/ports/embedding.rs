//! Embedding provider port for semantic vector generation.
//!
//! Providers are deterministic per model version: identical text under the
//! same `model_version` must yield an identical vector. The retrieval
//! engine leans on that for both caching and reproducible ranking.

use async_trait::async_trait;

use crate::domain::errors::GovernanceResult;

/// A single embedding request item.
#[derive(Debug, Clone)]
pub struct EmbeddingInput {
    /// Unique client-side ID for correlation.
    pub id: String,
    /// Text to embed.
    pub text: String,
}

/// A single embedding result.
#[derive(Debug, Clone)]
pub struct EmbeddingOutput {
    /// Correlation ID matching the input.
    pub id: String,
    /// The embedding vector.
    pub vector: Vec<f32>,
}

/// Trait for embedding providers (real-time and batch).
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Provider name (e.g., "openai", "null").
    fn name(&self) -> &'static str;

    /// Model version string; determinism is scoped to this.
    fn model_version(&self) -> &str;

    /// Embedding dimension for this provider/model.
    fn dimension(&self) -> usize;

    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> GovernanceResult<Vec<f32>>;

    /// Generate embeddings for multiple texts in a single call.
    async fn embed_batch(
        &self,
        inputs: &[EmbeddingInput],
    ) -> GovernanceResult<Vec<EmbeddingOutput>>;

    /// Maximum number of texts per single call.
    fn max_batch_size(&self) -> usize;
}
