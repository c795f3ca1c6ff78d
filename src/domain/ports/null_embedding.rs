//! Null embedding provider for embedding-less deployments.

use async_trait::async_trait;

use crate::domain::errors::{GovernanceError, GovernanceResult};
use crate::domain::ports::embedding::{EmbeddingInput, EmbeddingOutput, EmbeddingProvider};

/// Provider that always reports itself unavailable.
///
/// Wiring this in exercises the retrieval engine's degraded keyword-only
/// path, which is the intended behavior when no embedding backend is
/// configured.
#[derive(Debug, Default)]
pub struct NullEmbeddingProvider;

impl NullEmbeddingProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EmbeddingProvider for NullEmbeddingProvider {
    fn name(&self) -> &'static str {
        "null"
    }

    fn model_version(&self) -> &str {
        "null-0"
    }

    fn dimension(&self) -> usize {
        0
    }

    async fn embed(&self, _text: &str) -> GovernanceResult<Vec<f32>> {
        Err(GovernanceError::EmbeddingUnavailable(
            "null provider configured".to_string(),
        ))
    }

    async fn embed_batch(
        &self,
        _inputs: &[EmbeddingInput],
    ) -> GovernanceResult<Vec<EmbeddingOutput>> {
        Err(GovernanceError::EmbeddingUnavailable(
            "null provider configured".to_string(),
        ))
    }

    fn max_batch_size(&self) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_null_provider_is_unavailable() {
        let provider = NullEmbeddingProvider::new();
        assert!(matches!(
            provider.embed("anything").await,
            Err(GovernanceError::EmbeddingUnavailable(_))
        ));
        assert_eq!(provider.name(), "null");
        assert_eq!(provider.dimension(), 0);
    }
}
