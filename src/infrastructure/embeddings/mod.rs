//! Embedding provider adapters.

pub mod cached;
pub mod openai;

pub use cached::CachedEmbeddingProvider;
pub use openai::{OpenAiEmbeddingConfig, OpenAiEmbeddingProvider};
