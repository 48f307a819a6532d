//! Embedding provider port for semantic vector generation.
//!
//! Defines the trait for embedding providers that convert text into
//! dense vector representations for semantic similarity search.

use async_trait::async_trait;

use crate::domain::errors::RetrievalResult;

/// Trait for embedding providers.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> RetrievalResult<Vec<f32>>;

    /// Generate embeddings for multiple texts, sequentially.
    ///
    /// Used by the ingestion path; the reranker issues its own concurrent
    /// per-candidate calls instead.
    async fn embed_batch(&self, texts: &[String]) -> RetrievalResult<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }
}
