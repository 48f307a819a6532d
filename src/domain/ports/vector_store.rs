//! Vector store port for similarity search and candidate retrieval.
//!
//! The index itself is an external collaborator; the core only depends on
//! this narrow contract.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::domain::errors::RetrievalResult;
use crate::domain::models::candidate::{CollectionInfo, RetrievalCandidate};

/// Equality filters applied to payload fields during search.
pub type SearchFilters = BTreeMap<String, serde_json::Value>;

/// Trait for vector stores.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or update documents. `ids`, `vectors` and `payloads` are
    /// parallel lists.
    async fn upsert(
        &self,
        ids: &[String],
        vectors: &[Vec<f32>],
        payloads: &[serde_json::Value],
    ) -> RetrievalResult<()>;

    /// Similarity search returning the `top_k` closest candidates.
    async fn search(
        &self,
        vector: &[f32],
        top_k: usize,
        filters: Option<&SearchFilters>,
    ) -> RetrievalResult<Vec<RetrievalCandidate>>;

    /// Status snapshot of the backing collection.
    async fn collection_info(&self) -> RetrievalResult<CollectionInfo>;
}
