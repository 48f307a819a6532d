//! CLI command implementations.

pub mod ask;
pub mod info;
pub mod ingest;
pub mod providers;
pub mod search;

use std::sync::Arc;

use anyhow::Result;

use crate::domain::models::{ProviderRegistry, Settings};
use crate::domain::ports::{EmbeddingClient, VectorStore};
use crate::infrastructure::embeddings::OllamaEmbeddingClient;
use crate::infrastructure::vector::QdrantStore;
use crate::services::gateway::GenerationGateway;
use crate::services::RetrievalOrchestrator;

/// Shared wiring for command handlers.
pub struct AppContext {
    pub settings: Settings,
    pub gateway: Arc<GenerationGateway>,
    pub orchestrator: RetrievalOrchestrator,
    pub embedding: Arc<dyn EmbeddingClient>,
    pub vector_store: Arc<dyn VectorStore>,
}

impl AppContext {
    /// Build all adapters and services from validated settings.
    pub fn build(settings: Settings) -> Result<Self> {
        let registry = ProviderRegistry::builtin();
        let gateway = Arc::new(GenerationGateway::new(registry, &settings)?);

        let embedding: Arc<dyn EmbeddingClient> = Arc::new(OllamaEmbeddingClient::new(
            settings.ollama_base_url.clone(),
            &settings.embedding,
        )?);
        let vector_store: Arc<dyn VectorStore> = Arc::new(QdrantStore::new(&settings.vector_store)?);

        let orchestrator = RetrievalOrchestrator::new(
            Arc::clone(&embedding),
            Arc::clone(&vector_store),
            Arc::clone(&gateway),
            settings.retrieval.clone(),
        );

        Ok(Self {
            settings,
            gateway,
            orchestrator,
            embedding,
            vector_store,
        })
    }
}
