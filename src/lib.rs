//! Lectern - Retrieval-Augmented Question Answering
//!
//! Lectern answers questions about a fixed text corpus by combining vector
//! retrieval over a Qdrant collection with streaming generation through a
//! resilient multi-provider gateway (preset cloud providers plus a local
//! Ollama fallback).
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Pure models, ports, and error taxonomy
//! - **Service Layer** (`services`): Gateway, reranker, and orchestration logic
//! - **Infrastructure Layer** (`infrastructure`): Qdrant, Ollama, config, logging
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use lectern::services::RetrievalOrchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Load config, wire adapters, ask a question
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{GatewayError, RetrievalError};
pub use domain::models::{
    CollectionInfo, GenerationOptions, Message, ProviderProfile, ProviderRegistry,
    ResolvedConfig, RetrievalCandidate, Role, Settings,
};
pub use domain::ports::{EmbeddingClient, VectorStore};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::gateway::{ChatOutput, ChatStreamEvent};
pub use services::{GenerationGateway, RelevanceReranker, RetrievalOrchestrator, TextSegmenter};
