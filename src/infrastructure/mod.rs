//! Infrastructure layer module
//!
//! External integrations and process wiring:
//! - Ollama embedding client
//! - Qdrant vector store adapter
//! - Configuration loading (figment)
//! - Tracing subscriber setup

pub mod config;
pub mod embeddings;
pub mod logging;
pub mod vector;

pub use config::{ConfigError, ConfigLoader};
pub use embeddings::OllamaEmbeddingClient;
pub use vector::QdrantStore;
