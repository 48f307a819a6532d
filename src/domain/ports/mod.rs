//! Port trait definitions (Hexagonal Architecture)
//!
//! Async trait interfaces the infrastructure adapters implement:
//! - [`EmbeddingClient`]: text to fixed-dimension vector
//! - [`VectorStore`]: similarity search and candidate retrieval

pub mod embedding;
pub mod vector_store;

pub use embedding::EmbeddingClient;
pub use vector_store::{SearchFilters, VectorStore};
