//! Ollama embedding client.
//!
//! Calls the local Ollama `/api/embeddings` endpoint. Embedding calls are
//! short; the timeout budget is tight compared to generation calls.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::domain::errors::{RetrievalError, RetrievalResult};
use crate::domain::models::config::EmbeddingSettings;
use crate::domain::ports::EmbeddingClient;

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// Embedding client backed by a local Ollama server.
pub struct OllamaEmbeddingClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaEmbeddingClient {
    /// Create a client against the given Ollama base URL.
    pub fn new(base_url: impl Into<String>, settings: &EmbeddingSettings) -> RetrievalResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| RetrievalError::Embedding(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: settings.model.clone(),
        })
    }
}

#[async_trait]
impl EmbeddingClient for OllamaEmbeddingClient {
    async fn embed(&self, text: &str) -> RetrievalResult<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);
        debug!(model = %self.model, chars = text.chars().count(), "embedding request");

        let response = self
            .client
            .post(&url)
            .json(&EmbeddingRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await
            .map_err(|e| RetrievalError::Embedding(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RetrievalError::Embedding(format!("HTTP {status}: {body}")));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| RetrievalError::Embedding(format!("malformed response: {e}")))?;

        Ok(parsed.embedding)
    }
}
