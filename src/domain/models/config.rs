//! Application settings.
//!
//! Loaded once at startup by the configuration loader and shared read-only
//! across all requests. Environment-derived credentials live here; the
//! provider preset table itself is in
//! [`crate::domain::models::provider::ProviderRegistry`].

use serde::{Deserialize, Serialize};

use crate::domain::models::provider::TERMINAL_PROVIDER;

/// Top-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Provider used when a request names none.
    pub default_provider: String,
    /// Providers tried, in order, after a retryable failure. The last entry
    /// must be the terminal/local profile.
    pub fallback_chain: Vec<String>,
    /// Base URL of the local Ollama server (embeddings and terminal profile).
    pub ollama_base_url: String,
    /// Per-provider API credentials.
    pub credentials: Credentials,
    /// Embedding client settings.
    pub embedding: EmbeddingSettings,
    /// Vector store settings.
    pub vector_store: VectorStoreSettings,
    /// Retrieval pipeline settings.
    pub retrieval: RetrievalSettings,
    /// Generation call settings.
    pub generation: GenerationSettings,
    /// Logging settings.
    pub logging: LoggingSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_provider: TERMINAL_PROVIDER.to_string(),
            fallback_chain: vec!["glm".to_string(), TERMINAL_PROVIDER.to_string()],
            ollama_base_url: "http://localhost:11434".to_string(),
            credentials: Credentials::default(),
            embedding: EmbeddingSettings::default(),
            vector_store: VectorStoreSettings::default(),
            retrieval: RetrievalSettings::default(),
            generation: GenerationSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

/// API keys per provider, read from config or `LECTERN_CREDENTIALS__*` env.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    /// OpenAI API key.
    pub openai_api_key: String,
    /// Anthropic API key.
    pub anthropic_api_key: String,
    /// DeepSeek API key.
    pub deepseek_api_key: String,
    /// Alibaba DashScope API key.
    pub qwen_api_key: String,
    /// Zhipu GLM API key.
    pub glm_api_key: String,
    /// Google AI Studio API key.
    pub gemini_api_key: String,
    /// OpenRouter API key.
    pub openrouter_api_key: String,
    /// SiliconFlow API key.
    pub siliconflow_api_key: String,
}

impl Credentials {
    /// Credential for a provider name. Unknown providers and the terminal
    /// profile yield an empty string (unauthenticated).
    pub fn api_key_for(&self, provider: &str) -> String {
        match provider {
            "openai" => self.openai_api_key.clone(),
            "anthropic" => self.anthropic_api_key.clone(),
            "deepseek" => self.deepseek_api_key.clone(),
            "qwen" => self.qwen_api_key.clone(),
            "glm" => self.glm_api_key.clone(),
            "gemini" => self.gemini_api_key.clone(),
            "openrouter" => self.openrouter_api_key.clone(),
            "siliconflow" => self.siliconflow_api_key.clone(),
            _ => String::new(),
        }
    }
}

/// Embedding client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding model served by the local Ollama instance.
    pub model: String,
    /// Request timeout in seconds. Embedding calls are short.
    pub timeout_secs: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "bge-m3:latest".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreSettings {
    /// Qdrant REST endpoint.
    pub url: String,
    /// Collection holding the corpus chunks.
    pub collection: String,
    /// Embedding dimension of the collection.
    pub vector_dim: usize,
    /// Request timeout in seconds. Search calls are short.
    pub timeout_secs: u64,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:6333".to_string(),
            collection: "corpus".to_string(),
            vector_dim: 1024,
            timeout_secs: 30,
        }
    }
}

/// Retrieval pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Result count for plain searches.
    pub default_top_k: usize,
    /// Result count fed into the augmented prompt after reranking.
    pub rerank_top_k: usize,
    /// Character budget applied to candidate content before rerank embedding.
    pub rerank_content_budget: usize,
    /// Segment size in characters for ingestion chunking.
    pub chunk_size: usize,
    /// Segment overlap in characters for forced splits.
    pub chunk_overlap: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            default_top_k: 10,
            rerank_top_k: 5,
            rerank_content_budget: 500,
            chunk_size: 200,
            chunk_overlap: 50,
        }
    }
}

/// Generation call settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Timeout for remote provider calls, in seconds.
    pub timeout_secs: u64,
    /// Timeout for the local terminal profile, in seconds. Local models are
    /// slower, so this budget is longer.
    pub local_timeout_secs: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 120,
            local_timeout_secs: 300,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Minimum level: trace, debug, info, warn, error.
    pub level: String,
    /// Output format: json or pretty.
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_chain_ends_at_terminal() {
        let settings = Settings::default();
        assert_eq!(
            settings.fallback_chain.last().map(String::as_str),
            Some(TERMINAL_PROVIDER)
        );
    }

    #[test]
    fn test_api_key_for_terminal_is_empty() {
        let credentials = Credentials {
            glm_api_key: "glm-secret".to_string(),
            ..Credentials::default()
        };
        assert_eq!(credentials.api_key_for("glm"), "glm-secret");
        assert_eq!(credentials.api_key_for(TERMINAL_PROVIDER), "");
        assert_eq!(credentials.api_key_for("nonexistent"), "");
    }
}
