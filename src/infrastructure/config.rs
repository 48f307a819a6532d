//! Configuration loading with hierarchical merging.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Settings;
use crate::domain::models::provider::{ProviderRegistry, TERMINAL_PROVIDER};

/// Configuration error types.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Fallback chain cannot be empty")]
    EmptyFallbackChain,

    #[error("Fallback chain must end with '{TERMINAL_PROVIDER}', found '{0}'")]
    ChainNotTerminated(String),

    #[error("Fallback chain entry '{0}' is not a preset provider")]
    UnknownChainProvider(String),

    #[error("Default provider '{0}' is not a preset provider")]
    UnknownDefaultProvider(String),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid vector_dim: {0}. Must be at least 1")]
    InvalidVectorDim(usize),

    #[error("Invalid rerank_top_k: {0}. Must be at least 1")]
    InvalidRerankTopK(usize),

    #[error(
        "Invalid segmentation: chunk_overlap ({overlap}) must be less than chunk_size ({size})"
    )]
    InvalidSegmentation {
        /// Configured chunk size.
        size: usize,
        /// Configured overlap.
        overlap: usize,
    },
}

/// Configuration loader with hierarchical merging.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load settings with hierarchical merging.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. lectern.yaml in the working directory
    /// 3. Environment variables (`LECTERN_` prefix, `__` nesting separator)
    pub fn load() -> Result<Settings> {
        let settings: Settings = Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Yaml::file("lectern.yaml"))
            .merge(Env::prefixed("LECTERN_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&settings)?;
        Ok(settings)
    }

    /// Load settings from a specific file.
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Settings> {
        let settings: Settings = Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&settings)?;
        Ok(settings)
    }

    /// Validate settings after loading.
    pub fn validate(settings: &Settings) -> Result<(), ConfigError> {
        let registry = ProviderRegistry::builtin();

        if !registry.contains(&settings.default_provider) {
            return Err(ConfigError::UnknownDefaultProvider(
                settings.default_provider.clone(),
            ));
        }

        let Some(last) = settings.fallback_chain.last() else {
            return Err(ConfigError::EmptyFallbackChain);
        };
        if last != TERMINAL_PROVIDER {
            return Err(ConfigError::ChainNotTerminated(last.clone()));
        }
        for entry in &settings.fallback_chain {
            if !registry.contains(entry) {
                return Err(ConfigError::UnknownChainProvider(entry.clone()));
            }
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&settings.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(settings.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&settings.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(
                settings.logging.format.clone(),
            ));
        }

        if settings.vector_store.vector_dim == 0 {
            return Err(ConfigError::InvalidVectorDim(
                settings.vector_store.vector_dim,
            ));
        }

        if settings.retrieval.rerank_top_k == 0 {
            return Err(ConfigError::InvalidRerankTopK(settings.retrieval.rerank_top_k));
        }

        if settings.retrieval.chunk_overlap >= settings.retrieval.chunk_size {
            return Err(ConfigError::InvalidSegmentation {
                size: settings.retrieval.chunk_size,
                overlap: settings.retrieval.chunk_overlap,
            });
        }

        Ok(())
    }
}
