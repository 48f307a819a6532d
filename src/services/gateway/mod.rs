//! Generation gateway: provider resolution, protocol dispatch, and the
//! cascading-fallback state machine.
//!
//! One request moves through three phases. Resolution turns per-request
//! overrides into a concrete [`ResolvedConfig`] (custom endpoints bypass the
//! preset table; preset names must exist in it). Dispatch selects a protocol
//! adapter from the provider name or endpoint host. The fallback machine
//! retries retryable failures down an ordered provider chain whose last
//! entry is the credential-free terminal profile; everything else propagates
//! immediately.

pub mod adapters;

use std::time::Duration;

use tracing::{debug, error, warn};

use crate::domain::errors::{GatewayError, GatewayResult};
use crate::domain::models::config::{Credentials, Settings};
use crate::domain::models::message::Message;
use crate::domain::models::provider::{
    GenerationOptions, ProviderRegistry, ResolvedConfig, CUSTOM_MODEL_PLACEHOLDER,
};

pub use adapters::{backend_kind, BackendKind, ChatAdapter, ChatOutput, ChatStreamEvent};

use adapters::{AnthropicAdapter, LocalAdapter, OpenAiCompatAdapter};

/// A preset provider together with its credential status, for listings.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ProviderStatus {
    /// Provider name.
    pub name: String,
    /// Preset base URL.
    pub base_url: String,
    /// Preset default model.
    pub default_model: String,
    /// Whether a credential is configured (always true for the terminal
    /// profile, which needs none).
    pub configured: bool,
}

/// The resilient multi-provider generation gateway.
///
/// Holds only read-only state (preset registry, credentials, chain) plus
/// pooled HTTP clients; every request builds its own [`ResolvedConfig`] and
/// walks its own chain position.
pub struct GenerationGateway {
    registry: ProviderRegistry,
    credentials: Credentials,
    default_provider: String,
    fallback_chain: Vec<String>,
    local: LocalAdapter,
    anthropic: AnthropicAdapter,
    openai: OpenAiCompatAdapter,
}

impl GenerationGateway {
    /// Create a gateway from a preset registry and settings.
    ///
    /// Remote providers share a client with the standard generation timeout;
    /// the local profile gets a longer budget since local models are slower.
    pub fn new(registry: ProviderRegistry, settings: &Settings) -> GatewayResult<Self> {
        let remote_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.generation.timeout_secs))
            .build()
            .map_err(|e| GatewayError::Transport(format!("failed to build HTTP client: {e}")))?;
        let local_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.generation.local_timeout_secs))
            .build()
            .map_err(|e| GatewayError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            registry,
            credentials: settings.credentials.clone(),
            default_provider: settings.default_provider.clone(),
            fallback_chain: settings.fallback_chain.clone(),
            local: LocalAdapter::new(local_client),
            anthropic: AnthropicAdapter::new(remote_client.clone()),
            openai: OpenAiCompatAdapter::new(remote_client),
        })
    }

    /// Resolve per-request overrides into a concrete generation target.
    ///
    /// A custom `base_url` bypasses preset-table validation entirely: the
    /// provider label stays informational and the model falls back to a
    /// generic placeholder. Otherwise the provider name must exist in the
    /// preset table, and endpoint/model/credential come from the preset
    /// merged with the request overrides.
    pub fn resolve(&self, options: &GenerationOptions) -> GatewayResult<ResolvedConfig> {
        let provider = options
            .provider
            .clone()
            .unwrap_or_else(|| self.default_provider.clone());

        if let Some(base_url) = &options.base_url {
            return Ok(ResolvedConfig {
                provider,
                base_url: base_url.clone(),
                api_key: options.api_key.clone().unwrap_or_default(),
                model: options
                    .model
                    .clone()
                    .unwrap_or_else(|| CUSTOM_MODEL_PLACEHOLDER.to_string()),
                is_fallback: false,
                original_provider: None,
                fallback_level: 0,
            });
        }

        let profile = self
            .registry
            .get(&provider)
            .ok_or_else(|| GatewayError::UnknownProvider {
                requested: provider.clone(),
                available: self.registry.names(),
            })?;

        Ok(ResolvedConfig {
            base_url: profile.base_url.clone(),
            api_key: options
                .api_key
                .clone()
                .unwrap_or_else(|| self.credentials.api_key_for(&provider)),
            model: options
                .model
                .clone()
                .unwrap_or_else(|| profile.default_model.clone()),
            provider,
            is_fallback: false,
            original_provider: None,
            fallback_level: 0,
        })
    }

    /// Call the resolved backend, degrading down the fallback chain on
    /// retryable failures.
    ///
    /// Requests resolved directly to the terminal profile skip the fallback
    /// wrapper: direct call, fatal on any error. Within the wrapper,
    /// non-retryable failures propagate unchanged; a retryable failure at
    /// the terminal profile (or past the end of the chain) surfaces
    /// [`GatewayError::ServiceDegraded`].
    pub async fn chat(
        &self,
        messages: &[Message],
        config: ResolvedConfig,
        stream: bool,
        allow_fallback: bool,
    ) -> GatewayResult<ChatOutput> {
        if config.is_terminal() && !config.is_fallback {
            return self.call_backend(messages, &config, stream).await;
        }

        let mut current = config;
        loop {
            match self.call_backend(messages, &current, stream).await {
                Ok(output) => {
                    if current.is_fallback {
                        warn!(
                            provider = %current.provider,
                            original = current.original_provider.as_deref().unwrap_or(""),
                            level = current.fallback_level,
                            "answered by fallback provider"
                        );
                    }
                    return Ok(output);
                }
                Err(err) if err.is_retryable() && allow_fallback => {
                    if current.is_terminal() {
                        error!("terminal profile failed, no further hops: {err}");
                        return Err(GatewayError::ServiceDegraded);
                    }
                    let next_level = current.fallback_level + 1;
                    let Some(next) = self.fallback_config(&current, next_level) else {
                        error!("fallback chain exhausted: {err}");
                        return Err(GatewayError::ServiceDegraded);
                    };
                    warn!(
                        failed = %current.provider,
                        next = %next.provider,
                        level = next_level,
                        "provider failed with retryable error, degrading: {err}"
                    );
                    current = next;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Resolve then call, in one step.
    pub async fn chat_with_options(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
        stream: bool,
        allow_fallback: bool,
    ) -> GatewayResult<ChatOutput> {
        let config = self.resolve(options)?;
        self.chat(messages, config, stream, allow_fallback).await
    }

    /// List presets with their credential status.
    pub fn list_providers(&self) -> Vec<ProviderStatus> {
        self.registry
            .profiles()
            .map(|profile| ProviderStatus {
                name: profile.name.clone(),
                base_url: profile.base_url.clone(),
                default_model: profile.default_model.clone(),
                configured: !self.credentials.api_key_for(&profile.name).is_empty()
                    || profile.name == crate::domain::models::provider::TERMINAL_PROVIDER,
            })
            .collect()
    }

    /// Build the config for the next chain position. `level` 1 maps to the
    /// first chain entry. Preserves the very first provider tried.
    fn fallback_config(&self, current: &ResolvedConfig, level: usize) -> Option<ResolvedConfig> {
        let name = self.fallback_chain.get(level - 1)?;
        let profile = self.registry.get(name)?;
        Some(ResolvedConfig {
            provider: name.clone(),
            base_url: profile.base_url.clone(),
            api_key: self.credentials.api_key_for(name),
            model: profile.default_model.clone(),
            is_fallback: true,
            original_provider: Some(
                current
                    .original_provider
                    .clone()
                    .unwrap_or_else(|| current.provider.clone()),
            ),
            fallback_level: level,
        })
    }

    async fn call_backend(
        &self,
        messages: &[Message],
        config: &ResolvedConfig,
        stream: bool,
    ) -> GatewayResult<ChatOutput> {
        let kind = backend_kind(config);
        debug!(provider = %config.provider, ?kind, level = config.fallback_level, "dispatching");
        let adapter: &dyn ChatAdapter = match kind {
            BackendKind::Local => &self.local,
            BackendKind::Anthropic => &self.anthropic,
            BackendKind::OpenAiCompatible => &self.openai,
        };
        adapter.send_chat(messages, config, stream).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway() -> GenerationGateway {
        GenerationGateway::new(ProviderRegistry::builtin(), &Settings::default()).unwrap()
    }

    fn gateway_with(settings: Settings) -> GenerationGateway {
        GenerationGateway::new(ProviderRegistry::builtin(), &settings).unwrap()
    }

    #[test]
    fn test_resolve_presets_exactly() {
        let gateway = gateway();
        for profile in ProviderRegistry::builtin().profiles() {
            let resolved = gateway
                .resolve(&GenerationOptions {
                    provider: Some(profile.name.clone()),
                    ..GenerationOptions::default()
                })
                .unwrap();
            assert_eq!(resolved.base_url, profile.base_url);
            assert_eq!(resolved.model, profile.default_model);
            assert_eq!(resolved.fallback_level, 0);
            assert!(!resolved.is_fallback);
        }
    }

    #[test]
    fn test_resolve_qwen_defaults() {
        let resolved = gateway()
            .resolve(&GenerationOptions {
                provider: Some("qwen".to_string()),
                ..GenerationOptions::default()
            })
            .unwrap();
        assert_eq!(
            resolved.base_url,
            "https://dashscope.aliyuncs.com/compatible-mode/v1"
        );
        assert_eq!(resolved.model, "qwen-plus");
    }

    #[test]
    fn test_resolve_defaults_to_configured_provider() {
        let resolved = gateway().resolve(&GenerationOptions::default()).unwrap();
        assert_eq!(resolved.provider, "ollama");
        assert!(resolved.is_terminal());
    }

    #[test]
    fn test_credential_override_changes_nothing_else() {
        let gateway = gateway();
        let base = gateway
            .resolve(&GenerationOptions {
                provider: Some("glm".to_string()),
                ..GenerationOptions::default()
            })
            .unwrap();
        let overridden = gateway
            .resolve(&GenerationOptions {
                provider: Some("glm".to_string()),
                api_key: Some("secret".to_string()),
                ..GenerationOptions::default()
            })
            .unwrap();
        assert_eq!(overridden.api_key, "secret");
        assert_eq!(overridden.base_url, base.base_url);
        assert_eq!(overridden.model, base.model);
        assert_eq!(overridden.provider, base.provider);
    }

    #[test]
    fn test_custom_endpoint_bypasses_preset_validation() {
        let resolved = gateway()
            .resolve(&GenerationOptions {
                provider: Some("definitely-not-a-preset".to_string()),
                base_url: Some("https://custom/v1".to_string()),
                ..GenerationOptions::default()
            })
            .unwrap();
        assert_eq!(resolved.base_url, "https://custom/v1");
        assert_eq!(resolved.model, CUSTOM_MODEL_PLACEHOLDER);
    }

    #[test]
    fn test_custom_endpoint_without_provider() {
        let resolved = gateway()
            .resolve(&GenerationOptions {
                base_url: Some("https://custom/v1".to_string()),
                ..GenerationOptions::default()
            })
            .unwrap();
        assert_eq!(resolved.model, CUSTOM_MODEL_PLACEHOLDER);
        assert_eq!(resolved.api_key, "");
    }

    #[test]
    fn test_unknown_provider_fails_resolution() {
        let err = gateway()
            .resolve(&GenerationOptions {
                provider: Some("unknown".to_string()),
                ..GenerationOptions::default()
            })
            .unwrap_err();
        match err {
            GatewayError::UnknownProvider { requested, available } => {
                assert_eq!(requested, "unknown");
                assert!(available.contains(&"ollama".to_string()));
            }
            other => panic!("expected UnknownProvider, got {other:?}"),
        }
    }

    #[test]
    fn test_preset_credential_comes_from_settings() {
        let mut settings = Settings::default();
        settings.credentials.glm_api_key = "glm-secret".to_string();
        let resolved = gateway_with(settings)
            .resolve(&GenerationOptions {
                provider: Some("glm".to_string()),
                ..GenerationOptions::default()
            })
            .unwrap();
        assert_eq!(resolved.api_key, "glm-secret");
    }

    #[test]
    fn test_fallback_config_walks_chain() {
        let gateway = gateway();
        let original = gateway
            .resolve(&GenerationOptions {
                provider: Some("openai".to_string()),
                ..GenerationOptions::default()
            })
            .unwrap();

        let first = gateway.fallback_config(&original, 1).unwrap();
        assert_eq!(first.provider, "glm");
        assert!(first.is_fallback);
        assert_eq!(first.original_provider.as_deref(), Some("openai"));
        assert_eq!(first.fallback_level, 1);

        let second = gateway.fallback_config(&first, 2).unwrap();
        assert_eq!(second.provider, "ollama");
        // The very first provider is preserved, not the previous hop.
        assert_eq!(second.original_provider.as_deref(), Some("openai"));
        assert_eq!(second.fallback_level, 2);

        assert!(gateway.fallback_config(&second, 3).is_none());
    }

    #[test]
    fn test_list_providers_marks_configured() {
        let mut settings = Settings::default();
        settings.credentials.openai_api_key = "k".to_string();
        let statuses = gateway_with(settings).list_providers();

        let openai = statuses.iter().find(|s| s.name == "openai").unwrap();
        assert!(openai.configured);
        let ollama = statuses.iter().find(|s| s.name == "ollama").unwrap();
        assert!(ollama.configured);
        let glm = statuses.iter().find(|s| s.name == "glm").unwrap();
        assert!(!glm.configured);
    }
}
