//! Provider profiles, the preset registry, and per-request resolution state.
//!
//! A provider is a named generation backend with a base URL and default
//! model. The registry is built once at startup and passed by reference into
//! the gateway; it is never mutated at runtime.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Name of the terminal/local profile.
///
/// This provider requires no credential and is assumed always reachable; it
/// is the guaranteed floor of every fallback chain.
pub const TERMINAL_PROVIDER: &str = "ollama";

/// Placeholder model name used when a custom endpoint is supplied without an
/// explicit model.
pub const CUSTOM_MODEL_PLACEHOLDER: &str = "custom-model";

/// An immutable connection profile for a named generation backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderProfile {
    /// Provider name, the registry key.
    pub name: String,
    /// Base URL for the provider's API.
    pub base_url: String,
    /// Model used when the request does not override it.
    pub default_model: String,
}

/// The process-wide preset table of provider profiles.
///
/// Constructed once at startup (usually via [`ProviderRegistry::builtin`])
/// and shared read-only across all requests. Tests inject registries that
/// point at mock servers.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    profiles: BTreeMap<String, ProviderProfile>,
}

impl ProviderRegistry {
    /// Build a registry from explicit profiles.
    pub fn new(profiles: impl IntoIterator<Item = ProviderProfile>) -> Self {
        Self {
            profiles: profiles
                .into_iter()
                .map(|p| (p.name.clone(), p))
                .collect(),
        }
    }

    /// The built-in preset table.
    pub fn builtin() -> Self {
        let preset = |name: &str, base_url: &str, default_model: &str| ProviderProfile {
            name: name.to_string(),
            base_url: base_url.to_string(),
            default_model: default_model.to_string(),
        };

        Self::new([
            preset("openai", "https://api.openai.com/v1", "gpt-4o"),
            preset(
                "anthropic",
                "https://api.anthropic.com/v1",
                "claude-sonnet-4-20250514",
            ),
            preset("deepseek", "https://api.deepseek.com/v1", "deepseek-chat"),
            preset(
                "qwen",
                "https://dashscope.aliyuncs.com/compatible-mode/v1",
                "qwen-plus",
            ),
            preset("glm", "https://open.bigmodel.cn/api/paas/v4", "glm-4-flash"),
            preset(
                "gemini",
                "https://generativelanguage.googleapis.com/v1beta/openai",
                "gemini-2.0-flash",
            ),
            preset(
                "openrouter",
                "https://openrouter.ai/api/v1",
                "anthropic/claude-sonnet-4",
            ),
            preset(
                "siliconflow",
                "https://api.siliconflow.cn/v1",
                "Qwen/Qwen2.5-72B-Instruct",
            ),
            preset("ollama", "http://localhost:11434", "qwen3:8b"),
        ])
    }

    /// Look up a profile by name.
    pub fn get(&self, name: &str) -> Option<&ProviderProfile> {
        self.profiles.get(name)
    }

    /// Whether the registry contains a profile with this name.
    pub fn contains(&self, name: &str) -> bool {
        self.profiles.contains_key(name)
    }

    /// Provider names in deterministic order.
    pub fn names(&self) -> Vec<String> {
        self.profiles.keys().cloned().collect()
    }

    /// All profiles in deterministic order.
    pub fn profiles(&self) -> impl Iterator<Item = &ProviderProfile> {
        self.profiles.values()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Per-request overrides accepted by the gateway before resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Logical provider name. Defaults to the configured system default.
    pub provider: Option<String>,
    /// Custom endpoint. When set, preset-table validation is bypassed.
    pub base_url: Option<String>,
    /// Credential override. Empty string means unauthenticated.
    pub api_key: Option<String>,
    /// Model override.
    pub model: Option<String>,
}

/// A fully resolved generation target, built once per request.
///
/// Carries the fallback bookkeeping: `fallback_level` 0 is the originally
/// resolved provider, each hop down the chain increments it, and
/// `original_provider` preserves the very first provider tried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    /// Provider name (informational only when a custom endpoint was given).
    pub provider: String,
    /// Concrete base URL to call.
    pub base_url: String,
    /// Credential; empty string means no credential header is sent.
    pub api_key: String,
    /// Concrete model name.
    pub model: String,
    /// Whether this config was produced by a fallback hop.
    pub is_fallback: bool,
    /// The first provider tried, recorded on the first hop.
    pub original_provider: Option<String>,
    /// Position in the degradation chain: 0 = original, +1 per hop.
    pub fallback_level: usize,
}

impl ResolvedConfig {
    /// Whether this config targets the terminal/local profile.
    pub fn is_terminal(&self) -> bool {
        self.provider == TERMINAL_PROVIDER
    }

    /// One-line notice prepended to degraded responses.
    pub fn fallback_notice(&self) -> String {
        let original = self.original_provider.as_deref().unwrap_or("unknown");
        format!(
            "[answered by local model {} because provider {} is temporarily unavailable]\n\n",
            self.model, original
        )
    }
}
