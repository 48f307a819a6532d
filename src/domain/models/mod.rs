//! Domain models.

pub mod candidate;
pub mod config;
pub mod message;
pub mod provider;

pub use candidate::{CollectionInfo, RetrievalCandidate};
pub use config::{
    Credentials, EmbeddingSettings, GenerationSettings, LoggingSettings, RetrievalSettings,
    Settings, VectorStoreSettings,
};
pub use message::{Message, Role};
pub use provider::{
    GenerationOptions, ProviderProfile, ProviderRegistry, ResolvedConfig,
    CUSTOM_MODEL_PLACEHOLDER, TERMINAL_PROVIDER,
};
