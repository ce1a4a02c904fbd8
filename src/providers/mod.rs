//! Provider abstraction layer — interchangeable code-generation backends
//! behind a capability trait, selected through a registry keyed by tag.
//!
//! Each backend is an opaque asynchronous request/response function: no
//! retries, no internal timeout beyond the HTTP client's, and upstream
//! failure messages propagate verbatim. Adding a provider means registering
//! one more implementation; the dispatch path itself never changes.

pub mod anthropic;
pub mod gemini;
pub mod openai;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::Config;
use crate::error::Error;
use crate::types::{Platform, ProjectKind};
use crate::Result;

pub use anthropic::AnthropicProvider;
pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

/// Capability contract for a code-generation backend.
///
/// Object-safe; the registry hands out `Arc<dyn CodeProvider>` for dynamic
/// dispatch, the same pattern the service uses for storage.
#[async_trait]
pub trait CodeProvider: Send + Sync + std::fmt::Debug {
    /// Selector tag this provider is registered under ("claude", "gemini",
    /// "gpt").
    fn provider_id(&self) -> &str;

    /// Generate Minecraft plugin/mod source for the given prompt.
    async fn generate(&self, prompt: &str, kind: ProjectKind, platform: Platform)
        -> Result<String>;

    /// Explain existing plugin/mod source.
    async fn explain(&self, code: &str) -> Result<String>;

    /// Rework existing source for performance and readability.
    async fn optimize(&self, code: &str) -> Result<String>;
}

/// Registry of available backends, keyed by selector tag.
///
/// Resolution of an unknown tag fails fast with [`Error::InvalidProvider`]
/// before any network activity — there is deliberately no silent fallback.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn CodeProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend under its own `provider_id`.
    pub fn register(&mut self, provider: Arc<dyn CodeProvider>) {
        self.providers
            .insert(provider.provider_id().to_string(), provider);
    }

    /// Resolve a selector tag to a backend.
    pub fn resolve(&self, tag: &str) -> Result<Arc<dyn CodeProvider>> {
        self.providers
            .get(tag)
            .cloned()
            .ok_or_else(|| Error::InvalidProvider(tag.to_string()))
    }

    /// Tags of all registered backends.
    pub fn tags(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }

    /// Build the standard three-backend registry from configuration.
    pub fn from_config(config: &Config) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(AnthropicProvider::new(
            config.anthropic_api_key.clone(),
            config.http_timeout_secs,
        )));
        registry.register(Arc::new(GeminiProvider::new(
            config.gemini_api_key.clone(),
            config.http_timeout_secs,
        )));
        registry.register(Arc::new(OpenAiProvider::new(
            config.openai_api_key.clone(),
            config.http_timeout_secs,
        )));
        registry
    }
}

/// Build the shared system prompt used by the generic generation path.
pub(crate) fn generation_system_prompt(kind: ProjectKind, platform: Platform) -> String {
    format!(
        "You are an expert Minecraft {kind} developer. Generate high-quality, \
         production-ready Java code for {platform}.\n\n\
         Guidelines:\n\
         - Write clean, well-documented code\n\
         - Follow {platform} best practices\n\
         - Include proper error handling\n\
         - Add helpful comments\n\
         - Ensure the code is complete and functional\n\n\
         Platform: {platform}\n\
         Type: {kind}"
    )
}

/// Build the prompt for explaining existing code.
pub(crate) fn explain_prompt(code: &str) -> String {
    format!(
        "Please explain this Minecraft plugin/mod code in detail. Include:\n\
         1. What the code does\n\
         2. How it works\n\
         3. Key features and functionality\n\
         4. Setup instructions\n\n\
         Code:\n{code}"
    )
}

/// Build the prompt for optimizing existing code.
pub(crate) fn optimize_prompt(code: &str) -> String {
    format!(
        "Optimize this Minecraft plugin/mod code for better performance, \
         readability, and best practices:\n\n{code}"
    )
}
