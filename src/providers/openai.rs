//! OpenAI chat-completions backend. Bukkit/Spigot and Forge requests get
//! platform-specialized system prompts; other platforms use the generic one.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use super::{explain_prompt, generation_system_prompt, optimize_prompt, CodeProvider};
use crate::error::Error;
use crate::types::{Platform, ProjectKind};
use crate::Result;

const PROVIDER_ID: &str = "gpt";
const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const MODEL: &str = "gpt-5";
const GENERATE_MAX_TOKENS: u32 = 4096;
const EXPLAIN_MAX_TOKENS: u32 = 2048;

const BUKKIT_SPIGOT_SYSTEM_PROMPT: &str = "You are a Bukkit/Spigot expert. Generate \
    production-ready plugin code that follows Bukkit/Spigot best practices including:\n\
    - Proper plugin.yml configuration\n\
    - Event handling with @EventHandler\n\
    - Command handling with CommandExecutor\n\
    - Configuration file management\n\
    - Permission systems\n\
    - Database integration when needed";

const FORGE_SYSTEM_PROMPT: &str = "You are a Minecraft Forge expert. Generate \
    production-ready mod code that follows Forge best practices including:\n\
    - Proper mod structure with @Mod annotation\n\
    - Event handling with Forge event system\n\
    - Block and item registration\n\
    - Client/server proxy patterns\n\
    - Data generation and recipes\n\
    - Networking between client and server";

#[derive(Debug)]
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(api_key: String, timeout_secs: u64) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Override the API origin. Used by tests to point at a mock server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Pick the system prompt for a generation request.
    fn system_prompt(kind: ProjectKind, platform: Platform) -> String {
        match platform {
            Platform::Bukkit | Platform::Spigot => BUKKIT_SPIGOT_SYSTEM_PROMPT.to_string(),
            Platform::Forge => FORGE_SYSTEM_PROMPT.to_string(),
            Platform::Fabric => generation_system_prompt(kind, platform),
        }
    }

    /// Extract the first choice's message content.
    fn extract_text(body: &Value) -> Result<String> {
        body.pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .map(String::from)
            .ok_or_else(|| {
                Error::provider_failure(PROVIDER_ID, "response contained no text content")
            })
    }

    async fn complete(
        &self,
        system: Option<String>,
        prompt: String,
        max_tokens: u32,
    ) -> Result<String> {
        let mut messages = Vec::new();
        if let Some(system) = system {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.push(json!({ "role": "user", "content": prompt }));

        let body = json!({
            "model": MODEL,
            "messages": messages,
            "max_completion_tokens": max_tokens,
        });

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::provider_failure(PROVIDER_ID, e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::provider_failure(PROVIDER_ID, e.to_string()))?;

        if !status.is_success() {
            return Err(Error::provider_failure(
                PROVIDER_ID,
                format!("HTTP {}: {}", status.as_u16(), text),
            ));
        }

        let parsed: Value = serde_json::from_str(&text)
            .map_err(|e| Error::provider_failure(PROVIDER_ID, e.to_string()))?;
        Self::extract_text(&parsed)
    }
}

#[async_trait]
impl CodeProvider for OpenAiProvider {
    fn provider_id(&self) -> &str {
        PROVIDER_ID
    }

    async fn generate(
        &self,
        prompt: &str,
        kind: ProjectKind,
        platform: Platform,
    ) -> Result<String> {
        self.complete(
            Some(Self::system_prompt(kind, platform)),
            prompt.to_string(),
            GENERATE_MAX_TOKENS,
        )
        .await
    }

    async fn explain(&self, code: &str) -> Result<String> {
        self.complete(None, explain_prompt(code), EXPLAIN_MAX_TOKENS)
            .await
    }

    async fn optimize(&self, code: &str) -> Result<String> {
        self.complete(None, optimize_prompt(code), GENERATE_MAX_TOKENS)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_text_from_choices() {
        let body = json!({
            "choices": [{
                "message": { "content": "public class Example {}" },
                "finish_reason": "stop"
            }]
        });
        assert_eq!(
            OpenAiProvider::extract_text(&body).unwrap(),
            "public class Example {}"
        );
    }

    #[test]
    fn test_null_content_is_provider_failure() {
        let body = json!({ "choices": [{ "message": { "content": null } }] });
        assert!(OpenAiProvider::extract_text(&body).is_err());
    }

    #[test]
    fn test_bukkit_and_spigot_share_specialized_prompt() {
        let bukkit = OpenAiProvider::system_prompt(ProjectKind::Plugin, Platform::Bukkit);
        let spigot = OpenAiProvider::system_prompt(ProjectKind::Plugin, Platform::Spigot);
        assert_eq!(bukkit, spigot);
        assert!(bukkit.contains("@EventHandler"));
    }

    #[test]
    fn test_forge_gets_mod_prompt_and_fabric_falls_back() {
        let forge = OpenAiProvider::system_prompt(ProjectKind::Mod, Platform::Forge);
        assert!(forge.contains("@Mod annotation"));
        let fabric = OpenAiProvider::system_prompt(ProjectKind::Mod, Platform::Fabric);
        assert!(fabric.contains("Platform: fabric"));
    }
}
