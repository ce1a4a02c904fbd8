//! Anthropic Messages API backend. Key differences from the OpenAI shape:
//! the system prompt is a top-level `system` parameter, content comes back as
//! typed blocks, and authentication uses `x-api-key` plus a pinned
//! `anthropic-version` header.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use super::{explain_prompt, generation_system_prompt, optimize_prompt, CodeProvider};
use crate::error::Error;
use crate::types::{Platform, ProjectKind};
use crate::Result;

const PROVIDER_ID: &str = "claude";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const MODEL: &str = "claude-sonnet-4-20250514";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const GENERATE_MAX_TOKENS: u32 = 4096;
const EXPLAIN_MAX_TOKENS: u32 = 2048;

#[derive(Debug)]
pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl AnthropicProvider {
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

    /// Extract the text of the first content block.
    fn extract_text(body: &Value) -> Result<String> {
        body.pointer("/content/0/text")
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
        let mut body = json!({
            "model": MODEL,
            "max_tokens": max_tokens,
            "messages": [{ "role": "user", "content": prompt }],
        });
        if let Some(system) = system {
            body["system"] = Value::String(system);
        }

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
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
impl CodeProvider for AnthropicProvider {
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
            Some(generation_system_prompt(kind, platform)),
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
