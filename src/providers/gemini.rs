//! Google Gemini generateContent backend. The model is part of the URL path,
//! the prompt travels as `contents[].parts[].text`, and there is no separate
//! system parameter — instructions are folded into the single prompt, so the
//! generation path appends the user request to the system preamble.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use super::{explain_prompt, generation_system_prompt, optimize_prompt, CodeProvider};
use crate::error::Error;
use crate::types::{Platform, ProjectKind};
use crate::Result;

const PROVIDER_ID: &str = "gemini";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
/// Generation and optimization go to the stronger model.
const PRO_MODEL: &str = "gemini-2.5-pro";
/// Explanations are cheaper on flash.
const FLASH_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug)]
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiProvider {
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

    /// Extract the text of the first candidate part.
    fn extract_text(body: &Value) -> Result<String> {
        body.pointer("/candidates/0/content/parts/0/text")
            .and_then(|v| v.as_str())
            .map(String::from)
            .ok_or_else(|| {
                Error::provider_failure(PROVIDER_ID, "response contained no text content")
            })
    }

    async fn complete(&self, model: &str, prompt: String) -> Result<String> {
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
        });

        let response = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, model
            ))
            .header("x-goog-api-key", &self.api_key)
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
impl CodeProvider for GeminiProvider {
    fn provider_id(&self) -> &str {
        PROVIDER_ID
    }

    async fn generate(
        &self,
        prompt: &str,
        kind: ProjectKind,
        platform: Platform,
    ) -> Result<String> {
        let combined = format!(
            "{}\n\nUser Request: {}",
            generation_system_prompt(kind, platform),
            prompt
        );
        self.complete(PRO_MODEL, combined).await
    }

    async fn explain(&self, code: &str) -> Result<String> {
        self.complete(FLASH_MODEL, explain_prompt(code)).await
    }

    async fn optimize(&self, code: &str) -> Result<String> {
        self.complete(PRO_MODEL, optimize_prompt(code)).await
    }
}
