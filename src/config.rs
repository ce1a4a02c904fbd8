//! Environment-driven service configuration.
//!
//! API keys follow the `{PROVIDER}_API_KEY` convention; everything else is
//! namespaced under `MODSMITH_`. Missing keys default to empty strings so the
//! service still boots — the affected backend simply fails at call time with
//! the upstream's authentication error.

use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite database file.
    pub database_path: String,
    /// Address the HTTP server binds to.
    pub bind_addr: String,
    /// Outbound HTTP timeout for provider calls, in seconds.
    pub http_timeout_secs: u64,
    pub anthropic_api_key: String,
    pub gemini_api_key: String,
    pub openai_api_key: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_path: env::var("MODSMITH_DATABASE")
                .unwrap_or_else(|_| "modsmith.db".to_string()),
            bind_addr: env::var("MODSMITH_BIND").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            http_timeout_secs: env::var("MODSMITH_HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(30),
            anthropic_api_key: env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
            gemini_api_key: env::var("GEMINI_API_KEY").unwrap_or_default(),
            openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
        }
    }
}
