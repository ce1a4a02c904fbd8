use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Error;

/// What kind of artifact the user is building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectKind {
    Plugin,
    Mod,
}

impl ProjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectKind::Plugin => "plugin",
            ProjectKind::Mod => "mod",
        }
    }
}

impl fmt::Display for ProjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plugin" => Ok(ProjectKind::Plugin),
            "mod" => Ok(ProjectKind::Mod),
            other => Err(Error::Validation(format!("unknown project kind: {other}"))),
        }
    }
}

/// Target Minecraft platform the generated code must run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Bukkit,
    Spigot,
    Forge,
    Fabric,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Bukkit => "bukkit",
            Platform::Spigot => "spigot",
            Platform::Forge => "forge",
            Platform::Fabric => "fabric",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bukkit" => Ok(Platform::Bukkit),
            "spigot" => Ok(Platform::Spigot),
            "forge" => Ok(Platform::Forge),
            "fabric" => Ok(Platform::Fabric),
            other => Err(Error::Validation(format!("unknown platform: {other}"))),
        }
    }
}

/// An inbound generation request. Ephemeral — constructed per call and not
/// persisted beyond the resulting [`UsageRecord`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub prompt: String,
    /// Provider selector tag ("claude", "gemini", "gpt").
    pub provider: String,
    pub kind: ProjectKind,
    pub platform: Platform,
    /// Project the generation belongs to, if any.
    pub project_id: Option<String>,
}

/// Immutable audit entry for a completed generation. Append-only; never
/// mutated or deleted by the core.
///
/// The coin figure is always the computed cost, even when the account was
/// entitled to unlimited use and nothing was deducted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    pub id: String,
    pub account_id: String,
    pub project_id: Option<String>,
    pub provider: String,
    pub prompt: String,
    pub response: String,
    pub coins_cost: u64,
    pub created_at: DateTime<Utc>,
}

impl UsageRecord {
    pub fn new(
        account_id: impl Into<String>,
        project_id: Option<String>,
        provider: impl Into<String>,
        prompt: impl Into<String>,
        response: impl Into<String>,
        coins_cost: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            account_id: account_id.into(),
            project_id,
            provider: provider.into(),
            prompt: prompt.into(),
            response: response.into(),
            coins_cost,
            created_at: Utc::now(),
        }
    }
}

/// Append-only record of a rewarded ad view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdViewRecord {
    pub id: String,
    pub account_id: String,
    pub coins_earned: u64,
    pub ad_provider: String,
    pub viewed_at: DateTime<Utc>,
}

impl AdViewRecord {
    pub fn new(
        account_id: impl Into<String>,
        coins_earned: u64,
        ad_provider: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            account_id: account_id.into(),
            coins_earned,
            ad_provider: ad_provider.into(),
            viewed_at: Utc::now(),
        }
    }
}
