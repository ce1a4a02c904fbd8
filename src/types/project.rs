use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::generation::{Platform, ProjectKind};

/// A saved build project owned by an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub account_id: String,
    pub name: String,
    pub description: Option<String>,
    pub kind: ProjectKind,
    pub platform: Platform,
    /// Last generated source attached to the project.
    pub generated_code: Option<String>,
    /// Provider tag that produced `generated_code`.
    pub provider: Option<String>,
    pub template_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields a caller supplies when creating a project.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
    pub kind: ProjectKind,
    pub platform: Platform,
    pub template_id: Option<String>,
}

impl NewProject {
    pub fn into_project(self, account_id: impl Into<String>) -> Project {
        let now = Utc::now();
        Project {
            id: Uuid::new_v4().to_string(),
            account_id: account_id.into(),
            name: self.name,
            description: self.description,
            kind: self.kind,
            platform: self.platform,
            generated_code: None,
            provider: None,
            template_id: self.template_id,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update applied to an existing project. `None` fields are left
/// untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub generated_code: Option<String>,
    pub provider: Option<String>,
}

/// A curated starter template from the read-only catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    /// "beginner" | "intermediate" | "advanced"
    pub difficulty: String,
    pub rating: u32,
    pub downloads: u64,
    pub code: String,
    pub image_url: Option<String>,
    pub is_premium: bool,
    pub created_at: DateTime<Utc>,
}
