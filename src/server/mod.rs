//! Axum HTTP surface over the arbitration core.
//!
//! Caller identity arrives as an `x-account-id` header placed by the
//! upstream session gateway; this layer performs no authentication of its
//! own. Error variants map to the status codes the UI depends on — most
//! importantly `InsufficientBalance` → 402 with the required/current figures
//! so the client can offer the ad-view remedy.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::arbiter::GenerationArbiter;
use crate::error::Error;
use crate::rewards::{video_ad_config, RewardService};
use crate::storage::Storage;
use crate::types::{GenerationRequest, NewProject, Project, ProjectUpdate};
use crate::Result;

#[derive(Clone)]
pub struct AppState {
    pub arbiter: Arc<GenerationArbiter>,
    pub storage: Arc<dyn Storage>,
    pub rewards: Arc<RewardService>,
}

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/ai/generate", post(generate))
        .route("/api/ai/explain", post(explain))
        .route("/api/ai/optimize", post(optimize))
        .route("/api/account/coins", get(coins))
        .route("/api/account/usage", get(usage_history))
        .route("/api/projects", get(list_projects).post(create_project))
        .route(
            "/api/projects/:id",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route("/api/templates", get(list_templates))
        .route("/api/templates/:id", get(get_template))
        .route("/api/ads/view", post(ad_view))
        .route("/api/ads/config", get(ad_config))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            Error::InsufficientBalance { required, current } => {
                let body = json!({
                    "message": self.to_string(),
                    "code": "insufficient_balance",
                    "required": required,
                    "current": current,
                });
                return (StatusCode::PAYMENT_REQUIRED, Json(body)).into_response();
            }
            Error::InvalidProvider(_) => (StatusCode::BAD_REQUEST, "invalid_provider"),
            Error::Validation(_) => (StatusCode::BAD_REQUEST, "validation"),
            Error::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthenticated"),
            Error::AccessDenied => (StatusCode::FORBIDDEN, "access_denied"),
            Error::AccountNotFound(_) => (StatusCode::NOT_FOUND, "account_not_found"),
            Error::ProjectNotFound(_) => (StatusCode::NOT_FOUND, "project_not_found"),
            Error::TemplateNotFound(_) => (StatusCode::NOT_FOUND, "template_not_found"),
            Error::ProviderCallFailed { .. } => (StatusCode::BAD_GATEWAY, "provider_call_failed"),
            // Distinct from provider_call_failed: generated text exists but
            // was not charged/recorded.
            Error::LedgerWriteFailed(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "ledger_write_failed")
            }
            Error::Storage(_) | Error::Configuration(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal")
            }
        };
        let body = json!({ "message": self.to_string(), "code": code });
        (status, Json(body)).into_response()
    }
}

/// Pull the caller's account id from the gateway-provided header.
fn account_id(headers: &HeaderMap) -> Result<String> {
    headers
        .get("x-account-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(String::from)
        .ok_or(Error::Unauthenticated)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    code: String,
    coins_cost: u64,
    remaining_coins: u64,
    unlimited: bool,
}

async fn generate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<GenerationRequest>,
) -> Result<Json<GenerateResponse>> {
    let account_id = account_id(&headers)?;
    let receipt = state.arbiter.generate(&account_id, request).await?;
    Ok(Json(GenerateResponse {
        code: receipt.code,
        coins_cost: receipt.coins_cost,
        remaining_coins: receipt.remaining.coins(),
        unlimited: receipt.remaining.is_unlimited(),
    }))
}

#[derive(Deserialize)]
struct ExplainBody {
    provider: String,
    code: String,
}

async fn explain(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ExplainBody>,
) -> Result<Json<serde_json::Value>> {
    account_id(&headers)?;
    let explanation = state.arbiter.explain(&body.provider, &body.code).await?;
    Ok(Json(json!({ "explanation": explanation })))
}

async fn optimize(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ExplainBody>,
) -> Result<Json<GenerateResponse>> {
    let account_id = account_id(&headers)?;
    let receipt = state
        .arbiter
        .optimize(&account_id, &body.provider, &body.code)
        .await?;
    Ok(Json(GenerateResponse {
        code: receipt.code,
        coins_cost: receipt.coins_cost,
        remaining_coins: receipt.remaining.coins(),
        unlimited: receipt.remaining.is_unlimited(),
    }))
}

async fn coins(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>> {
    let account_id = account_id(&headers)?;
    let account = state
        .storage
        .account(&account_id)?
        .ok_or(Error::AccountNotFound(account_id))?;
    Ok(Json(json!({ "coins": account.coins })))
}

async fn usage_history(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<crate::types::UsageRecord>>> {
    let account_id = account_id(&headers)?;
    Ok(Json(state.storage.usage_for_account(&account_id)?))
}

/// Load a project and verify the caller owns it.
fn owned_project(state: &AppState, account_id: &str, project_id: &str) -> Result<Project> {
    let project = state
        .storage
        .project(project_id)?
        .ok_or_else(|| Error::ProjectNotFound(project_id.to_string()))?;
    if project.account_id != account_id {
        return Err(Error::AccessDenied);
    }
    Ok(project)
}

async fn list_projects(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Project>>> {
    let account_id = account_id(&headers)?;
    Ok(Json(state.storage.projects_for_account(&account_id)?))
}

async fn create_project(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(new): Json<NewProject>,
) -> Result<Json<Project>> {
    let account_id = account_id(&headers)?;
    Ok(Json(state.storage.create_project(&account_id, new)?))
}

async fn get_project(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Project>> {
    let account_id = account_id(&headers)?;
    Ok(Json(owned_project(&state, &account_id, &id)?))
}

async fn update_project(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(update): Json<ProjectUpdate>,
) -> Result<Json<Project>> {
    let account_id = account_id(&headers)?;
    owned_project(&state, &account_id, &id)?;
    state
        .storage
        .update_project(&id, &update)?
        .map(Json)
        .ok_or(Error::ProjectNotFound(id))
}

async fn delete_project(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let account_id = account_id(&headers)?;
    owned_project(&state, &account_id, &id)?;
    state.storage.delete_project(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct TemplateFilter {
    category: Option<String>,
}

async fn list_templates(
    State(state): State<AppState>,
    Query(filter): Query<TemplateFilter>,
) -> Result<Json<Vec<crate::types::Template>>> {
    let templates = match filter.category {
        Some(category) => state.storage.templates_by_category(&category)?,
        None => state.storage.templates()?,
    };
    Ok(Json(templates))
}

async fn get_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<crate::types::Template>> {
    state
        .storage
        .template(&id)?
        .map(Json)
        .ok_or(Error::TemplateNotFound(id))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdViewBody {
    ad_type: String,
    duration_secs: u64,
}

async fn ad_view(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<AdViewBody>,
) -> Result<Json<serde_json::Value>> {
    let account_id = account_id(&headers)?;
    let reward = state
        .rewards
        .credit(&account_id, &body.ad_type, body.duration_secs)?;
    Ok(Json(json!({
        "coinsEarned": reward.coins_earned,
        "newBalance": reward.new_balance,
        "message": format!("You earned {} coins!", reward.coins_earned),
    })))
}

async fn ad_config() -> impl IntoResponse {
    Json(video_ad_config())
}
