//! Campaign endpoints
//!
//! In-memory CRUD surface exercising the authorization guards: reads need
//! `campaigns:read`, creation goes through the resource-access capability
//! check, deletion needs `campaigns:delete`.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::models::{Campaign, CreateCampaignRequest, SecurityContext};
use crate::utils::error::{AppError, AppResult};
use crate::utils::validation::validate_campaign_name;
use crate::{require_permission, require_resource_access, AppState};

/// In-memory campaign repository
#[derive(Clone, Default)]
pub struct CampaignStore {
    campaigns: Arc<RwLock<HashMap<Uuid, Campaign>>>,
}

impl CampaignStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn list(&self) -> Vec<Campaign> {
        let campaigns = self.campaigns.read().await;
        let mut list: Vec<Campaign> = campaigns.values().cloned().collect();
        list.sort_by_key(|c| c.created_at);
        list
    }

    pub async fn get(&self, id: Uuid) -> Option<Campaign> {
        self.campaigns.read().await.get(&id).cloned()
    }

    pub async fn insert(&self, campaign: Campaign) {
        self.campaigns.write().await.insert(campaign.id, campaign);
    }

    pub async fn remove(&self, id: Uuid) -> Option<Campaign> {
        self.campaigns.write().await.remove(&id)
    }
}

/// Campaign routes with per-operation guards
pub fn routes() -> Router<AppState> {
    let read = Router::new()
        .route("/", get(list_campaigns))
        .route("/{id}", get(get_campaign))
        .route_layer(require_permission!("campaigns:read"));
    let create = Router::new()
        .route("/", post(create_campaign))
        .route_layer(require_resource_access!("campaigns", "create"));
    let remove = Router::new()
        .route("/{id}", delete(delete_campaign))
        .route_layer(require_permission!("campaigns:delete"));
    read.merge(create).merge(remove)
}

/// GET /api/v1/campaigns
async fn list_campaigns(State(state): State<AppState>) -> Json<Vec<Campaign>> {
    Json(state.campaigns.list().await)
}

/// GET /api/v1/campaigns/{id}
async fn get_campaign(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Campaign>> {
    state
        .campaigns
        .get(id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Campaign {} not found", id)))
}

/// POST /api/v1/campaigns
async fn create_campaign(
    State(state): State<AppState>,
    context: SecurityContext,
    Json(payload): Json<CreateCampaignRequest>,
) -> AppResult<(StatusCode, Json<Campaign>)> {
    if !validate_campaign_name(&payload.name) {
        return Err(AppError::BadRequest(format!(
            "Invalid campaign name: {:?}",
            payload.name
        )));
    }

    let campaign = Campaign::new(payload.name, payload.description, context.user_id.clone());
    info!(
        campaign_id = %campaign.id,
        owner = %context.user_id,
        "campaign created"
    );
    state.campaigns.insert(campaign.clone()).await;
    Ok((StatusCode::CREATED, Json(campaign)))
}

#[derive(Debug, serde::Serialize)]
struct DeleteResponse {
    success: bool,
    id: Uuid,
}

/// DELETE /api/v1/campaigns/{id}
async fn delete_campaign(
    State(state): State<AppState>,
    context: SecurityContext,
    Path(id): Path<Uuid>,
) -> AppResult<Json<DeleteResponse>> {
    let removed = state
        .campaigns
        .remove(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Campaign {} not found", id)))?;
    info!(
        campaign_id = %removed.id,
        deleted_by = %context.user_id,
        "campaign deleted"
    );
    Ok(Json(DeleteResponse { success: true, id }))
}
