//! Campaign webhook and snapshot endpoints

use axum::{
    extract::{Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use cinder_core::{CampaignRecord, CampaignUpdatedEvent};
use cinder_indexer::CampaignUpdatedWebhook;
use cinder_services::DeliveryReport;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CampaignUpdatedResponse {
    ok: bool,
    campaign_id: String,
    delivered: DeliveryReport,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotQuery {
    campaign_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotResponse {
    ok: bool,
    campaign_id: String,
    snapshot: CampaignUpdatedEvent,
}

/// Campaign row changed in the indexer
async fn campaign_updated(
    State(state): State<AppState>,
    Json(webhook): Json<CampaignUpdatedWebhook>,
) -> Result<Json<CampaignUpdatedResponse>, ApiError> {
    let payload = webhook.into_payload();
    let op = payload.event.op;
    let Some(row) = payload.row().cloned() else {
        warn!("Campaign webhook {} carries no row", payload.id);
        return Err(ApiError::BadRequest(
            "Invalid payload: missing event.data.new/old".to_string(),
        ));
    };
    let campaign = CampaignRecord::try_from(row).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    info!("Campaign {} changed ({:?})", campaign.id, op);
    let delivered = state
        .notifications
        .campaign_updated(&campaign, op, Some(&payload.id))
        .await?;

    Ok(Json(CampaignUpdatedResponse {
        ok: true,
        campaign_id: campaign.id,
        delivered,
    }))
}

#[derive(Debug, Serialize)]
struct AckResponse {
    ok: bool,
}

/// Migration trigger; acknowledged so the indexer stops retrying
async fn campaign_migrated() -> Json<AckResponse> {
    debug!("Campaign migration acknowledged");
    Json(AckResponse { ok: true })
}

/// Current campaign state, for clients that just connected
async fn snapshot(
    State(state): State<AppState>,
    Query(query): Query<SnapshotQuery>,
) -> Result<Json<SnapshotResponse>, ApiError> {
    let snapshot = state
        .notifications
        .snapshot(&query.campaign_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Campaign not found: {}", query.campaign_id)))?;

    Ok(Json(SnapshotResponse {
        ok: true,
        campaign_id: query.campaign_id,
        snapshot,
    }))
}

/// Create campaign routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/campaign_updated", post(campaign_updated))
        .route("/campaign_migrated", post(campaign_migrated))
        .route("/campaign/snapshot", get(snapshot))
}
