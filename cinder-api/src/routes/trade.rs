//! Trade webhook endpoints

use axum::{extract::State, response::Json, routing::post, Router};
use cinder_core::TradeRecord;
use cinder_indexer::TradeInsertPayload;
use cinder_services::DeliveryReport;
use serde::Serialize;
use tracing::info;

use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TradeResponse {
    ok: bool,
    trade_id: String,
    campaign_id: String,
    delivered: DeliveryReport,
}

/// Trade row inserted in the indexer
async fn trade_inserted(
    State(state): State<AppState>,
    Json(payload): Json<TradeInsertPayload>,
) -> Result<Json<TradeResponse>, ApiError> {
    let trade = TradeRecord::try_from(payload.event.data.new)
        .map_err(|e| ApiError::BadRequest(format!("Invalid payload: {}", e)))?;

    info!("Trade {} on campaign {}", trade.id, trade.campaign_id);
    let delivered = state
        .notifications
        .trade_created(&trade, Some(&payload.id))
        .await?;

    Ok(Json(TradeResponse {
        ok: true,
        trade_id: trade.id,
        campaign_id: trade.campaign_id,
        delivered,
    }))
}

/// Create trade routes
///
/// `/trade_updated` is the name older triggers were registered under.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/trade", post(trade_inserted))
        .route("/trade_updated", post(trade_inserted))
}
