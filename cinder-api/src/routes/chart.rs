//! Chart history endpoint

use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Router,
};
use cinder_services::{ChartHistory, ChartQuery};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryParams {
    campaign_id: String,
    from_ts: Option<i64>,
    to_ts: Option<i64>,
    interval_sec: Option<i64>,
}

#[derive(Debug, Serialize)]
struct HistoryResponse {
    ok: bool,
    #[serde(flatten)]
    history: ChartHistory,
}

async fn history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let query = ChartQuery {
        campaign_id: params.campaign_id,
        from_ts: params.from_ts,
        to_ts: params.to_ts,
        interval_sec: params.interval_sec,
    };
    let history = state.charts.history(&query).await?;
    Ok(Json(HistoryResponse { ok: true, history }))
}

/// Create chart routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/chart/history", get(history))
}
