//! Health and broker statistics endpoints

use axum::{extract::State, response::Json, routing::get, Router};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
struct HealthResponse {
    ok: bool,
    indexer_url: String,
}

/// Subscriber counts per channel
#[derive(Debug, Serialize)]
struct BrokerStatsResponse {
    ok: bool,
    subscriptions: BTreeMap<String, usize>,
}

async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        indexer_url: state.indexer_url.to_string(),
    })
}

async fn broker_stats(State(state): State<AppState>) -> Json<BrokerStatsResponse> {
    Json(BrokerStatsResponse {
        ok: true,
        subscriptions: state.broker.stats(),
    })
}

/// Create health routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/broker_stats", get(broker_stats))
}
