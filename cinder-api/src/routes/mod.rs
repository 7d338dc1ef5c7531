//! HTTP route definitions

mod campaign;
mod chart;
mod health;
mod sse;
mod trade;

use axum::{
    http::{header, Method},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::AppState;

/// Build the full application router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .merge(health::routes())
        .merge(sse::routes())
        .merge(campaign::routes())
        .merge(trade::routes())
        .merge(chart::routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        response::Response,
    };
    use cinder_core::{Amount, CampaignRecord, Channel, TradeRecord};
    use cinder_services::{
        CampaignSource, ChartDefaults, ChartService, EventBroker, NotificationService, PriceFeed,
        SessionConfig, SourceError, TradeSource,
    };
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tokio_stream::StreamExt;
    use tokio_util::sync::CancellationToken;
    use tower::ServiceExt;

    struct FakeIndexer {
        trades: Vec<TradeRecord>,
    }

    #[async_trait]
    impl TradeSource for FakeIndexer {
        async fn trades(
            &self,
            _campaign_id: &str,
            _from_ts: i64,
            _to_ts: i64,
        ) -> Result<Vec<TradeRecord>, SourceError> {
            Ok(self.trades.clone())
        }
    }

    #[async_trait]
    impl CampaignSource for FakeIndexer {
        async fn campaign(&self, campaign_id: &str) -> Result<Option<CampaignRecord>, SourceError> {
            Ok((campaign_id == "c1").then(|| CampaignRecord {
                id: "c1".to_string(),
                current_price_scaled: Some("1000000000".parse().unwrap()),
                ..Default::default()
            }))
        }
    }

    fn trade(id: &str, timestamp: i64, price_scaled: &str) -> TradeRecord {
        TradeRecord {
            id: id.to_string(),
            campaign_id: "c1".to_string(),
            side: Some("buy".to_string()),
            amount_base: Amount::from(10),
            amount_token: Amount::from(5),
            price_scaled: Some(price_scaled.parse().unwrap()),
            price: None,
            timestamp,
            block_height: None,
            ..Default::default()
        }
    }

    fn state() -> AppState {
        let indexer = Arc::new(FakeIndexer {
            trades: vec![
                trade("t1", 1_000, "1000000000"),
                trade("t2", 1_030, "2000000000"),
            ],
        });
        let broker = Arc::new(EventBroker::new());
        let feed = Arc::new(PriceFeed::disabled());

        AppState {
            notifications: Arc::new(NotificationService::new(
                broker.clone(),
                feed.clone(),
                indexer.clone(),
            )),
            charts: Arc::new(ChartService::new(indexer, feed, ChartDefaults::default())),
            broker,
            session: SessionConfig::default(),
            indexer_url: Arc::from("http://indexer.test"),
            shutdown: CancellationToken::new(),
        }
    }

    async fn send(state: &AppState, request: Request<Body>) -> Response {
        router(state.clone()).oneshot(request).await.unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    fn post(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn hasura_meta() -> Value {
        json!({
            "created_at": "2024-05-01T12:00:00Z",
            "delivery_info": { "current_retry": 0, "max_retries": 0 },
            "id": "evt-1",
            "table": { "name": "Trade", "schema": "public" },
            "trigger": { "name": "on_insert" }
        })
    }

    fn with_event(event: Value) -> Value {
        let mut body = hasura_meta();
        body["event"] = event;
        body
    }

    #[tokio::test]
    async fn test_healthz_and_broker_stats() {
        let state = state();
        let response = send(&state, get("/healthz")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["ok"], true);
        assert_eq!(json["indexer_url"], "http://indexer.test");

        let json = json_body(send(&state, get("/broker_stats")).await).await;
        assert_eq!(json["subscriptions"]["*"], 0);
    }

    #[tokio::test]
    async fn test_trade_webhook_publishes() {
        let state = state();
        let (queue, mut rx) = state.broker.queue(4);
        state.broker.subscribe(&Channel::from_key("c1"), &queue);

        let body = with_event(json!({
            "data": { "new": {
                "id": "t9",
                "campaign_id": "c1",
                "amount_base": 100,
                "amount_token": "50.000",
                "price_scaled": "2000000000",
                "timestamp": "1700000000"
            }},
            "op": "INSERT"
        }));
        let response = send(&state, post("/trade", body.clone())).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["tradeId"], "t9");
        assert_eq!(json["delivered"]["campaign"], 1);
        assert_eq!(json["delivered"]["global"], 0);

        let frame = rx.try_recv().unwrap();
        assert!(frame.starts_with("id: evt-1\nevent: trade_created\n"));
        assert!(frame.contains(r#""amountBase":"100""#));
        assert!(frame.contains(r#""amountToken":"50.000""#));
        assert!(frame.contains(r#""timestamp":"1700000000""#));

        // Older trigger name reaches the same handler
        let response = send(&state, post("/trade_updated", body)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_campaign_webhook() {
        let state = state();
        let body = with_event(json!({
            "data": { "new": null, "old": { "id": "c7", "status": "closed" } },
            "op": "DELETE"
        }));
        let response = send(&state, post("/campaign_updated", body)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["campaignId"], "c7");
        assert_eq!(json["delivered"]["global"], 0);

        let response = send(&state, post("/campaign_migrated", json!({ "anything": 1 }))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({ "ok": true }));

        let empty = with_event(json!({ "data": { "new": null, "old": null }, "op": "UPDATE" }));
        let response = send(&state, post("/campaign_updated", empty)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert_eq!(json["error"], "Invalid payload: missing event.data.new/old");
    }

    #[tokio::test]
    async fn test_campaign_snapshot() {
        let state = state();
        let json = json_body(send(&state, get("/campaign/snapshot?campaignId=c1")).await).await;
        assert_eq!(json["ok"], true);
        assert_eq!(json["snapshot"]["op"], "MANUAL");
        assert_eq!(json["snapshot"]["currentPriceScaled"], "1000000000");

        let response = send(&state, get("/campaign/snapshot?campaignId=nope")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["error"], "Campaign not found: nope");
    }

    #[tokio::test]
    async fn test_chart_history() {
        let state = state();
        let uri = "/chart/history?campaignId=c1&fromTs=960&toTs=1140&intervalSec=60";
        let response = send(&state, get(uri)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        assert_eq!(json["ok"], true);
        assert_eq!(json["campaignId"], "c1");
        assert_eq!(json["intervalSec"], 60);
        assert_eq!(json["series"].as_array().unwrap().len(), 2);
        // Buckets 960, 1020, 1080, 1140
        assert_eq!(json["candles"].as_array().unwrap().len(), 4);
        assert_eq!(json["summary"]["tradeCount"], 2);
        assert!(json["fuelUsd"].is_null());

        let response = send(&state, get("/chart/history?campaignId=c1&intervalSec=5")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let uri = "/chart/history?campaignId=c1&fromTs=-9223372036854775808&toTs=0";
        let response = send(&state, get(uri)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_sse_stream_starts_with_ready() {
        let state = state();
        let response = send(&state, get("/sse?campaignId=c1")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/event-stream"
        );
        assert_eq!(response.headers()["x-accel-buffering"], "no");

        let mut body = response.into_body().into_data_stream();
        let first = body.next().await.unwrap().unwrap();
        let first = std::str::from_utf8(&first).unwrap();
        assert!(first.starts_with("event: ready\n"));
        assert!(first.contains("\"channel\":\"c1\""));

        state.shutdown.cancel();
    }
}
