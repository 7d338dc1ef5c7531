//! Server-sent event stream endpoint

use axum::{
    body::{Body, Bytes},
    extract::{Query, State},
    http::{header, HeaderName},
    response::IntoResponse,
    routing::get,
    Router,
};
use cinder_core::Channel;
use cinder_services::{ChannelTransport, StreamSession};
use serde::Deserialize;
use std::convert::Infallible;
use tokio_stream::{wrappers::ReceiverStream, StreamExt};
use tracing::debug;

use crate::AppState;

/// Frames buffered between the session and the response body
const TRANSPORT_BUFFER: usize = 16;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamQuery {
    campaign_id: Option<String>,
}

/// Open a stream on one campaign, or on every campaign without `campaignId`
async fn stream(State(state): State<AppState>, Query(query): Query<StreamQuery>) -> impl IntoResponse {
    let channel = Channel::for_campaign(query.campaign_id.as_deref());
    debug!("Opening stream on {}", channel);

    let (transport, frames) = ChannelTransport::new(TRANSPORT_BUFFER);
    let session = StreamSession::new(state.broker.clone(), channel, state.session);
    tokio::spawn(session.run(transport, state.shutdown.child_token()));

    let body = Body::from_stream(
        ReceiverStream::new(frames).map(|frame| Ok::<_, Infallible>(Bytes::copy_from_slice(frame.as_bytes()))),
    );

    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
            (HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        body,
    )
}

/// Create stream routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/sse", get(stream))
}
