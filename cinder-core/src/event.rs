//! Server-sent event payloads
//!
//! These types define what stream clients receive. Every payload is
//! JSON-encoded into a single `data:` line of a server-sent event frame.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{Amount, ChangeOp, Channel, CinderResult, ScaledPrice};

// ============================================================================
// Stream events
// ============================================================================

/// Events sent to stream clients
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// First event of every stream
    Ready {
        channel: Channel,
        #[serde(rename = "connectedAt")]
        connected_at: DateTime<Utc>,
    },
    /// Liveness signal emitted when the stream has been idle
    Heartbeat { channel: Channel, ts: DateTime<Utc> },
    /// Campaign state changed
    CampaignUpdated(CampaignUpdatedEvent),
    /// A trade was executed
    TradeCreated(TradeCreatedEvent),
}

impl StreamEvent {
    /// SSE event name
    pub fn name(&self) -> &'static str {
        match self {
            StreamEvent::Ready { .. } => "ready",
            StreamEvent::Heartbeat { .. } => "heartbeat",
            StreamEvent::CampaignUpdated(_) => "campaign_updated",
            StreamEvent::TradeCreated(_) => "trade_created",
        }
    }

    /// Encode as a complete SSE frame
    pub fn to_frame(&self, event_id: Option<&str>) -> CinderResult<String> {
        let data = serde_json::to_string(self)?;
        Ok(encode_frame(self.name(), event_id, &data))
    }
}

/// Format one server-sent event frame
///
/// `data` must not contain newlines; compact JSON never does.
pub fn encode_frame(event: &str, event_id: Option<&str>, data: &str) -> String {
    let mut frame = String::with_capacity(data.len() + event.len() + 32);
    if let Some(id) = event_id.filter(|id| !id.is_empty()) {
        frame.push_str("id: ");
        frame.push_str(id);
        frame.push('\n');
    }
    frame.push_str("event: ");
    frame.push_str(event);
    frame.push_str("\ndata: ");
    frame.push_str(data);
    frame.push_str("\n\n");
    frame
}

// ============================================================================
// Payloads
// ============================================================================

/// Campaign state snapshot pushed on every campaign change
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignUpdatedEvent {
    pub op: ChangeOp,
    pub campaign_id: String,
    pub current_price: Option<String>,
    pub current_price_scaled: Option<ScaledPrice>,
    pub current_price_usd: Option<f64>,
    pub total_volume_base: Option<Amount>,
    pub total_volume_usd: Option<f64>,
    pub total_pledged: Option<Amount>,
    pub progress: Option<f64>,
    pub curve_sold_supply: Option<Amount>,
    pub curve_max_supply: Option<Amount>,
    pub market_cap_base: Option<Amount>,
    pub market_cap_usd: Option<f64>,
    pub fuel_usd: Option<f64>,
    pub fuel_usd_updated_at: Option<String>,
    pub status: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// A newly indexed trade
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeCreatedEvent {
    pub trade_id: String,
    pub campaign_id: String,
    pub side: Option<String>,
    /// Upstream strings, untouched
    pub amount_base: Option<String>,
    pub amount_token: Option<String>,
    pub price_scaled: Option<ScaledPrice>,
    pub price: Option<String>,
    pub price_usd: Option<f64>,
    pub timestamp: Option<String>,
    pub block_height: Option<String>,
    pub fuel_usd: Option<f64>,
    pub fuel_usd_updated_at: Option<String>,
    pub updated_at: DateTime<Utc>,
}
