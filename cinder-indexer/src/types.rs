//! Indexer wire types
//!
//! Raw rows come back loosely typed (numeric columns may arrive as JSON
//! numbers or strings depending on the Hasura scalar), so they are read
//! into string-based rows first and validated into `cinder_core` records.

use cinder_core::{Amount, CampaignRecord, ChangeOp, TradeRecord, UpstreamTradeFields};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::HashMap;

use crate::IndexerError;

/// Accept a JSON string or number as an optional string
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

// ============================================================================
// Rows
// ============================================================================

/// Trade row as stored by the indexer
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TradeRow {
    #[serde(default)]
    pub id: String,
    pub user_id: Option<String>,
    #[serde(default)]
    pub campaign_id: String,
    pub side: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub amount_token: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub amount_base: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub price_scaled: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub price: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub timestamp: Option<String>,
    pub tx_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub block_height: Option<String>,
}

impl TryFrom<TradeRow> for TradeRecord {
    type Error = IndexerError;

    fn try_from(row: TradeRow) -> Result<Self, Self::Error> {
        if row.id.is_empty() {
            return Err(IndexerError::InvalidRow("trade without id".to_string()));
        }
        if row.campaign_id.is_empty() {
            return Err(IndexerError::InvalidRow(format!(
                "trade {} without campaign_id",
                row.id
            )));
        }

        Ok(TradeRecord {
            amount_base: Amount::parse_lenient(row.amount_base.as_deref()),
            amount_token: Amount::parse_lenient(row.amount_token.as_deref()),
            // Unparseable prices and timestamps make the trade unchartable
            price_scaled: non_empty(row.price_scaled).and_then(|p| p.trim().parse().ok()),
            timestamp: row
                .timestamp
                .as_deref()
                .and_then(|t| t.trim().parse().ok())
                .unwrap_or(0),
            block_height: row.block_height.as_deref().and_then(|h| h.trim().parse().ok()),
            upstream: UpstreamTradeFields {
                amount_base: row.amount_base,
                amount_token: row.amount_token,
                timestamp: row.timestamp,
                block_height: row.block_height,
            },
            price: non_empty(row.price),
            side: non_empty(row.side),
            id: row.id,
            campaign_id: row.campaign_id,
        })
    }
}

/// Campaign row as stored by the indexer
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CampaignRow {
    #[serde(default)]
    pub id: String,
    pub created_at: Option<String>,
    pub creator_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub current_price: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub current_price_scaled: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub curve_max_supply: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub curve_sold_supply: Option<String>,
    pub status: Option<String>,
    pub token_asset_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub token_decimals: Option<String>,
    pub token_name: Option<String>,
    pub token_ticker: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub total_pledged: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub total_volume_base: Option<String>,
}

impl TryFrom<CampaignRow> for CampaignRecord {
    type Error = IndexerError;

    fn try_from(row: CampaignRow) -> Result<Self, Self::Error> {
        if row.id.is_empty() {
            return Err(IndexerError::InvalidRow("campaign without id".to_string()));
        }

        let amount = |v: Option<String>| v.and_then(|s| s.trim().parse::<Amount>().ok());

        Ok(CampaignRecord {
            current_price_scaled: non_empty(row.current_price_scaled)
                .and_then(|p| p.trim().parse().ok()),
            current_price: non_empty(row.current_price),
            total_volume_base: amount(row.total_volume_base),
            total_pledged: amount(row.total_pledged),
            curve_sold_supply: amount(row.curve_sold_supply),
            curve_max_supply: amount(row.curve_max_supply),
            token_decimals: row.token_decimals.and_then(|d| d.trim().parse().ok()),
            status: row.status,
            id: row.id,
        })
    }
}

// ============================================================================
// GraphQL responses
// ============================================================================

/// GraphQL response envelope
#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TradesData {
    #[serde(rename = "Trade", default)]
    pub trades: Vec<TradeRow>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CampaignsData {
    #[serde(rename = "Campaign", default)]
    pub campaigns: Vec<CampaignRow>,
}

// ============================================================================
// Event trigger payloads
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct HasuraHeader {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HasuraDeliveryInfo {
    pub current_retry: u32,
    pub max_retries: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HasuraTable {
    pub name: String,
    #[serde(rename = "schema")]
    pub schema_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HasuraTrigger {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CampaignEventData {
    pub new: Option<CampaignRow>,
    pub old: Option<CampaignRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CampaignEvent {
    pub data: CampaignEventData,
    pub op: ChangeOp,
    pub session_variables: Option<HashMap<String, String>>,
    pub trace_context: Option<Value>,
}

/// Body Hasura posts when a campaign row changes
#[derive(Debug, Clone, Deserialize)]
pub struct CampaignUpdatedPayload {
    pub created_at: String,
    pub delivery_info: HasuraDeliveryInfo,
    pub event: CampaignEvent,
    /// Delivery id, reused as the SSE event id
    pub id: String,
    pub table: HasuraTable,
    pub trigger: HasuraTrigger,
}

impl CampaignUpdatedPayload {
    /// The row after the change, or before it for deletes
    pub fn row(&self) -> Option<&CampaignRow> {
        self.event.data.new.as_ref().or(self.event.data.old.as_ref())
    }
}

/// Same payload wrapped with request metadata (replayed deliveries)
#[derive(Debug, Clone, Deserialize)]
pub struct CampaignUpdatedEnvelope {
    #[serde(default)]
    pub headers: Vec<HasuraHeader>,
    pub payload: CampaignUpdatedPayload,
    pub version: Option<String>,
}

/// Either shape of the campaign trigger body
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CampaignUpdatedWebhook {
    Direct(CampaignUpdatedPayload),
    Envelope(CampaignUpdatedEnvelope),
}

impl CampaignUpdatedWebhook {
    pub fn into_payload(self) -> CampaignUpdatedPayload {
        match self {
            CampaignUpdatedWebhook::Direct(payload) => payload,
            CampaignUpdatedWebhook::Envelope(envelope) => envelope.payload,
        }
    }
}

/// Trade triggers only fire on insert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum InsertOp {
    #[serde(rename = "INSERT")]
    Insert,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TradeInsertData {
    pub new: TradeRow,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TradeInsertEvent {
    pub data: TradeInsertData,
    pub op: InsertOp,
}

/// Body Hasura posts when a trade row is inserted
#[derive(Debug, Clone, Deserialize)]
pub struct TradeInsertPayload {
    pub created_at: String,
    pub delivery_info: HasuraDeliveryInfo,
    pub event: TradeInsertEvent,
    pub id: String,
    pub table: HasuraTable,
    pub trigger: HasuraTrigger,
}
