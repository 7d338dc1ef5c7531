//! Executed trade records

use serde::{Deserialize, Serialize};

use crate::{Amount, ScaledPrice};

/// Numeric columns exactly as the upstream sent them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamTradeFields {
    pub amount_base: Option<String>,
    pub amount_token: Option<String>,
    pub timestamp: Option<String>,
    pub block_height: Option<String>,
}

/// A single executed trade, as delivered by the trade source
///
/// Trade sources deliver these ordered ascending by `(timestamp, block_height)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: String,
    pub campaign_id: String,
    /// "buy" / "sell" as reported upstream
    pub side: Option<String>,
    /// Base-asset units exchanged
    pub amount_base: Amount,
    /// Token units exchanged
    pub amount_token: Amount,
    /// Execution price scaled by 10^9
    pub price_scaled: Option<ScaledPrice>,
    /// Upstream display price, passed through untouched
    pub price: Option<String>,
    /// Unix seconds; non-positive means unknown
    pub timestamp: i64,
    pub block_height: Option<u64>,
    /// Unparsed values, echoed in `trade_created` payloads
    #[serde(default)]
    pub upstream: UpstreamTradeFields,
}

impl TradeRecord {
    /// Price and timestamp when the trade can be placed on a chart
    pub fn chart_point(&self) -> Option<(i64, &ScaledPrice)> {
        if self.timestamp <= 0 {
            return None;
        }
        self.price_scaled.as_ref().map(|p| (self.timestamp, p))
    }
}
