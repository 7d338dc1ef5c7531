//! Indexer GraphQL client
//!
//! Reads trades and campaign snapshots from the Hasura endpoint that sits in
//! front of the indexer database.

use cinder_core::{CampaignRecord, TradeRecord};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::types::{CampaignsData, GraphQlResponse, TradesData};
use crate::IndexerError;

const GRAPHQL_PATH: &str = "/v1/graphql";

/// Placeholder for the timestamp scalar in [`TRADES_QUERY`]
const TS_TYPE: &str = "$TS_TYPE";

/// Deployments expose `Trade.timestamp` as either scalar
const TIMESTAMP_TYPES: [&str; 2] = ["numeric", "bigint"];

const TRADES_QUERY: &str = r#"
query Trades($campaignId: String!, $from: $TS_TYPE!, $to: $TS_TYPE!) {
  Trade(
    where: {
      campaign_id: { _eq: $campaignId }
      timestamp: { _gte: $from, _lte: $to }
      price_scaled: { _is_null: false }
    }
    order_by: [{ timestamp: asc }, { block_height: asc }]
  ) {
    id
    campaign_id
    side
    amount_token
    amount_base
    price_scaled
    price
    timestamp
    block_height
  }
}
"#;

const CAMPAIGN_QUERY: &str = r#"
query CampaignSnapshot($campaignId: String!) {
  Campaign(where: { id: { _eq: $campaignId } }, limit: 1) {
    id
    current_price
    current_price_scaled
    total_volume_base
    total_pledged
    curve_sold_supply
    curve_max_supply
    token_decimals
    status
  }
}
"#;

/// Resolve the GraphQL endpoint from the configured indexer URL
pub fn graphql_endpoint(indexer_url: &str) -> String {
    if indexer_url.ends_with(GRAPHQL_PATH) {
        indexer_url.to_string()
    } else {
        format!("{}{}", indexer_url.trim_end_matches('/'), GRAPHQL_PATH)
    }
}

/// True when the indexer rejected the timestamp scalar we guessed
fn is_timestamp_type_mismatch(errors: &str) -> bool {
    errors.contains("where 'numeric' is expected") || errors.contains("where 'bigint' is expected")
}

/// Hasura GraphQL client
#[derive(Clone)]
pub struct IndexerClient {
    client: Client,
    endpoint: String,
    admin_secret: Option<String>,
}

impl IndexerClient {
    /// Create a client for the indexer at `indexer_url`
    pub fn new(indexer_url: &str, admin_secret: Option<String>) -> Result<Self, IndexerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| IndexerError::Network(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: graphql_endpoint(indexer_url),
            admin_secret: admin_secret.filter(|s| !s.is_empty()),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST a query and return the raw response body
    async fn post(&self, query: &str, variables: Value) -> Result<GraphQlResponse<Value>, IndexerError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header("Accept", "application/json")
            .json(&json!({ "query": query, "variables": variables }));

        if let Some(secret) = &self.admin_secret {
            request = request.header("x-hasura-admin-secret", secret);
        }

        let response = request
            .send()
            .await
            .map_err(|e| IndexerError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(IndexerError::Http {
                status: response.status().as_u16(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| IndexerError::Parse(e.to_string()))
    }

    /// Execute a query, failing on any GraphQL error
    async fn execute<T: DeserializeOwned>(&self, query: &str, variables: Value) -> Result<T, IndexerError> {
        let response = self.post(query, variables).await?;
        decode_data(response)
    }

    /// Fetch chartable trades of a campaign in `[from, to]`, ascending
    ///
    /// Rows that fail validation are skipped.
    #[instrument(skip(self))]
    pub async fn fetch_trades(
        &self,
        campaign_id: &str,
        from: i64,
        to: i64,
    ) -> Result<Vec<TradeRecord>, IndexerError> {
        let variables = json!({
            "campaignId": campaign_id,
            "from": from.to_string(),
            "to": to.to_string(),
        });

        let mut last_errors = String::new();
        for ts_type in TIMESTAMP_TYPES {
            let query = TRADES_QUERY.replace(TS_TYPE, ts_type);
            let response = self.post(&query, variables.clone()).await?;

            if response.errors.is_empty() {
                let data: TradesData = decode_data(response)?;
                debug!("Fetched {} trades for {}", data.trades.len(), campaign_id);
                return Ok(data
                    .trades
                    .into_iter()
                    .filter_map(|row| match TradeRecord::try_from(row) {
                        Ok(trade) => Some(trade),
                        Err(e) => {
                            warn!("Skipping trade row: {}", e);
                            None
                        }
                    })
                    .collect());
            }

            last_errors = errors_to_string(&response.errors);
            if !is_timestamp_type_mismatch(&last_errors) {
                break;
            }
            debug!("Timestamp is not {}, retrying", ts_type);
        }

        Err(IndexerError::GraphQl(last_errors))
    }

    /// Fetch the current snapshot of a campaign, if it exists
    #[instrument(skip(self))]
    pub async fn fetch_campaign(&self, campaign_id: &str) -> Result<Option<CampaignRecord>, IndexerError> {
        let data: CampaignsData = self
            .execute(CAMPAIGN_QUERY, json!({ "campaignId": campaign_id }))
            .await?;

        data.campaigns
            .into_iter()
            .next()
            .map(CampaignRecord::try_from)
            .transpose()
    }
}

fn errors_to_string(errors: &[Value]) -> String {
    serde_json::to_string(errors).unwrap_or_else(|_| format!("{:?}", errors))
}

fn decode_data<T: DeserializeOwned>(response: GraphQlResponse<Value>) -> Result<T, IndexerError> {
    if !response.errors.is_empty() {
        return Err(IndexerError::GraphQl(errors_to_string(&response.errors)));
    }
    let data = response.data.unwrap_or(Value::Null);
    serde_json::from_value(data).map_err(|e| IndexerError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graphql_endpoint() {
        assert_eq!(
            graphql_endpoint("http://indexer:8080"),
            "http://indexer:8080/v1/graphql"
        );
        assert_eq!(
            graphql_endpoint("http://indexer:8080/"),
            "http://indexer:8080/v1/graphql"
        );
        assert_eq!(
            graphql_endpoint("http://indexer:8080/v1/graphql"),
            "http://indexer:8080/v1/graphql"
        );
    }

    #[test]
    fn test_trades_query_substitution() {
        let query = TRADES_QUERY.replace(TS_TYPE, "bigint");
        assert!(query.contains("$from: bigint!, $to: bigint!"));
        assert!(!query.contains(TS_TYPE));
    }

    #[test]
    fn test_timestamp_type_mismatch_detection() {
        assert!(is_timestamp_type_mismatch(
            r#"[{"message":"variable 'from' is declared as 'numeric!', but used where 'bigint' is expected"}]"#
        ));
        assert!(!is_timestamp_type_mismatch(r#"[{"message":"field 'Trade' not found"}]"#));
    }

    #[test]
    fn test_decode_data() {
        let response: GraphQlResponse<Value> = serde_json::from_value(json!({
            "data": { "Campaign": [{ "id": "c1", "current_price_scaled": 1000000000 }] }
        }))
        .unwrap();
        let data: CampaignsData = decode_data(response).unwrap();
        assert_eq!(data.campaigns.len(), 1);
        assert_eq!(data.campaigns[0].current_price_scaled.as_deref(), Some("1000000000"));

        let failed: GraphQlResponse<Value> = serde_json::from_value(json!({
            "errors": [{ "message": "boom" }]
        }))
        .unwrap();
        assert!(matches!(
            decode_data::<CampaignsData>(failed),
            Err(IndexerError::GraphQl(msg)) if msg.contains("boom")
        ));
    }

    #[test]
    fn test_admin_secret_ignored_when_empty() {
        let client = IndexerClient::new("http://indexer:8080", Some(String::new())).unwrap();
        assert!(client.admin_secret.is_none());
        assert_eq!(client.endpoint(), "http://indexer:8080/v1/graphql");
    }
}
