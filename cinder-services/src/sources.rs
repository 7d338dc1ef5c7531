//! Upstream data sources
//!
//! The services only depend on these traits; the indexer and quote clients
//! implement them, tests substitute in-memory fakes.

use async_trait::async_trait;
use cinder_core::{CampaignRecord, TradeRecord, UsdQuote};
use cinder_indexer::{IndexerClient, IndexerError};
use cinder_quotes::{CoinMarketCapClient, QuoteError};
use thiserror::Error;

/// Errors reported by an upstream source
#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    Indexer(#[from] IndexerError),

    #[error(transparent)]
    Quote(#[from] QuoteError),

    #[error("Source unavailable: {0}")]
    Unavailable(String),
}

/// Supplies trades of a campaign, sorted by `(timestamp, block_height)`
#[async_trait]
pub trait TradeSource: Send + Sync {
    async fn trades(
        &self,
        campaign_id: &str,
        from: i64,
        to: i64,
    ) -> Result<Vec<TradeRecord>, SourceError>;
}

/// Supplies the current state of a campaign
#[async_trait]
pub trait CampaignSource: Send + Sync {
    async fn campaign(&self, campaign_id: &str) -> Result<Option<CampaignRecord>, SourceError>;
}

/// Supplies USD quotes for the base asset
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// `Ok(None)` when the upstream answered without a usable price
    async fn fetch_quote(&self) -> Result<Option<UsdQuote>, SourceError>;
}

#[async_trait]
impl TradeSource for IndexerClient {
    async fn trades(
        &self,
        campaign_id: &str,
        from: i64,
        to: i64,
    ) -> Result<Vec<TradeRecord>, SourceError> {
        Ok(self.fetch_trades(campaign_id, from, to).await?)
    }
}

#[async_trait]
impl CampaignSource for IndexerClient {
    async fn campaign(&self, campaign_id: &str) -> Result<Option<CampaignRecord>, SourceError> {
        Ok(self.fetch_campaign(campaign_id).await?)
    }
}

#[async_trait]
impl QuoteSource for CoinMarketCapClient {
    async fn fetch_quote(&self) -> Result<Option<UsdQuote>, SourceError> {
        match CoinMarketCapClient::fetch_quote(self).await {
            Ok(quote) => Ok(Some(quote)),
            Err(QuoteError::MissingQuote(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
