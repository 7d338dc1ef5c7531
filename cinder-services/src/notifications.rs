//! Campaign and trade notifications
//!
//! Turns indexer change events into stream payloads enriched with USD
//! values and fans them out through the broker.

use chrono::Utc;
use cinder_core::{
    to_usd, CampaignRecord, CampaignUpdatedEvent, ChangeOp, CinderError, StreamEvent,
    TradeCreatedEvent, TradeRecord, UsdQuote,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::broker::{DeliveryReport, EventBroker};
use crate::price_feed::PriceFeed;
use crate::sources::{CampaignSource, SourceError};

/// Errors that can occur publishing a notification
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Failed to encode event: {0}")]
    Encode(#[from] CinderError),

    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Build the `campaign_updated` payload for a campaign
///
/// A missing price or volume counts as zero for the USD fields.
pub fn build_campaign_updated(
    campaign: &CampaignRecord,
    op: ChangeOp,
    quote: Option<&UsdQuote>,
) -> CampaignUpdatedEvent {
    let usd_rate = quote.map(|q| q.price);
    let current_price = campaign
        .current_price_scaled
        .as_ref()
        .map(|p| p.to_human())
        .unwrap_or(0.0);
    let market_cap_base = campaign.market_cap_base();

    CampaignUpdatedEvent {
        op,
        campaign_id: campaign.id.clone(),
        current_price: campaign.current_price.clone(),
        current_price_scaled: campaign.current_price_scaled.clone(),
        current_price_usd: to_usd(current_price, usd_rate),
        total_volume_base: campaign.total_volume_base.clone(),
        total_volume_usd: to_usd(campaign.total_volume_display(), usd_rate),
        total_pledged: campaign.total_pledged.clone(),
        progress: campaign.progress(),
        curve_sold_supply: campaign.curve_sold_supply.clone(),
        curve_max_supply: campaign.curve_max_supply.clone(),
        market_cap_usd: market_cap_base
            .as_ref()
            .and_then(|cap| to_usd(cap.to_f64_lossy(), usd_rate)),
        market_cap_base,
        fuel_usd: usd_rate,
        fuel_usd_updated_at: quote.and_then(|q| q.updated_at.clone()),
        status: campaign.status.clone(),
        updated_at: Utc::now(),
    }
}

/// Build the `trade_created` payload for a trade
pub fn build_trade_created(trade: &TradeRecord, quote: Option<&UsdQuote>) -> TradeCreatedEvent {
    let usd_rate = quote.map(|q| q.price);
    let price = trade
        .price_scaled
        .as_ref()
        .map(|p| p.to_human())
        .unwrap_or(0.0);

    TradeCreatedEvent {
        trade_id: trade.id.clone(),
        campaign_id: trade.campaign_id.clone(),
        side: trade.side.clone(),
        amount_base: trade.upstream.amount_base.clone(),
        amount_token: trade.upstream.amount_token.clone(),
        price_scaled: trade.price_scaled.clone(),
        price: trade.price.clone(),
        price_usd: to_usd(price, usd_rate),
        timestamp: trade.upstream.timestamp.clone(),
        block_height: trade.upstream.block_height.clone(),
        fuel_usd: usd_rate,
        fuel_usd_updated_at: quote.and_then(|q| q.updated_at.clone()),
        updated_at: Utc::now(),
    }
}

/// Publishes campaign and trade events to stream subscribers
pub struct NotificationService {
    broker: Arc<EventBroker>,
    price_feed: Arc<PriceFeed>,
    campaigns: Arc<dyn CampaignSource>,
}

impl NotificationService {
    pub fn new(
        broker: Arc<EventBroker>,
        price_feed: Arc<PriceFeed>,
        campaigns: Arc<dyn CampaignSource>,
    ) -> Self {
        Self {
            broker,
            price_feed,
            campaigns,
        }
    }

    fn publish(
        &self,
        entity_id: &str,
        event: &StreamEvent,
        event_id: Option<&str>,
    ) -> Result<DeliveryReport, NotificationError> {
        let frame = event.to_frame(event_id)?;
        let report = self.broker.publish_to_entity(entity_id, &Arc::from(frame));
        info!(
            "Published {} for {} ({} global, {} campaign)",
            event.name(),
            entity_id,
            report.global,
            report.scoped
        );
        Ok(report)
    }

    /// Publish a campaign change
    pub async fn campaign_updated(
        &self,
        campaign: &CampaignRecord,
        op: ChangeOp,
        event_id: Option<&str>,
    ) -> Result<DeliveryReport, NotificationError> {
        let quote = self.price_feed.quote().await;
        let event = StreamEvent::CampaignUpdated(build_campaign_updated(campaign, op, quote.as_ref()));
        self.publish(&campaign.id, &event, event_id)
    }

    /// Publish a newly indexed trade
    pub async fn trade_created(
        &self,
        trade: &TradeRecord,
        event_id: Option<&str>,
    ) -> Result<DeliveryReport, NotificationError> {
        let quote = self.price_feed.quote().await;
        let event = StreamEvent::TradeCreated(build_trade_created(trade, quote.as_ref()));
        self.publish(&trade.campaign_id, &event, event_id)
    }

    /// Current state of a campaign as a `MANUAL` payload, without publishing
    pub async fn snapshot(
        &self,
        campaign_id: &str,
    ) -> Result<Option<CampaignUpdatedEvent>, NotificationError> {
        let Some(campaign) = self.campaigns.campaign(campaign_id).await? else {
            debug!("Campaign {} not found", campaign_id);
            return Ok(None);
        };
        let quote = self.price_feed.quote().await;
        Ok(Some(build_campaign_updated(
            &campaign,
            ChangeOp::Manual,
            quote.as_ref(),
        )))
    }
}
