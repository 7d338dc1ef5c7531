//! Services for the Cinder event stream and chart service
//!
//! This crate holds the event broker and the stream sessions built on it,
//! the chart aggregation engine and its query service, the cached USD price
//! feed and the notification publisher. Upstream data is reached through
//! the traits in [`sources`].

pub mod broker;
pub mod chart;
pub mod chart_service;
pub mod notifications;
pub mod price_feed;
pub mod session;
pub mod sources;

pub use broker::{BrokerMessage, DeliveryReport, EventBroker, QueueReceiver, SubscriberId, SubscriberQueue};
pub use chart::{
    bucket_count, bucket_start, build_series_and_candles, build_summary, checked_bucket_start, fill_gaps,
};
pub use chart_service::{ChartDefaults, ChartError, ChartHistory, ChartQuery, ChartService, ChartWindow};
pub use notifications::{build_campaign_updated, build_trade_created, NotificationError, NotificationService};
pub use price_feed::{PollOutcome, PriceFeed};
pub use session::{ChannelTransport, SessionConfig, SessionExit, SessionTransport, StreamSession, TransportClosed};
pub use sources::{CampaignSource, QuoteSource, SourceError, TradeSource};
