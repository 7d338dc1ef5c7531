//! Core types for the Cinder event stream and chart service
//!
//! This crate defines the shared data structures used across the service,
//! including exact monetary values, trade and campaign records, chart
//! output shapes and the server-sent event payloads.

pub mod campaign;
pub mod channel;
pub mod chart;
pub mod error;
pub mod event;
pub mod quote;
pub mod scaled;
pub mod trade;

pub use campaign::{CampaignRecord, ChangeOp};
pub use channel::{Channel, WILDCARD_CHANNEL};
pub use chart::{Candle, ChartSummary, SeriesPoint};
pub use error::{CinderError, CinderResult};
pub use event::{encode_frame, CampaignUpdatedEvent, StreamEvent, TradeCreatedEvent};
pub use quote::UsdQuote;
pub use scaled::{round_dp, to_usd, Amount, ScaledPrice, PRICE_SCALE};
pub use trade::{TradeRecord, UpstreamTradeFields};
