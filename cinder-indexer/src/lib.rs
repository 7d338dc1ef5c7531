//! Hasura indexer integration for the Cinder service
//!
//! This crate provides a GraphQL client for reading trades and campaign
//! snapshots from the indexer, plus the payload types Hasura event triggers
//! post to the service when rows change.
//!
//! Set `HASURA_ADMIN_SECRET` when the indexer requires admin access.

pub mod client;
pub mod error;
pub mod types;

pub use client::IndexerClient;
pub use error::IndexerError;
pub use types::{
    CampaignRow, CampaignUpdatedPayload, CampaignUpdatedWebhook, TradeInsertPayload, TradeRow,
};
