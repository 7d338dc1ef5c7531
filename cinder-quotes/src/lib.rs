//! USD quotes for the base asset
//!
//! Quotes come from the CoinMarketCap "quotes/latest" API. Polling and
//! caching live in `cinder-services`; this crate only performs single
//! requests.

pub mod coinmarketcap;
pub mod error;

pub use coinmarketcap::{normalize_endpoint, CoinMarketCapClient, DEFAULT_QUOTES_PATH};
pub use error::QuoteError;
