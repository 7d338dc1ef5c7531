//! USD quote snapshot for the base asset

use serde::{Deserialize, Serialize};

/// Default quote source name
pub const DEFAULT_QUOTE_SOURCE: &str = "coinmarketcap";

/// Latest known USD price of the base asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsdQuote {
    /// USD per one human unit of the base asset
    pub price: f64,
    /// Upstream timestamp of the quote, if reported
    pub updated_at: Option<String>,
    /// Where the quote came from
    pub source: String,
}

impl UsdQuote {
    pub fn new(price: f64, updated_at: Option<String>) -> Self {
        Self {
            price,
            updated_at,
            source: DEFAULT_QUOTE_SOURCE.to_string(),
        }
    }
}
