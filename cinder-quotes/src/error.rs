//! Error types for the quotes module

use thiserror::Error;

/// Errors that can occur fetching a quote
#[derive(Debug, Error)]
pub enum QuoteError {
    /// HTTP request failed
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// API returned a non-success status
    #[error("API error (status {status})")]
    ApiError {
        /// HTTP status code
        status: u16,
    },

    /// Failed to parse API response
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Response carried no USD price for the symbol
    #[error("No USD quote for {0}")]
    MissingQuote(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
