//! Error types for the indexer module

use thiserror::Error;

/// Errors that can occur talking to the indexer
#[derive(Debug, Error)]
pub enum IndexerError {
    /// HTTP request failed
    #[error("Indexer request failed: {0}")]
    Network(String),

    /// Indexer answered with a non-success status
    #[error("Indexer GraphQL request failed: {status}")]
    Http {
        /// HTTP status code
        status: u16,
    },

    /// Failed to parse the response
    #[error("Parse error: {0}")]
    Parse(String),

    /// GraphQL-level errors reported by the indexer
    #[error("Indexer GraphQL errors: {0}")]
    GraphQl(String),

    /// A row is missing required fields
    #[error("Invalid row: {0}")]
    InvalidRow(String),
}
