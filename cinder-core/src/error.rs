//! Error types for the service

use thiserror::Error;

/// Service-wide error type
#[derive(Error, Debug)]
pub enum CinderError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CinderError {
    pub fn parse(msg: impl Into<String>) -> Self {
        CinderError::Parse(msg.into())
    }

    pub fn invalid_record(msg: impl Into<String>) -> Self {
        CinderError::InvalidRecord(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        CinderError::Config(msg.into())
    }
}

/// Result type alias for service operations
pub type CinderResult<T> = Result<T, CinderError>;
