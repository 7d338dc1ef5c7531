//! HTTP error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use cinder_services::{ChartError, NotificationError};
use serde::Serialize;
use tracing::error;

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Errors returned by route handlers
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    /// An upstream service failed
    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        (status, Json(ErrorResponse { error: self.to_string() })).into_response()
    }
}

impl From<ChartError> for ApiError {
    fn from(e: ChartError) -> Self {
        match e {
            ChartError::Source(source) => ApiError::Upstream(source.to_string()),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

impl From<NotificationError> for ApiError {
    fn from(e: NotificationError) -> Self {
        match e {
            NotificationError::Source(source) => ApiError::Upstream(source.to_string()),
            NotificationError::Encode(encode) => ApiError::Internal(encode.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinder_services::SourceError;

    #[test]
    fn test_status_mapping() {
        let bad: ApiError = ChartError::InvalidInterval(5).into();
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

        let upstream: ApiError = ChartError::Source(SourceError::Unavailable("down".to_string())).into();
        assert_eq!(upstream.status(), StatusCode::BAD_GATEWAY);

        let response = ApiError::NotFound("Campaign not found: c1".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
