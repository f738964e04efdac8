//! Custom error types for the studio service

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::error::GenerationError;
use serde_json::json;
use thiserror::Error;

/// Custom error type for the studio service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Bad request with message
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Nothing to act on
    #[error("Not found: {0}")]
    NotFound(String),

    /// The script assistant produced nothing
    #[error("Could not generate script. Please try again.")]
    NoScript,

    /// The generation flow rejected the call
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::NoScript => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Generation(e) => match e {
                GenerationError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                GenerationError::Capability => StatusCode::FORBIDDEN,
                GenerationError::InsufficientCredits { .. } => StatusCode::PAYMENT_REQUIRED,
                GenerationError::JobInFlight => StatusCode::CONFLICT,
                GenerationError::Submission(_) | GenerationError::Poll(_) => {
                    StatusCode::BAD_GATEWAY
                }
                GenerationError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                GenerationError::RemoteGeneration { .. }
                | GenerationError::MissingResult
                | GenerationError::Cancelled => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
