//! Error types for the math service API layer.

use std::error::Error;

use axum::Json;
use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for API operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request body could not be read from the connection.
    #[error("failed to read request body")]
    Body(#[from] BytesRejection),

    /// The request declares a body that is not JSON.
    #[error("unsupported content type {0:?}, expected JSON")]
    UnsupportedContentType(String),

    /// The request body is not valid JSON or does not match the expected schema.
    #[error("invalid request body")]
    Unprocessable(#[from] serde_json::Error),

    /// The computed sum is infinite or NaN and cannot be written as JSON.
    #[error("result {0} cannot be represented in JSON")]
    NonFiniteResult(f64),
}

/// Result type for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// A JSON error response returned by the API.
#[derive(Serialize, Deserialize, Debug)]
pub struct ApiErrorResponse {
    /// The main error message.
    #[serde(default)]
    pub detail: Option<String>,
    /// Chain of error causes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<String>,
}

impl ApiErrorResponse {
    /// Creates an error response with only a message.
    pub fn with_detail(detail: impl Into<String>) -> Self {
        Self {
            detail: Some(detail.into()),
            causes: Vec::new(),
        }
    }

    /// Creates an error response from an error, extracting the full cause chain.
    pub fn from_error<E: Error + ?Sized>(error: &E) -> Self {
        let detail = Some(error.to_string());

        let mut causes = Vec::new();
        let mut source = error.source();
        while let Some(s) = source {
            causes.push(s.to_string());
            source = s.source();
        }

        Self { detail, causes }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Body(rejection) => rejection.status(),
            ApiError::UnsupportedContentType(_) | ApiError::Unprocessable(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::NonFiniteResult(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = &self as &dyn Error, "error handling request");
        } else {
            tracing::debug!(error = &self as &dyn Error, "rejecting request");
        }

        let body = ApiErrorResponse::from_error(&self);
        (status, Json(body)).into_response()
    }
}
