use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use gadbatch::{BatchError, ExportError, StoreError};

/// Error returned by handlers, rendered as `{"error": message}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    /// The message is sent to the client; details are logged where the
    /// error is converted.
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn bad_request(message: &str) -> Self {
        ApiError::BadRequest(message.to_string())
    }

    pub fn not_found(message: &str) -> Self {
        ApiError::NotFound(message.to_string())
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(m) | ApiError::NotFound(m) | ApiError::Internal(m) => m,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.message() }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        tracing::error!("Store error: {}", e);
        ApiError::Internal("Internal storage error".to_string())
    }
}

impl From<ExportError> for ApiError {
    fn from(e: ExportError) -> Self {
        tracing::error!("Export error: {}", e);
        ApiError::Internal("Failed to create download".to_string())
    }
}

impl From<BatchError> for ApiError {
    fn from(e: BatchError) -> Self {
        match e {
            BatchError::InvalidFileCount { count, max } => {
                tracing::debug!("Rejected upload of {} files (max {})", count, max);
                ApiError::bad_request("Invalid batch upload data")
            }
            BatchError::InvalidFileSize { name, size } => {
                tracing::debug!("Rejected upload of {} ({} bytes)", name, size);
                ApiError::bad_request("Invalid batch upload data")
            }
            BatchError::JobNotFound(_) => ApiError::not_found("Batch job not found"),
            BatchError::NotPending(_) => ApiError::bad_request("Job is not in pending status"),
            BatchError::Store(e) => e.into(),
            other => {
                tracing::error!("Batch error: {}", other);
                ApiError::Internal("Failed to start batch processing".to_string())
            }
        }
    }
}
