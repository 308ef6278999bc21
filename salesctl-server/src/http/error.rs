//! API error types with IntoResponse
//!
//! Errors are converted to JSON responses `{ "error": kind, "message": text }`
//! with appropriate status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use salesctl_core::QueryError;

use crate::reports::ReportError;

/// API error type with automatic HTTP status mapping
#[derive(Debug)]
pub enum ApiError {
    /// Malformed or contradictory input (400)
    InvalidParameter { field: String, reason: String },

    /// The warehouse rejected the query (400, carries its message)
    Execution { message: String },

    /// Body is not the expected JSON (400)
    InvalidBody { message: String },

    /// Nothing to report (404)
    NotFound { message: String },

    /// Internal error (500)
    Internal { message: String },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::InvalidParameter { field, reason } => (
                StatusCode::BAD_REQUEST,
                json!({
                    "error": "invalid_parameter",
                    "message": format!("invalid parameter '{}': {}", field, reason)
                }),
            ),
            Self::Execution { message } => {
                tracing::error!("Query execution failed: {}", message);
                (
                    StatusCode::BAD_REQUEST,
                    json!({
                        "error": "execution_failure",
                        "message": message
                    }),
                )
            }
            Self::InvalidBody { message } => (
                StatusCode::BAD_REQUEST,
                json!({
                    "error": "invalid_body",
                    "message": message
                }),
            ),
            Self::NotFound { message } => (
                StatusCode::NOT_FOUND,
                json!({
                    "error": "not_found",
                    "message": message
                }),
            ),
            Self::Internal { message } => {
                // Log the actual error, return generic message
                tracing::error!("Internal error: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "error": "internal_error",
                        "message": "an internal error occurred"
                    }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<QueryError> for ApiError {
    fn from(e: QueryError) -> Self {
        match e {
            QueryError::InvalidParameter { field, reason } => Self::InvalidParameter { field, reason },
            QueryError::ExecutionFailure { message } => Self::Execution { message },
            QueryError::Template { .. } => Self::Internal { message: e.to_string() },
        }
    }
}

impl From<ReportError> for ApiError {
    fn from(e: ReportError) -> Self {
        match e {
            ReportError::Query(e) => e.into(),
            ReportError::InvalidBody(message) => Self::InvalidBody { message },
            ReportError::NoData(_) => Self::NotFound { message: e.to_string() },
            ReportError::UnknownReport(_) => Self::NotFound { message: e.to_string() },
        }
    }
}
