//! HTTP error type for the JSON API
//!
//! Every error renders as `{"error": "<kind>", "message": "<text>"}` with
//! the matching status code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Missing or invalid credentials (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Unique constraint violation (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// gg-common error, status chosen by variant
    #[error(transparent)]
    Common(#[from] gg_common::Error),
}

impl ApiError {
    pub fn forbidden() -> Self {
        ApiError::Forbidden("Insufficient permissions".to_string())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        ApiError::NotFound(what.into())
    }

    fn parts(self) -> (StatusCode, String) {
        use gg_common::Error as E;
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            ApiError::Common(err) => match err {
                E::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
                E::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
                E::Conflict(msg) => (StatusCode::CONFLICT, msg),
                E::Token(_) => (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string()),
                err if err.is_unique_violation() => (StatusCode::CONFLICT, err.to_string()),
                err => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            },
        }
    }
}

/// Lower-case reason phrase used as the `error` field
fn kind(status: StatusCode) -> &'static str {
    match status {
        StatusCode::BAD_REQUEST => "bad request",
        StatusCode::UNAUTHORIZED => "unauthorized",
        StatusCode::FORBIDDEN => "forbidden",
        StatusCode::NOT_FOUND => "not found",
        StatusCode::CONFLICT => "conflict",
        _ => "internal server error",
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.parts();
        if status.is_server_error() {
            error!("Request failed: {}", message);
        }

        let body = Json(json!({
            "error": kind(status),
            "message": message,
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
