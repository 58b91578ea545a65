// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Seconds a caller should wait before retrying a transient upstream failure.
const RETRY_AFTER_SECS: &str = "30";

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Malformed request body or query parameters.
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Upstream is temporarily unable to serve (e.g. IAM grants still propagating).
    #[error("Upstream temporarily unavailable: {0}")]
    UpstreamTransient(String),

    #[error("Upstream quota exhausted: {0}")]
    QuotaExhausted(String),

    /// Upstream refused the call for a reason retrying will not fix.
    #[error("Upstream error: {0}")]
    UpstreamRejected(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Whether the caller is expected to back off and retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::UpstreamTransient(_) | AppError::QuotaExhausted(_)
        )
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let retryable = self.is_retryable();
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::Validation(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                Some(msg.clone()),
            ),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::UpstreamTransient(msg) => {
                tracing::warn!(error = %msg, "Upstream transient failure");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "upstream_unavailable",
                    Some(msg.clone()),
                )
            }
            AppError::QuotaExhausted(msg) => {
                tracing::warn!(error = %msg, "Upstream quota exhausted");
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    "quota_exhausted",
                    Some(msg.clone()),
                )
            }
            AppError::UpstreamRejected(msg) => {
                (StatusCode::BAD_REQUEST, "upstream_error", Some(msg.clone()))
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        let mut response = (status, Json(body)).into_response();
        if retryable {
            response.headers_mut().insert(
                header::RETRY_AFTER,
                HeaderValue::from_static(RETRY_AFTER_SECS),
            );
        }
        response
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
