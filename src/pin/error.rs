//! Core Error Classification
//!
//! A single error taxonomy shared by authentication, the handler, and the
//! query boundary: classify once, at the point the error is detected, and
//! let the transport map the classification to an HTTP status and the
//! wire error body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::pin::wire::FailureError;

/// Error kinds surfaced by the core.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed request ID, invalid enum value, out-of-range limit/list bounds.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Missing bearer, unknown token.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Pin lookup miss, or owner mismatch — indistinguishable to the client.
    #[error("not found: {0}")]
    NotFound(String),

    /// Reserved for future use; the wire schema allows it.
    #[error("conflict: {0}")]
    #[allow(dead_code)]
    Conflict(String),

    /// Any unexpected error from the Store or the Backend.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    #[must_use]
    pub fn bad_request(details: impl Into<String>) -> Self {
        Self::BadRequest(details.into())
    }

    #[must_use]
    pub fn unauthorized(details: impl Into<String>) -> Self {
        Self::Unauthorized(details.into())
    }

    #[must_use]
    pub fn not_found(details: impl Into<String>) -> Self {
        Self::NotFound(details.into())
    }

    #[must_use]
    pub fn internal(details: impl Into<String>) -> Self {
        Self::Internal(details.into())
    }

    const fn reason(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "INSUFFICIENT_FUNDS",
            Self::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!(error = %err, "store error");
        Self::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(serde_json::json!({
            "error": FailureError {
                reason: self.reason().to_string(),
                details: self.to_string(),
            }
        }));
        (status, body).into_response()
    }
}
