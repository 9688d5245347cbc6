//! Error types for ncos-payments
//!
//! Every failure leaving a handler is an [`ApiError`], rendered as
//! `{"error": {"code", "message"}}` with the matching status code.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::services::{AnalysisError, LinkError, PaymentError};
use crate::splits::SplitError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("{0}")]
    BadRequest(String),

    /// Resource not found (404)
    #[error("{0}")]
    NotFound(String),

    /// Conflict (409), e.g. an illegal status transition
    #[error("{0}")]
    Conflict(String),

    /// Limit exceeded (429)
    #[error("{0}")]
    TooManyRequests(String),

    /// Temporarily unable to accept work (503)
    #[error("{0}")]
    ServiceUnavailable(String),

    /// Internal server error (500)
    #[error("{0}")]
    Internal(String),

    /// ncos-common error
    #[error(transparent)]
    Common(#[from] ncos_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::TooManyRequests(msg) => {
                (StatusCode::TOO_MANY_REQUESTS, "LIMIT_EXCEEDED", msg)
            }
            ApiError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "QUEUE_FULL", msg)
            }
            ApiError::Internal(msg) => {
                error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg)
            }
            ApiError::Common(ncos_common::Error::InvalidInput(msg)) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg)
            }
            ApiError::Common(err) => {
                error!(error = %err, "Storage failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR", err.to_string())
            }
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<SplitError> for ApiError {
    fn from(err: SplitError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<LinkError> for ApiError {
    fn from(err: LinkError) -> Self {
        match err {
            LinkError::Store(e) => ApiError::Common(e),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::InvalidInput(msg) => ApiError::BadRequest(msg),
            PaymentError::NotFound(_) => ApiError::NotFound(err.to_string()),
            PaymentError::IllegalTransition(_) | PaymentError::Conflict(_) => {
                ApiError::Conflict(err.to_string())
            }
            PaymentError::Store(e) => ApiError::Common(e),
        }
    }
}

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::InvalidInput(msg) => ApiError::BadRequest(msg),
            AnalysisError::NotFound(_) => ApiError::NotFound(err.to_string()),
            AnalysisError::RetryLimitReached { .. } => ApiError::TooManyRequests(err.to_string()),
            AnalysisError::QueueFull => ApiError::ServiceUnavailable(err.to_string()),
            AnalysisError::QueueClosed => ApiError::Internal(err.to_string()),
            AnalysisError::Store(e) => ApiError::Common(e),
        }
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PaymentStatus, StatusTransitionError};

    #[test]
    fn test_status_mapping() {
        let cases: Vec<(ApiError, StatusCode)> = vec![
            (LinkError::MissingField("amount").into(), StatusCode::BAD_REQUEST),
            (SplitError::Empty.into(), StatusCode::BAD_REQUEST),
            (
                PaymentError::IllegalTransition(StatusTransitionError {
                    from: PaymentStatus::Pending,
                    to: PaymentStatus::Refunded,
                })
                .into(),
                StatusCode::CONFLICT,
            ),
            (PaymentError::NotFound("p".to_string()).into(), StatusCode::NOT_FOUND),
            (
                AnalysisError::RetryLimitReached { max: 3 }.into(),
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (AnalysisError::QueueFull.into(), StatusCode::SERVICE_UNAVAILABLE),
            (AnalysisError::QueueClosed.into(), StatusCode::INTERNAL_SERVER_ERROR),
            (
                ncos_common::Error::Internal("bad row".to_string()).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }
}
