//! # API Error Types
//!
//! Maps domain errors from sigil-zkp and the prophecy sealer to HTTP status
//! codes and flat `{error, code}` JSON bodies. Internal detail is logged,
//! never returned.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use sigil_zkp::{VerifyError, ZkError};
use thiserror::Error;
use utoipa::ToSchema;

use crate::prophecy::ProphecyError;

/// JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Human-readable message.
    pub error: String,
    /// Machine-readable code, e.g. `PUBLIC_INPUT_MISMATCH`.
    pub code: String,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    /// Request body could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Parsed request breaks a business rule (422).
    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Zk(#[from] ZkError),

    #[error(transparent)]
    Prophecy(#[from] ProphecyError),

    /// A bounded operation ran out of time (503).
    #[error("timed out: {0}")]
    Timeout(String),

    /// Message is logged but not returned to the client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<VerifyError> for AppError {
    fn from(err: VerifyError) -> Self {
        Self::Zk(ZkError::Verify(err))
    }
}

impl AppError {
    pub(crate) fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::Zk(e) if e.is_client_error() => (StatusCode::BAD_REQUEST, e.code()),
            Self::Zk(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            Self::Prophecy(e) if e.is_client_error() => (StatusCode::BAD_REQUEST, e.code()),
            Self::Prophecy(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            Self::Timeout(_) => (StatusCode::SERVICE_UNAVAILABLE, "TIMEOUT"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = if status.is_server_error() && !matches!(self, Self::Timeout(_)) {
            tracing::error!(error = %self, "internal server error");
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorBody {
            error: message,
            code: code.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
