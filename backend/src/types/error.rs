//! Universal error handling for the API

use aide::OperationOutput;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use schemars::JsonSchema;
use serde::Serialize;

use crate::{object_store::StoreError, payload::PayloadError};

/// API error response envelope
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorResponse {
    /// Whether the client should retry the request
    pub allow_retry: bool,
    /// Error details
    error: ErrorBody,
}

/// Error body containing code and message
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    /// Machine-readable error code
    pub code: &'static str,
    /// Human-readable error message
    pub message: String,
}

/// Application error type that wraps the API error response
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    inner: ApiErrorResponse,
}

impl AppError {
    /// Create a new application error
    #[must_use]
    pub fn new(
        status: StatusCode,
        code: &'static str,
        message: impl Into<String>,
        retry: bool,
    ) -> Self {
        Self {
            status,
            inner: ApiErrorResponse {
                allow_retry: retry,
                error: ErrorBody {
                    code,
                    message: message.into(),
                },
            },
        }
    }

    /// Create a 400 error for a request that failed validation
    #[must_use]
    pub fn validation(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message, false)
    }

    /// HTTP status of the error
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable error code
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.inner.error.code
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the error based on status code
        match self.status.as_u16() {
            400..=499 => tracing::warn!(
                "Client error: {} - {}",
                self.inner.error.code,
                self.inner.error.message
            ),
            500..=599 => tracing::error!(
                "Server error: {} - {}",
                self.inner.error.code,
                self.inner.error.message
            ),
            _ => {}
        }

        (self.status, Json(self.inner)).into_response()
    }
}

/// Convert payload decoding errors to application errors
impl From<PayloadError> for AppError {
    fn from(err: PayloadError) -> Self {
        let code = match err {
            PayloadError::MissingSeparator => "invalid_data_url",
            PayloadError::InvalidBase64(_) => "invalid_base64",
        };
        Self::validation(code, err.to_string())
    }
}

/// Convert object store errors to application errors
impl From<StoreError> for AppError {
    #[allow(clippy::cognitive_complexity)]
    fn from(err: StoreError) -> Self {
        use StoreError::{AwsError, InvalidResponse, PresignError, ServiceError, UpstreamError};

        match &err {
            UpstreamError(msg) => {
                tracing::error!("Object store upstream error: {msg}");
                Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "upstream_error",
                    "Object store temporarily unavailable",
                    true,
                )
            }
            ServiceError(msg) | AwsError(msg) | InvalidResponse(msg) => {
                tracing::error!("Object store error: {msg}");
                Self::new(
                    StatusCode::BAD_GATEWAY,
                    "store_error",
                    "Object store request failed",
                    true,
                )
            }
            PresignError(msg) => {
                tracing::error!("Presigning error: {msg}");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error",
                    false,
                )
            }
        }
    }
}

impl OperationOutput for AppError {
    type Inner = ApiErrorResponse;

    fn operation_response(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) -> Option<aide::openapi::Response> {
        Json::<ApiErrorResponse>::operation_response(ctx, operation)
    }
}
