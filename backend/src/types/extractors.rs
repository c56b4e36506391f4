//! Custom extractors for request validation

use aide::operation::OperationInput;
use aide::OperationOutput;
use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    Json,
};
use schemars::JsonSchema;
use validator::Validate;

use crate::types::error::AppError;

/// Custom JSON extractor that validates the payload.
///
/// Every rejection is reported as a 400 with the crate's error envelope,
/// except oversized bodies which are reported as 413.
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: serde::de::DeserializeOwned + Validate + JsonSchema,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        // First extract JSON
        let Json(payload) = Json::<T>::from_request(req, state)
            .await
            .map_err(|err| match err {
                JsonRejection::MissingJsonContentType(_) => AppError::validation(
                    "invalid_content_type",
                    "Missing Content-Type: application/json header",
                ),
                err if err.status() == StatusCode::PAYLOAD_TOO_LARGE => AppError::new(
                    StatusCode::PAYLOAD_TOO_LARGE,
                    "payload_too_large",
                    "Request body is too large",
                    false,
                ),
                err => AppError::validation("invalid_json", err.body_text()),
            })?;

        // Then validate
        payload.validate().map_err(|errors| {
            // The first field error carries the error code in its message
            for (field, field_errors) in errors.field_errors() {
                if let Some(error) = field_errors.first() {
                    if let Some(message) = &error.message {
                        let code = match message.as_ref() {
                            "invalid_name" => "invalid_name",
                            "invalid_data_url" => "invalid_data_url",
                            _ => "validation_error",
                        };
                        return AppError::validation(code, format!("Invalid field: {field}"));
                    }
                }
            }
            AppError::validation("validation_error", "Request validation failed")
        })?;

        Ok(Self(payload))
    }
}

impl<T> OperationInput for ValidatedJson<T>
where
    T: JsonSchema,
{
    fn operation_input(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) {
        // Delegate to Json<T>'s implementation since ValidatedJson has the same structure
        Json::<T>::operation_input(ctx, operation);
    }

    fn inferred_early_responses(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) -> Vec<(Option<u16>, aide::openapi::Response)> {
        // Document validation error responses
        AppError::inferred_responses(ctx, operation)
    }
}
