//! Error types for object store operations

use aws_sdk_s3::{
    error::{DisplayErrorContext, SdkError},
    operation::{
        delete_object::DeleteObjectError, list_objects_v2::ListObjectsV2Error,
        put_object::PutObjectError,
    },
};
use thiserror::Error;

/// Result type for object store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while talking to the object store
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store rejected the request
    #[error("Object store service error: {0}")]
    ServiceError(String),

    /// The store answered with a 5xx status
    #[error("Upstream service error: {0}")]
    UpstreamError(String),

    /// Transport, timeout or credential failure inside the SDK
    #[error("AWS SDK error: {0}")]
    AwsError(String),

    /// Presigning could not be configured or performed
    #[error("Presigning error: {0}")]
    PresignError(String),

    /// The store returned a response that cannot be acted upon
    #[error("Invalid store response: {0}")]
    InvalidResponse(String),
}

impl StoreError {
    /// Maps an SDK error, separating 5xx responses from other service errors
    fn from_sdk<E>(operation: &str, error: SdkError<E>) -> Self
    where
        E: std::error::Error + 'static,
    {
        let message = format!("{operation}: {}", DisplayErrorContext(&error));

        match &error {
            SdkError::ServiceError(service_err) if service_err.raw().status().as_u16() >= 500 => {
                Self::UpstreamError(message)
            }
            SdkError::ServiceError(_) => Self::ServiceError(message),
            _ => Self::AwsError(message),
        }
    }
}

impl From<SdkError<ListObjectsV2Error>> for StoreError {
    fn from(error: SdkError<ListObjectsV2Error>) -> Self {
        Self::from_sdk("ListObjectsV2", error)
    }
}

impl From<SdkError<PutObjectError>> for StoreError {
    fn from(error: SdkError<PutObjectError>) -> Self {
        Self::from_sdk("PutObject", error)
    }
}

impl From<SdkError<DeleteObjectError>> for StoreError {
    fn from(error: SdkError<DeleteObjectError>) -> Self {
        Self::from_sdk("DeleteObject", error)
    }
}
