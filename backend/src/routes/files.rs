use std::sync::Arc;

use axum::{Extension, Json};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use validator::Validate;

use crate::{
    file_storage::FileStorage,
    listing::SignedObject,
    payload::decode_data_url,
    types::{AppError, ValidatedJson},
};

/// A stored file with a temporary download URL
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub struct FileEntry {
    /// Object key
    pub key: String,
    /// Presigned download URL, valid for one hour
    pub url: String,
    /// RFC 3339 timestamp of the last write, empty if unknown
    pub last_modified: String,
}

impl From<SignedObject> for FileEntry {
    fn from(object: SignedObject) -> Self {
        Self {
            key: object.key,
            url: object.url,
            last_modified: object
                .last_modified
                .map(|ts| ts.to_rfc3339())
                .unwrap_or_default(),
        }
    }
}

/// Body of `POST /api/upload_files`
#[derive(Debug, Deserialize, Serialize, Validate, JsonSchema)]
pub struct UploadFileRequest {
    /// Data URL style payload: `<prefix>,<base64 data>`
    #[validate(contains(pattern = ",", message = "invalid_data_url"))]
    pub data: String,
    /// Key to store the file under; an existing file is replaced
    #[validate(length(min = 1, message = "invalid_name"))]
    pub name: String,
}

/// Response of `POST /api/upload_files`
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadFileResponse {
    /// Presigned download URL for the stored file, valid for one hour
    pub image_url: String,
}

/// Body of `POST /api/delete_file`
#[derive(Debug, Deserialize, Serialize, Validate, JsonSchema)]
pub struct DeleteFileRequest {
    /// Key of the file to delete
    #[validate(length(min = 1, message = "invalid_name"))]
    pub name: String,
}

/// Response of `POST /api/delete_file`
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct DeleteFileResponse {
    /// Always `ok`
    pub message: String,
}

/// Lists every file in the bucket
///
/// Walks all listing pages and mints a fresh one-hour download URL per file.
/// A failure on any page or any URL fails the whole request.
#[instrument(skip(file_storage))]
pub async fn list_files(
    Extension(file_storage): Extension<Arc<FileStorage>>,
) -> Result<Json<Vec<FileEntry>>, AppError> {
    let files = file_storage.list_files().await?;

    Ok(Json(files.into_iter().map(FileEntry::from).collect()))
}

/// Uploads a base64 encoded file
///
/// Decodes the `data` payload, stores it under `name` (replacing any existing
/// file) and returns a one-hour download URL.
///
/// # Errors
///
/// - 400 when the body is not valid JSON, `data` has no `,` separator or the
///   payload is not valid base64; the store is not contacted in that case
/// - 5xx when the write or the presigning fails
#[instrument(skip(file_storage, payload), fields(name = %payload.name))]
pub async fn upload_file(
    Extension(file_storage): Extension<Arc<FileStorage>>,
    ValidatedJson(payload): ValidatedJson<UploadFileRequest>,
) -> Result<Json<UploadFileResponse>, AppError> {
    let decoded = decode_data_url(&payload.data)?;

    let presigned_url = file_storage.upload_file(&payload.name, decoded).await?;

    Ok(Json(UploadFileResponse {
        image_url: presigned_url.url,
    }))
}

/// Deletes a file
///
/// No existence check is made; deleting a missing file succeeds.
#[instrument(skip(file_storage, payload), fields(name = %payload.name))]
pub async fn delete_file(
    Extension(file_storage): Extension<Arc<FileStorage>>,
    ValidatedJson(payload): ValidatedJson<DeleteFileRequest>,
) -> Result<Json<DeleteFileResponse>, AppError> {
    file_storage.delete_file(&payload.name).await?;

    Ok(Json(DeleteFileResponse {
        message: "ok".to_string(),
    }))
}
