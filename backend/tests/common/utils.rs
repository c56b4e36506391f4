use axum::response::Response;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use http_body_util::BodyExt;
use serde_json::json;
use uuid::Uuid;

/// Parse response body to JSON
pub async fn parse_response_body(response: Response) -> serde_json::Value {
    let body = response_bytes(response).await;
    serde_json::from_slice(&body).unwrap()
}

/// Collect the raw response body
pub async fn response_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

/// Build a data URL the way browsers' `FileReader.readAsDataURL` does
pub fn to_data_url(media_type: &str, bytes: &[u8]) -> String {
    format!("data:{media_type};base64,{}", STANDARD.encode(bytes))
}

/// Upload request body for `bytes` stored under `name`
pub fn create_upload_request(name: &str, bytes: &[u8]) -> serde_json::Value {
    json!({
        "data": to_data_url("application/octet-stream", bytes),
        "name": name,
    })
}

/// A unique object key for tests
pub fn unique_key(extension: &str) -> String {
    format!("{}.{extension}", Uuid::new_v4().simple())
}

/// Deterministic but non-trivial binary content
pub fn binary_content(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i * 31 % 251) as u8).collect()
}
