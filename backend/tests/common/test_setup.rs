use std::sync::Arc;

use axum::{body::Body, http::Request, response::Response, Router};
use gallery_backend::{
    file_storage::FileStorage, object_store::InMemoryObjectStore, server, types::Environment,
};
use tempfile::TempDir;
use tower::ServiceExt;

use super::utils::{create_upload_request, parse_response_body};

pub const TEST_BUCKET: &str = "test-bucket";
pub const INDEX_HTML: &str = "<!doctype html><title>Gallery</title>";
/// Body limit used by the test router
pub const TEST_MAX_UPLOAD_BYTES: usize = 1024 * 1024;

/// Setup test environment variables with all the required configuration
pub fn setup_test_env() {
    // Load test environment variables
    dotenvy::from_path(".env.example").ok();

    // Initialize tracing for tests
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .try_init()
        .ok();
}

/// Router wired to an in-memory object store and a temporary asset directory
pub struct TestSetup {
    pub router: Router,
    pub store: Arc<InMemoryObjectStore>,
    pub environment: Environment,
    // Keep the asset directory alive for the duration of the test
    _static_dir: TempDir,
}

impl TestSetup {
    pub fn new() -> Self {
        Self::with_store(InMemoryObjectStore::new(TEST_BUCKET))
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self::with_store(InMemoryObjectStore::new(TEST_BUCKET).with_page_size(page_size))
    }

    pub fn with_store(store: InMemoryObjectStore) -> Self {
        Self::build(
            store,
            Environment::Development {
                presign_expiry_override: None,
            },
        )
    }

    pub fn with_environment(environment: Environment) -> Self {
        Self::build(InMemoryObjectStore::new(TEST_BUCKET), environment)
    }

    fn build(store: InMemoryObjectStore, environment: Environment) -> Self {
        setup_test_env();

        let store = Arc::new(store);

        let static_dir = tempfile::tempdir().expect("Failed to create static dir");
        std::fs::write(static_dir.path().join("index.html"), INDEX_HTML)
            .expect("Failed to write index.html");
        std::fs::create_dir(static_dir.path().join("assets")).expect("Failed to create assets");
        std::fs::write(static_dir.path().join("assets/app.js"), "console.log('gallery');")
            .expect("Failed to write app.js");

        let file_storage = Arc::new(FileStorage::new(
            store.clone(),
            environment.presigned_url_expiry(),
        ));

        let router = server::app(
            environment.clone(),
            file_storage,
            static_dir.path(),
            TEST_MAX_UPLOAD_BYTES,
        );

        Self {
            router,
            store,
            environment,
            _static_dir: static_dir,
        }
    }

    pub async fn send_post_request(
        &self,
        route: &str,
        payload: serde_json::Value,
    ) -> Result<Response, Box<dyn std::error::Error>> {
        self.send_raw_post_request(route, payload.to_string()).await
    }

    pub async fn send_raw_post_request(
        &self,
        route: &str,
        body: impl Into<Body>,
    ) -> Result<Response, Box<dyn std::error::Error>> {
        let request = Request::builder()
            .uri(route)
            .method("POST")
            .header("Content-Type", "application/json")
            .body(body.into())?;

        let response = self.router.clone().oneshot(request).await?;
        Ok(response)
    }

    pub async fn send_get_request(
        &self,
        route: &str,
    ) -> Result<Response, Box<dyn std::error::Error>> {
        let request = Request::builder()
            .uri(route)
            .method("GET")
            .body(Body::empty())?;
        let response = self.router.clone().oneshot(request).await?;
        Ok(response)
    }

    /// Uploads `bytes` under `name` through the API and returns the response body
    pub async fn upload(&self, name: &str, bytes: &[u8]) -> serde_json::Value {
        let response = self
            .send_post_request("/api/upload_files", create_upload_request(name, bytes))
            .await
            .expect("Failed to send upload request");
        assert_eq!(response.status(), http::StatusCode::OK, "upload of {name} failed");
        parse_response_body(response).await
    }

    /// Lists files through the API and returns the parsed entries
    pub async fn list(&self) -> Vec<serde_json::Value> {
        let response = self
            .send_get_request("/api/files")
            .await
            .expect("Failed to send list request");
        assert_eq!(response.status(), http::StatusCode::OK);
        parse_response_body(response)
            .await
            .as_array()
            .expect("listing is a JSON array")
            .clone()
    }

    /// Keys returned by the listing endpoint, in response order
    pub async fn listed_keys(&self) -> Vec<String> {
        self.list()
            .await
            .iter()
            .map(|entry| entry["Key"].as_str().expect("Key is a string").to_string())
            .collect()
    }
}
