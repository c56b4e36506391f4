mod docs;
/// Gallery file endpoints
pub mod files;
mod health;

use aide::axum::{
    routing::{get, post},
    ApiRouter,
};

/// Creates the router with all handler routes
pub fn handler() -> ApiRouter {
    ApiRouter::new()
        .merge(docs::handler())
        .api_route("/health", get(health::handler))
        .api_route("/api/files", get(files::list_files))
        .api_route("/api/upload_files", post(files::upload_file))
        .api_route("/api/delete_file", post(files::delete_file))
}
