use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use aide::openapi::{Info, OpenApi};
use axum::{extract::DefaultBodyLimit, Extension, Router};
use tokio::net::TcpListener;
use tower_http::{services::ServeDir, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;

use crate::routes;
use crate::{file_storage::FileStorage, types::Environment};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Builds the application router: API routes, docs, and the static asset
/// directory as fallback for every other path
pub fn app(
    environment: Environment,
    file_storage: Arc<FileStorage>,
    static_dir: &Path,
    max_upload_bytes: usize,
) -> Router {
    let mut openapi = OpenApi {
        info: Info {
            title: "Gallery Backend".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            ..Info::default()
        },
        ..OpenApi::default()
    };

    routes::handler()
        .finish_api(&mut openapi)
        .fallback_service(ServeDir::new(static_dir))
        .layer(Extension(openapi))
        .layer(Extension(environment))
        .layer(Extension(file_storage))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
}

/// Starts the server with the given environment and dependencies
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the server fails to
/// start or bind to the port
pub async fn start(environment: Environment, file_storage: Arc<FileStorage>) -> anyhow::Result<()> {
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], Environment::port()?));
    let static_dir = Environment::static_dir();
    let max_upload_bytes = Environment::max_upload_bytes()?;

    let router = app(environment, file_storage, &static_dir, max_upload_bytes);

    let listener = TcpListener::bind(&addr).await?;
    info!(
        static_dir = %static_dir.display(),
        "🔄 Gallery backend started on http://{addr}"
    );

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(anyhow::Error::from)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown...");
        }
        () = terminate => {
            info!("Received terminate signal, starting graceful shutdown...");
        }
    }
}
