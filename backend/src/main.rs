use std::sync::Arc;

use aws_sdk_s3::Client as S3Client;

use gallery_backend::{
    file_storage::FileStorage, object_store::S3ObjectStore, server, types::Environment,
};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine, the process environment is used as is
    dotenvy::dotenv().ok();

    let environment = Environment::from_env()?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Use JSON format for staging/production, regular format for development
    if environment.json_logs() {
        fmt().json().with_env_filter(env_filter).init();
    } else {
        fmt().with_env_filter(env_filter).init();
    }

    let bucket_name = environment.bucket_name()?;
    let s3_client = Arc::new(S3Client::from_conf(environment.s3_client_config().await));
    let object_store = S3ObjectStore::new(s3_client, bucket_name);

    tracing::info!(
        bucket = object_store.bucket_name(),
        endpoint = %environment.storage_endpoint_url(),
        "configured object store"
    );

    let file_storage = Arc::new(FileStorage::new(
        Arc::new(object_store),
        environment.presigned_url_expiry(),
    ));

    server::start(environment, file_storage).await
}
