//! Environment configuration for different deployment stages

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use aws_config::{timeout::TimeoutConfig, BehaviorVersion, Region};
use thiserror::Error;

/// Tigris, the storage provider used outside development
const DEFAULT_STORAGE_ENDPOINT: &str = "https://fly.storage.tigris.dev";
/// LocalStack endpoint for development
const DEVELOPMENT_STORAGE_ENDPOINT: &str = "http://localhost:4566";
const DEVELOPMENT_BUCKET: &str = "gallery-files";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_STATIC_DIR: &str = "public";
/// Assets shipped with the crate, used when `public` is not in the working directory
const BUNDLED_STATIC_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/public");
/// Download URLs are valid for one hour
const PRESIGNED_URL_EXPIRY_SECS: u64 = 60 * 60;
/// Base64 inflates uploads by a third; 20 MiB covers 15 MiB files
const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Errors raised while reading configuration from the environment
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// `APP_ENV` holds an unknown stage
    #[error("Invalid environment: {0}")]
    InvalidEnvironment(String),

    /// A required variable is not set
    #[error("{0} environment variable is not set")]
    MissingVariable(&'static str),

    /// A variable is set but cannot be parsed
    #[error("Invalid value for {name}: {value}")]
    InvalidVariable {
        /// Variable name
        name: &'static str,
        /// Offending value
        value: String,
    },
}

/// Application environment configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    /// Production environment
    Production,
    /// Staging environment
    Staging,
    /// Development environment (uses `LocalStack`)
    Development {
        /// Optional override for presigned URL expiry in seconds
        presign_expiry_override: Option<u64>,
    },
}

impl Environment {
    /// Creates an Environment from the `APP_ENV` environment variable
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvironment` if `APP_ENV` holds an unknown value
    pub fn from_env() -> Result<Self, ConfigError> {
        let env = env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .trim()
            .to_lowercase();

        match env.as_str() {
            "production" => Ok(Self::Production),
            "staging" => Ok(Self::Staging),
            "development" => {
                let presign_expiry_override = env::var("PRESIGNED_URL_EXPIRY_SECS")
                    .ok()
                    .and_then(|val| val.parse::<u64>().ok());

                Ok(Self::Development {
                    presign_expiry_override,
                })
            }
            _ => Err(ConfigError::InvalidEnvironment(env)),
        }
    }

    /// Returns the bucket name for the environment
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingVariable` outside development when `BUCKET_NAME` is not set
    pub fn bucket_name(&self) -> Result<String, ConfigError> {
        match (self, env::var("BUCKET_NAME")) {
            (_, Ok(bucket)) if !bucket.trim().is_empty() => Ok(bucket.trim().to_string()),
            (Self::Development { .. }, _) => Ok(DEVELOPMENT_BUCKET.to_string()),
            (Self::Production | Self::Staging, _) => {
                Err(ConfigError::MissingVariable("BUCKET_NAME"))
            }
        }
    }

    /// Whether to show API docs
    #[must_use]
    pub const fn show_api_docs(&self) -> bool {
        matches!(self, Self::Development { .. } | Self::Staging)
    }

    /// Whether logs should be emitted as JSON
    #[must_use]
    pub const fn json_logs(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }

    /// Returns the object store endpoint, honouring `STORAGE_ENDPOINT_URL`
    #[must_use]
    pub fn storage_endpoint_url(&self) -> String {
        env::var("STORAGE_ENDPOINT_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| {
                match self {
                    Self::Production | Self::Staging => DEFAULT_STORAGE_ENDPOINT,
                    Self::Development { .. } => DEVELOPMENT_STORAGE_ENDPOINT,
                }
                .to_string()
            })
    }

    /// Returns the signing region; Tigris expects the `auto` sentinel
    #[must_use]
    pub fn region(&self) -> String {
        match self {
            Self::Production | Self::Staging => "auto".to_string(),
            Self::Development { .. } => {
                env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string())
            }
        }
    }

    /// AWS configuration with endpoint, region and timeout settings
    pub async fn aws_config(&self) -> aws_config::SdkConfig {
        let timeout_config = TimeoutConfig::builder()
            .operation_timeout(Duration::from_secs(30))
            .build();

        aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(self.region()))
            .endpoint_url(self.storage_endpoint_url())
            .timeout_config(timeout_config)
            .load()
            .await
    }

    /// AWS S3 service configuration
    pub async fn s3_client_config(&self) -> aws_sdk_s3::Config {
        let aws_config = self.aws_config().await;
        let s3_config: aws_sdk_s3::Config = (&aws_config).into();
        let mut builder = s3_config.to_builder();

        // Override "force path style" to true for compatibility with LocalStack
        // https://github.com/awslabs/aws-sdk-rust/discussions/874
        if matches!(self, Self::Development { .. }) {
            builder.set_force_path_style(Some(true));
        }

        builder.build()
    }

    /// Validity of presigned download URLs
    #[must_use]
    pub fn presigned_url_expiry(&self) -> Duration {
        match self {
            Self::Production | Self::Staging => Duration::from_secs(PRESIGNED_URL_EXPIRY_SECS),
            Self::Development {
                presign_expiry_override,
            } => Duration::from_secs(presign_expiry_override.unwrap_or(PRESIGNED_URL_EXPIRY_SECS)),
        }
    }

    /// Port to listen on, from `PORT`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidVariable` if `PORT` is not a valid port number
    pub fn port() -> Result<u16, ConfigError> {
        parse_var("PORT", DEFAULT_PORT)
    }

    /// Maximum accepted request body, from `MAX_UPLOAD_BYTES`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidVariable` if `MAX_UPLOAD_BYTES` is not a number
    pub fn max_upload_bytes() -> Result<usize, ConfigError> {
        parse_var("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)
    }

    /// Directory of static assets served at `/`, from `STATIC_DIR`
    ///
    /// Without `STATIC_DIR`, `public` in the working directory is used if it
    /// exists, otherwise the crate's bundled `public` directory.
    #[must_use]
    pub fn static_dir() -> PathBuf {
        if let Ok(dir) = env::var("STATIC_DIR") {
            return PathBuf::from(dir);
        }

        let relative = PathBuf::from(DEFAULT_STATIC_DIR);
        if relative.is_dir() {
            relative
        } else {
            PathBuf::from(BUNDLED_STATIC_DIR)
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidVariable { name, value }),
        Err(_) => Ok(default),
    }
}
