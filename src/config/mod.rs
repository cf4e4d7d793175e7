use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use axum::http::HeaderName;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::StorageBackend;
use crate::services::WriteRetryPolicy;

/// Every setting is read from `FOODCART_<KEY>`, e.g. `FOODCART_PORT`
pub const ENV_PREFIX: &str = "FOODCART";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading error: {message}")]
    LoadError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub identity: IdentityConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_max_request_size")]
    pub max_request_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default = "default_users_table")]
    pub users_table_name: String,
    #[serde(default = "default_carts_table")]
    pub carts_table_name: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// JSON array of foods; the built-in menu is used when unset
    #[serde(default)]
    pub catalog_path: Option<String>,
    /// Tries per cart write when other replicas change the same cart
    #[serde(default = "default_cart_write_attempts")]
    pub cart_write_attempts: u32,
    #[serde(default = "default_cart_retry_base_delay_ms")]
    pub cart_retry_base_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    /// Header set by the session layer in front of the service, carrying
    /// the authenticated caller's email
    #[serde(default = "default_identity_header")]
    pub identity_header: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_service_version")]
    pub service_version: String,
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub enable_json_logging: bool,
}

impl Config {
    pub fn from_environment() -> Result<Self, ConfigError> {
        info!("Loading configuration from environment");
        Self::from_source(config::Environment::with_prefix(ENV_PREFIX))
    }

    /// Load from an explicit environment source. Keys are flat, so every
    /// section deserializes from the same settings.
    pub fn from_source(source: config::Environment) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(source)
            .build()
            .map_err(|e| ConfigError::LoadError {
                message: format!("Failed to load config: {}", e),
            })?;

        let config = Config {
            server: section(&settings, "server")?,
            storage: section(&settings, "storage")?,
            identity: section(&settings, "identity")?,
            observability: section(&settings, "observability")?,
        };

        config.validate()?;

        info!("Configuration loaded successfully");
        debug!("Configuration: {:?}", config);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError {
                message: "Server port cannot be 0".to_string(),
            });
        }

        if self.server.request_timeout_seconds == 0 {
            return Err(ConfigError::ValidationError {
                message: "Request timeout cannot be 0".to_string(),
            });
        }

        if self.server.max_request_size == 0 {
            return Err(ConfigError::ValidationError {
                message: "Max request size cannot be 0".to_string(),
            });
        }

        if self.storage.users_table_name.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "Users table name cannot be empty".to_string(),
            });
        }

        if self.storage.carts_table_name.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "Carts table name cannot be empty".to_string(),
            });
        }

        if self.storage.cart_write_attempts == 0 {
            return Err(ConfigError::ValidationError {
                message: "Cart write attempts must be at least 1".to_string(),
            });
        }

        self.identity.header_name()?;

        Ok(())
    }
}

fn section<T: serde::de::DeserializeOwned>(
    settings: &config::Config,
    name: &str,
) -> Result<T, ConfigError> {
    settings
        .clone()
        .try_deserialize()
        .map_err(|e| ConfigError::LoadError {
            message: format!("Failed to deserialize {} config: {}", name, e),
        })
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl StorageConfig {
    /// Build a DynamoDB client for the configured region from the default
    /// AWS credential chain
    pub async fn dynamodb_client(&self) -> DynamoDbClient {
        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(self.region.clone()))
            .load()
            .await;
        DynamoDbClient::new(&aws_config)
    }

    pub fn cart_retry_policy(&self) -> WriteRetryPolicy {
        WriteRetryPolicy {
            max_attempts: self.cart_write_attempts,
            base_delay: Duration::from_millis(self.cart_retry_base_delay_ms),
        }
    }
}

impl IdentityConfig {
    pub fn header_name(&self) -> Result<HeaderName, ConfigError> {
        HeaderName::from_bytes(self.identity_header.trim().to_ascii_lowercase().as_bytes())
            .map_err(|_| ConfigError::ValidationError {
                message: format!("Invalid identity header name: {:?}", self.identity_header),
            })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
                request_timeout_seconds: default_timeout(),
                max_request_size: default_max_request_size(),
            },
            storage: StorageConfig {
                backend: StorageBackend::default(),
                users_table_name: default_users_table(),
                carts_table_name: default_carts_table(),
                region: default_region(),
                catalog_path: None,
                cart_write_attempts: default_cart_write_attempts(),
                cart_retry_base_delay_ms: default_cart_retry_base_delay_ms(),
            },
            identity: IdentityConfig {
                identity_header: default_identity_header(),
            },
            observability: ObservabilityConfig {
                service_name: default_service_name(),
                service_version: default_service_version(),
                otlp_endpoint: None,
                log_level: default_log_level(),
                enable_json_logging: false,
            },
        }
    }
}

// Default value functions
pub(crate) fn default_host() -> String {
    "0.0.0.0".to_string()
}

pub(crate) fn default_port() -> u16 {
    8080
}

pub(crate) fn default_timeout() -> u64 {
    30
}

pub(crate) fn default_max_request_size() -> usize {
    1024 * 1024 // 1MB
}

pub(crate) fn default_users_table() -> String {
    "FoodcartUsers".to_string()
}

pub(crate) fn default_carts_table() -> String {
    "FoodcartCarts".to_string()
}

pub(crate) fn default_region() -> String {
    "us-west-2".to_string()
}

pub(crate) fn default_cart_write_attempts() -> u32 {
    8
}

pub(crate) fn default_cart_retry_base_delay_ms() -> u64 {
    10
}

pub(crate) fn default_identity_header() -> String {
    "x-user-email".to_string()
}

pub(crate) fn default_service_name() -> String {
    "foodcart-rs".to_string()
}

pub(crate) fn default_service_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

pub(crate) fn default_log_level() -> String {
    "info".to_string()
}
