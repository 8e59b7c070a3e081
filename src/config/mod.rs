use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::repositories::DEFAULT_CART_KEY;

/// Prefix of every environment variable the service reads, e.g. `LAUNDRY_PORT`
pub const ENV_PREFIX: &str = "LAUNDRY";

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
    pub catalog: CatalogConfig,
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
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,
    #[serde(default = "default_cart_key")]
    pub cart_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_base_url")]
    pub catalog_base_url: String,
    #[serde(default = "default_catalog_timeout")]
    pub catalog_timeout_seconds: u64,
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
    /// Load every section from `LAUNDRY_*` variables and validate the result
    pub fn from_environment() -> Result<Self, ConfigError> {
        Self::from_source(|| config::Environment::with_prefix(ENV_PREFIX))
    }

    /// Load from an arbitrary environment source; tests pass a fixed map
    pub fn from_source<F>(environment: F) -> Result<Self, ConfigError>
    where
        F: Fn() -> config::Environment,
    {
        info!("Loading configuration from environment");

        let config = Config {
            server: load_section(environment(), "server")?,
            storage: load_section(environment(), "storage")?,
            catalog: load_section(environment(), "catalog")?,
            observability: load_section(environment(), "observability")?,
        };

        config.validate()?;

        info!("Configuration loaded successfully");
        debug!("Configuration: {:?}", config);

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(validation_error("Server port cannot be 0"));
        }

        if self.server.request_timeout_seconds == 0 {
            return Err(validation_error("Request timeout cannot be 0"));
        }

        if self.storage.cart_key.trim().is_empty() {
            return Err(validation_error("Cart key cannot be empty"));
        }

        if self.catalog.catalog_base_url.trim().is_empty() {
            return Err(validation_error("Catalog base URL cannot be empty"));
        }

        if self.catalog.catalog_timeout_seconds == 0 {
            return Err(validation_error("Catalog timeout cannot be 0"));
        }

        Ok(())
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        load_section(config::Environment::with_prefix(ENV_PREFIX), "server")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl StorageConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        load_section(config::Environment::with_prefix(ENV_PREFIX), "storage")
    }
}

impl CatalogConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        load_section(config::Environment::with_prefix(ENV_PREFIX), "catalog")
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.catalog_timeout_seconds)
    }
}

impl ObservabilityConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        load_section(config::Environment::with_prefix(ENV_PREFIX), "observability")
    }
}

fn load_section<T: DeserializeOwned>(
    environment: config::Environment,
    section: &str,
) -> Result<T, ConfigError> {
    let settings = config::Config::builder()
        .add_source(environment)
        .build()
        .map_err(|e| ConfigError::LoadError {
            message: format!("Failed to load {} config: {}", section, e),
        })?;

    settings
        .try_deserialize()
        .map_err(|e| ConfigError::LoadError {
            message: format!("Failed to deserialize {} config: {}", section, e),
        })
}

fn validation_error(message: &str) -> ConfigError {
    ConfigError::ValidationError {
        message: message.to_string(),
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

pub(crate) fn default_storage_dir() -> PathBuf {
    PathBuf::from("./data")
}

pub(crate) fn default_cart_key() -> String {
    DEFAULT_CART_KEY.to_string()
}

pub(crate) fn default_catalog_base_url() -> String {
    "http://localhost:5000".to_string()
}

pub(crate) fn default_catalog_timeout() -> u64 {
    10
}

pub(crate) fn default_service_name() -> String {
    "laundry-cart".to_string()
}

pub(crate) fn default_service_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

pub(crate) fn default_log_level() -> String {
    "info".to_string()
}
