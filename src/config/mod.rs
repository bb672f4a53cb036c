//! Configuration module for Omics Uploadr
//!
//! Handles loading and parsing of YAML configuration files with support for
//! environment variable expansion and validation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

/// Default chunk size: 100 MiB
pub const DEFAULT_CHUNK_SIZE: u64 = 100 * 1024 * 1024;

// ============================================================================
// Validation Helpers
// ============================================================================

/// Validate that a URL starts with http:// or https://
fn is_valid_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Config {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        ConfigLoader::load(path)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_valid_http_url(&self.api.base_url) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid base_url '{}': must start with http:// or https://",
                self.api.base_url
            )));
        }

        if self.api.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "timeout_seconds must be greater than zero".into(),
            ));
        }

        if self.upload.chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "chunk_size must be greater than zero".into(),
            ));
        }

        if self.upload.max_stalled_chunks == 0 {
            return Err(ConfigError::ValidationError(
                "max_stalled_chunks must be greater than zero".into(),
            ));
        }

        if self.upload.chunk_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "chunk_url cannot be empty".into(),
            ));
        }

        if self.upload.complete_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "complete_url cannot be empty".into(),
            ));
        }

        Ok(())
    }
}

/// Platform API connection settings
///
/// The CSRF and auth tokens are process-wide values; they are handed to
/// [`crate::api::ApiClient::new`] once and attached to every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    /// Sent as `X-CSRFToken`. Empty means no header.
    #[serde(default)]
    pub csrf_token: Option<String>,
    /// Sent as `Authorization: Token <value>`. Empty means no header.
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Extra headers attached to every request
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_timeout_seconds() -> u64 {
    300
}

/// Chunked upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_chunk_url")]
    pub chunk_url: String,
    #[serde(default = "default_complete_url")]
    pub complete_url: String,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,
    /// Consecutive responses reporting an unchanged offset before giving up
    #[serde(default = "default_max_stalled_chunks")]
    pub max_stalled_chunks: u32,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            chunk_url: default_chunk_url(),
            complete_url: default_complete_url(),
            chunk_size: default_chunk_size(),
            max_stalled_chunks: default_max_stalled_chunks(),
        }
    }
}

fn default_chunk_url() -> String {
    "/chunked-upload/".to_string()
}

fn default_complete_url() -> String {
    "/chunked-upload-complete/".to_string()
}

fn default_chunk_size() -> u64 {
    DEFAULT_CHUNK_SIZE
}

fn default_max_stalled_chunks() -> u32 {
    8
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
        }
    }
}

fn default_metrics_enabled() -> bool {
    true
}
