//! Storage connection settings
//!
//! Describes how to reach Cloud Storage: endpoint, HMAC credentials and
//! client tuning. Values come from the `[storage]` table of the config file
//! and may be overridden from the environment.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default Cloud Storage XML API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://storage.googleapis.com";

/// Environment variable overriding the endpoint
pub const ENV_ENDPOINT: &str = "GSCP_ENDPOINT";

/// Environment variable holding the HMAC access key
pub const ENV_ACCESS_KEY: &str = "GSCP_ACCESS_KEY";

/// Environment variable holding the HMAC secret
pub const ENV_SECRET_KEY: &str = "GSCP_SECRET_KEY";

/// Retry configuration handed to the storage client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per request, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_max_attempts() -> u32 {
    3
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
        }
    }
}

/// Network timeout configuration handed to the storage client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Connection timeout in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_ms: u64,
}

fn default_connect_timeout() -> u64 {
    30_000
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_ms: default_connect_timeout(),
        }
    }
}

/// How to reach Cloud Storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// XML API endpoint URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Signing region
    #[serde(default = "default_region")]
    pub region: String,

    /// HMAC access key; when absent the SDK's default credential chain is used
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key: Option<String>,

    /// HMAC secret
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,

    /// Upload part size in bytes
    #[serde(default = "default_part_size")]
    pub part_size: u64,

    /// Retry configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryConfig>,

    /// Timeout configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<TimeoutConfig>,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_region() -> String {
    "auto".to_string()
}

fn default_part_size() -> u64 {
    16 * 1024 * 1024
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            region: default_region(),
            access_key: None,
            secret_key: None,
            part_size: default_part_size(),
            retry: None,
            timeout: None,
        }
    }
}

impl StorageConfig {
    /// Apply `GSCP_*` overrides using `lookup` to read variables
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(endpoint) = lookup(ENV_ENDPOINT) {
            self.endpoint = endpoint;
        }
        if let Some(access_key) = lookup(ENV_ACCESS_KEY) {
            self.access_key = Some(access_key);
        }
        if let Some(secret_key) = lookup(ENV_SECRET_KEY) {
            self.secret_key = Some(secret_key);
        }
        self
    }

    /// Static credentials, if both halves are configured
    pub fn credentials(&self) -> Result<Option<(&str, &str)>> {
        match (&self.access_key, &self.secret_key) {
            (Some(access), Some(secret)) => Ok(Some((access.as_str(), secret.as_str()))),
            (None, None) => Ok(None),
            _ => Err(Error::Config(
                "Both access_key and secret_key must be set".into(),
            )),
        }
    }

    /// Check the endpoint is an http(s) URL
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.endpoint)?;
        if url.scheme() != "https" && url.scheme() != "http" {
            return Err(Error::Config(format!(
                "Endpoint must be http or https: {}",
                self.endpoint
            )));
        }
        self.credentials()?;
        Ok(())
    }

    /// Get the effective retry configuration
    pub fn retry_config(&self) -> RetryConfig {
        self.retry.clone().unwrap_or_default()
    }

    /// Get the effective timeout configuration
    pub fn timeout_config(&self) -> TimeoutConfig {
        self.timeout.clone().unwrap_or_default()
    }
}
