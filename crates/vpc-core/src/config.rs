//! Configuration structures for VPC clients.
//!
//! Loading these values from files or the environment is left to the caller;
//! the structures are `Deserialize` and validate themselves on construction.

use crate::client::{
    DEFAULT_API_VERSION, DEFAULT_GENERATION, DEFAULT_MAX_RETRIES, VPC_DEFAULT_TIMEOUT,
};
use crate::Error;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;
use validator::{Validate, ValidationError};

/// Configuration for a VPC client instance.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct VpcClientConfig {
    /// Regional service URL (e.g. `https://us-south.iaas.example.com`)
    #[validate(url)]
    pub service_url: String,

    /// API version date, `YYYY-MM-DD`
    #[validate(custom(function = "validate_api_version"))]
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// API generation
    #[validate(range(min = 1, max = 2))]
    #[serde(default = "default_generation")]
    pub generation: u8,

    /// Request timeout in seconds
    #[validate(range(min = 1, max = 300))]
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Maximum number of transport retry attempts
    #[validate(range(min = 0, max = 10))]
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Default page size applied to list calls that do not set `limit`
    #[validate(range(min = 1, max = 100))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_limit: Option<u32>,
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

const fn default_generation() -> u8 {
    DEFAULT_GENERATION
}

const fn default_request_timeout_secs() -> u64 {
    VPC_DEFAULT_TIMEOUT
}

const fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn validate_api_version(value: &str) -> Result<(), ValidationError> {
    let bytes = value.as_bytes();
    let shaped = bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());

    if shaped {
        Ok(())
    } else {
        Err(ValidationError::new("api_version"))
    }
}

impl VpcClientConfig {
    /// Create a new client configuration for a regional service URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or validation fails.
    pub fn new(service_url: impl Into<String>) -> Result<Self, Error> {
        let config = Self {
            service_url: service_url.into(),
            ..Self::default()
        };

        config.ensure_valid()?;
        Ok(config)
    }

    /// Re-run field validation, e.g. after applying `with_*` setters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] describing the failing fields.
    pub fn ensure_valid(&self) -> Result<(), Error> {
        self.validate()
            .map_err(|e| Error::ConfigError(format!("Invalid configuration: {e}")))
    }

    /// Set the API version date.
    #[must_use]
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Set the API generation.
    #[must_use]
    pub const fn with_generation(mut self, generation: u8) -> Self {
        self.generation = generation;
        self
    }

    /// Set request timeout in seconds.
    #[must_use]
    pub const fn with_timeout(mut self, seconds: u64) -> Self {
        self.request_timeout_secs = seconds;
        self
    }

    /// Set maximum retry attempts.
    #[must_use]
    pub const fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the default page size for list calls.
    #[must_use]
    pub const fn with_page_limit(mut self, limit: u32) -> Self {
        self.page_limit = Some(limit);
        self
    }

    /// Get the request timeout as a Duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Parse the service URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed.
    pub fn parse_service_url(&self) -> Result<Url, Error> {
        Url::parse(&self.service_url)
            .map_err(|e| Error::ConfigError(format!("Invalid service URL: {e}")))
    }
}

impl Default for VpcClientConfig {
    fn default() -> Self {
        Self {
            service_url: "http://localhost:8080".to_string(),
            api_version: default_api_version(),
            generation: default_generation(),
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
            page_limit: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_new() {
        let config = VpcClientConfig::new("https://us-south.iaas.example.com").unwrap();
        assert_eq!(config.service_url, "https://us-south.iaas.example.com");
        assert_eq!(config.api_version, DEFAULT_API_VERSION);
        assert_eq!(config.generation, 2);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.max_retries, 3);
        assert!(config.page_limit.is_none());
    }

    #[test]
    fn test_config_invalid_url() {
        let result = VpcClientConfig::new("not-a-url");
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_config_builder() {
        let config = VpcClientConfig::new("https://eu-de.iaas.example.com")
            .unwrap()
            .with_api_version("2025-01-15")
            .with_generation(1)
            .with_timeout(60)
            .with_max_retries(5)
            .with_page_limit(50);

        assert_eq!(config.api_version, "2025-01-15");
        assert_eq!(config.generation, 1);
        assert_eq!(config.timeout(), Duration::from_secs(60));
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.page_limit, Some(50));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_parse_service_url() {
        let config = VpcClientConfig::new("https://vpc.example.com:8443").unwrap();
        let url = config.parse_service_url().unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("vpc.example.com"));
        assert_eq!(url.port(), Some(8443));
    }

    #[test]
    fn test_config_validation_api_version() {
        for (version, valid) in [
            ("2024/04/30", false),
            ("24-04-30", false),
            ("2024-04-30", true),
        ] {
            let config = VpcClientConfig {
                api_version: version.to_string(),
                ..VpcClientConfig::default()
            };
            assert_eq!(config.validate().is_ok(), valid, "api_version {version}");
        }
    }

    #[test]
    fn test_config_validation_ranges() {
        let base = VpcClientConfig::default();
        assert!(base.validate().is_ok());

        let generation = VpcClientConfig {
            generation: 3,
            ..base.clone()
        };
        assert!(generation.validate().is_err());

        let timeout = VpcClientConfig {
            request_timeout_secs: 0,
            ..base.clone()
        };
        assert!(timeout.validate().is_err());

        let retries = VpcClientConfig {
            max_retries: 11,
            ..base.clone()
        };
        assert!(retries.validate().is_err());

        let too_large = VpcClientConfig {
            page_limit: Some(101),
            ..base.clone()
        };
        assert!(too_large.validate().is_err());

        let max_page = VpcClientConfig {
            page_limit: Some(100),
            ..base
        };
        assert!(max_page.validate().is_ok());
    }

    #[test]
    fn test_config_deserialize_defaults() {
        let config: VpcClientConfig =
            serde_json::from_str(r#"{"service_url": "https://vpc.example.com"}"#).unwrap();
        assert_eq!(config.api_version, DEFAULT_API_VERSION);
        assert_eq!(config.generation, DEFAULT_GENERATION);
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
        assert!(config.validate().is_ok());

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("page_limit"));
    }
}
