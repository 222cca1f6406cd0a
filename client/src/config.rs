//! Environment-based configuration for upstream clients.
//!
//! # Example
//!
//! ```no_run
//! use pay_selfservice_client::ClientConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Reads ADMINUSERS_URL, CONNECTOR_URL, LEDGER_URL, PRODUCTS_URL,
//! // HTTP_TIMEOUT_MS and LOG_LEVEL
//! let config = ClientConfig::from_env()?;
//! println!("connector at {}", config.connector_url);
//! # Ok(())
//! # }
//! ```

use crate::services::UpstreamService;
use reqwest::Url;
use std::time::Duration;
use thiserror::Error;

/// Default transport timeout in milliseconds.
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 60_000;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Configuration error
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Environment variable not set
    #[error("Environment variable not set: {0}")]
    EnvVarNotSet(String),

    /// Variable holds something that is not a URL
    #[error("Invalid URL in {var}: {reason}")]
    InvalidUrl {
        /// Variable name
        var: String,
        /// Parse failure
        reason: String,
    },

    /// Failed to parse a value
    #[error("Failed to parse {var}: {reason}")]
    ParseError {
        /// Variable name
        var: String,
        /// Parse failure
        reason: String,
    },

    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Where the upstream services live and how to reach them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Admin/user-management API
    pub adminusers_url: Url,
    /// Payment connector API
    pub connector_url: Url,
    /// Ledger (read) API
    pub ledger_url: Url,
    /// Products (payment links) API
    pub products_url: Url,
    /// Transport timeout in milliseconds
    pub http_timeout_ms: u64,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl ClientConfig {
    /// Load from the process environment and validate.
    ///
    /// # Errors
    ///
    /// Returns error if a required variable is missing or a value is invalid
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load through an arbitrary variable lookup and validate.
    ///
    /// # Errors
    ///
    /// Returns error if a required variable is missing or a value is invalid
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = |var: &str| -> Result<Url, ConfigError> {
            let raw = lookup(var).ok_or_else(|| ConfigError::EnvVarNotSet(var.to_string()))?;
            Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl {
                var: var.to_string(),
                reason: e.to_string(),
            })
        };

        let http_timeout_ms = match lookup("HTTP_TIMEOUT_MS") {
            Some(raw) => raw.trim().parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::ParseError {
                    var: "HTTP_TIMEOUT_MS".to_string(),
                    reason: e.to_string(),
                }
            })?,
            None => DEFAULT_HTTP_TIMEOUT_MS,
        };

        let config = Self {
            adminusers_url: url("ADMINUSERS_URL")?,
            connector_url: url("CONNECTOR_URL")?,
            ledger_url: url("LEDGER_URL")?,
            products_url: url("PRODUCTS_URL")?,
            http_timeout_ms,
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns error if the timeout is zero or the log level is unknown
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "HTTP_TIMEOUT_MS must be > 0".to_string(),
            ));
        }
        if !VALID_LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "invalid log_level: {}. Must be one of: {}",
                self.log_level,
                VALID_LOG_LEVELS.join(", ")
            )));
        }
        Ok(())
    }

    /// Transport timeout as a `Duration`
    #[must_use]
    pub const fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    /// Base URL of `service`
    #[must_use]
    pub const fn base_url(&self, service: UpstreamService) -> &Url {
        match service {
            UpstreamService::AdminUsers => &self.adminusers_url,
            UpstreamService::Connector => &self.connector_url,
            UpstreamService::Ledger => &self.ledger_url,
            UpstreamService::Products => &self.products_url,
        }
    }
}
