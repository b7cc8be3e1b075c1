//! Configuration for the cache client

use crate::error::{CacheError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable holding the client name
pub const ENV_NAME: &str = "MAPCACHE_CLIENT_NAME";
/// Environment variable holding the communications timeout in milliseconds
pub const ENV_COMMUNICATIONS_TIMEOUT_MS: &str = "MAPCACHE_COMMUNICATIONS_TIMEOUT_MS";
/// Environment variable holding the connect timeout in milliseconds
pub const ENV_CONNECT_TIMEOUT_MS: &str = "MAPCACHE_CONNECT_TIMEOUT_MS";

/// Configuration for a [`MapCacheClient`](crate::MapCacheClient)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Name the client is registered and logged under
    pub name: String,

    /// Upper bound on a single round-trip to the cache
    /// Expiry is reported as a timeout error, never as a missing key
    pub communications_timeout: Duration,

    /// Upper bound on establishing the connection at enable time
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            name: "distributed-map-cache".to_string(),
            communications_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl ClientConfig {
    /// Create a new builder for client configuration
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Load configuration from the environment, reading `.env` first if present
    ///
    /// Unset variables fall back to the defaults.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_vars(|var| std::env::var(var).ok())
    }

    /// Build configuration from `MAPCACHE_*` variables resolved by `lookup`
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();
        if let Some(name) = lookup(ENV_NAME) {
            builder = builder.name(name);
        }
        let communications_timeout = lookup(ENV_COMMUNICATIONS_TIMEOUT_MS);
        if let Some(timeout) = parse_millis(ENV_COMMUNICATIONS_TIMEOUT_MS, communications_timeout)? {
            builder = builder.communications_timeout(timeout);
        }
        let connect_timeout = lookup(ENV_CONNECT_TIMEOUT_MS);
        if let Some(timeout) = parse_millis(ENV_CONNECT_TIMEOUT_MS, connect_timeout)? {
            builder = builder.connect_timeout(timeout);
        }

        let config = builder.build();
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(CacheError::ConfigError("name must not be empty".to_string()));
        }

        if self.communications_timeout.is_zero() {
            return Err(CacheError::ConfigError(
                "communications_timeout must be greater than 0".to_string(),
            ));
        }

        if self.connect_timeout.is_zero() {
            return Err(CacheError::ConfigError(
                "connect_timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_millis(var: &str, raw: Option<String>) -> Result<Option<Duration>> {
    match raw {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(|ms| Some(Duration::from_millis(ms)))
            .map_err(|e| CacheError::ConfigError(format!("{} must be milliseconds: {}", var, e))),
        None => Ok(None),
    }
}

/// Builder for client configuration
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    name: Option<String>,
    communications_timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
}

impl ClientConfigBuilder {
    /// Set the client name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the per-operation timeout
    pub fn communications_timeout(mut self, timeout: Duration) -> Self {
        self.communications_timeout = Some(timeout);
        self
    }

    /// Set the connection establishment timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Build the client configuration
    pub fn build(self) -> ClientConfig {
        let defaults = ClientConfig::default();

        ClientConfig {
            name: self.name.unwrap_or(defaults.name),
            communications_timeout: self
                .communications_timeout
                .unwrap_or(defaults.communications_timeout),
            connect_timeout: self.connect_timeout.unwrap_or(defaults.connect_timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.communications_timeout, Duration::from_secs(30));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut invalid_config = ClientConfig::default();
        invalid_config.name = "  ".to_string();
        assert!(invalid_config.validate().is_err());

        let mut invalid_config = ClientConfig::default();
        invalid_config.communications_timeout = Duration::ZERO;
        assert!(invalid_config.validate().is_err());

        let mut invalid_config = ClientConfig::default();
        invalid_config.connect_timeout = Duration::ZERO;
        assert!(invalid_config.validate().is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = ClientConfig::builder()
            .name("enrichment-cache")
            .communications_timeout(Duration::from_millis(500))
            .build();

        assert_eq!(config.name, "enrichment-cache");
        assert_eq!(config.communications_timeout, Duration::from_millis(500));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
    }

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: std::collections::HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_config_from_vars() {
        let config = ClientConfig::from_vars(vars(&[
            (ENV_NAME, "env-cache"),
            (ENV_COMMUNICATIONS_TIMEOUT_MS, "1500"),
        ]))
        .unwrap();
        assert_eq!(config.name, "env-cache");
        assert_eq!(config.communications_timeout, Duration::from_millis(1500));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));

        let err = ClientConfig::from_vars(vars(&[(ENV_COMMUNICATIONS_TIMEOUT_MS, "soon")]))
            .unwrap_err();
        assert!(matches!(err, CacheError::ConfigError(ref msg) if msg.contains(ENV_COMMUNICATIONS_TIMEOUT_MS)));

        assert!(ClientConfig::from_vars(vars(&[(ENV_CONNECT_TIMEOUT_MS, "0")])).is_err());
    }

    #[test]
    fn test_config_from_vars_defaults() {
        let config = ClientConfig::from_vars(|_| None).unwrap();
        assert_eq!(config, ClientConfig::default());
    }
}
