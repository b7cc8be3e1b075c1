//! Configuration for the cache-backed lookup service

use crate::error::{LookupFailure, Result};
use serde::{Deserialize, Serialize};

/// Environment variable naming the cache client to use
pub const ENV_CACHE_SERVICE: &str = "MAPCACHE_LOOKUP_CACHE_SERVICE";
/// Environment variable naming the record reader to use
pub const ENV_RECORD_READER: &str = "MAPCACHE_LOOKUP_RECORD_READER";
/// Environment variable naming the coordinate that carries the cache key
pub const ENV_KEY_FIELD: &str = "MAPCACHE_LOOKUP_KEY_FIELD";

/// Configuration for a [`CacheRecordLookupService`](crate::CacheRecordLookupService)
///
/// Both collaborators are referenced by name and resolved once, when the
/// service is enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupConfig {
    /// Name of the registered cache client
    pub cache_service: String,

    /// Name of the registered record reader
    pub record_reader: String,

    /// Coordinate whose value is the cache key
    pub key_field: String,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            cache_service: "distributed-map-cache".to_string(),
            record_reader: "json-reader".to_string(),
            key_field: crate::lookup::DEFAULT_KEY_FIELD.to_string(),
        }
    }
}

impl LookupConfig {
    /// Create a new builder for lookup configuration
    pub fn builder() -> LookupConfigBuilder {
        LookupConfigBuilder::default()
    }

    /// Load configuration from the environment, reading `.env` first if present
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_vars(|var| std::env::var(var).ok())
    }

    /// Build configuration from `MAPCACHE_LOOKUP_*` variables resolved by `lookup`
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();
        if let Some(name) = lookup(ENV_CACHE_SERVICE) {
            builder = builder.cache_service(name);
        }
        if let Some(name) = lookup(ENV_RECORD_READER) {
            builder = builder.record_reader(name);
        }
        if let Some(field) = lookup(ENV_KEY_FIELD) {
            builder = builder.key_field(field);
        }

        let config = builder.build();
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        for (property, value) in [
            ("cache_service", &self.cache_service),
            ("record_reader", &self.record_reader),
            ("key_field", &self.key_field),
        ] {
            if value.trim().is_empty() {
                return Err(LookupFailure::ConfigError(format!(
                    "{} must not be empty",
                    property
                )));
            }
        }
        Ok(())
    }
}

/// Builder for lookup configuration
#[derive(Debug, Default)]
pub struct LookupConfigBuilder {
    cache_service: Option<String>,
    record_reader: Option<String>,
    key_field: Option<String>,
}

impl LookupConfigBuilder {
    pub fn cache_service(mut self, name: impl Into<String>) -> Self {
        self.cache_service = Some(name.into());
        self
    }

    pub fn record_reader(mut self, name: impl Into<String>) -> Self {
        self.record_reader = Some(name.into());
        self
    }

    pub fn key_field(mut self, field: impl Into<String>) -> Self {
        self.key_field = Some(field.into());
        self
    }

    /// Build the lookup configuration
    pub fn build(self) -> LookupConfig {
        let defaults = LookupConfig::default();

        LookupConfig {
            cache_service: self.cache_service.unwrap_or(defaults.cache_service),
            record_reader: self.record_reader.unwrap_or(defaults.record_reader),
            key_field: self.key_field.unwrap_or(defaults.key_field),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = LookupConfig::default();
        assert_eq!(config.key_field, "key");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = LookupConfig::builder()
            .cache_service("client")
            .record_reader("reader")
            .build();

        assert_eq!(config.cache_service, "client");
        assert_eq!(config.record_reader, "reader");
        assert_eq!(config.key_field, "key");
    }

    #[test]
    fn test_config_validation() {
        let config = LookupConfig::builder().key_field("").build();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("key_field"));

        let config = LookupConfig::builder().record_reader(" ").build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_vars() {
        let vars = HashMap::from([
            (ENV_CACHE_SERVICE, "env-client"),
            (ENV_KEY_FIELD, "id"),
        ]);

        let config = LookupConfig::from_vars(|var| vars.get(var).map(|v| v.to_string())).unwrap();
        assert_eq!(config.cache_service, "env-client");
        assert_eq!(config.key_field, "id");
        assert_eq!(config.record_reader, "json-reader");

        let blank = LookupConfig::from_vars(|var| (var == ENV_RECORD_READER).then(String::new));
        assert!(matches!(blank, Err(LookupFailure::ConfigError(_))));
    }
}
