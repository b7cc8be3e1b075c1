//! Error types for record lookups
//!
//! A lookup that finds nothing is `Ok(None)`. Everything here means the lookup
//! could not be performed, and the caller should take its failure path.

use mapcache::CacheError;
use thiserror::Error;

/// Failure to turn bytes into a record
#[derive(Error, Debug)]
pub enum ParseError {
    /// Payload is not syntactically valid
    #[error("Malformed payload: {0}")]
    Malformed(String),

    /// Payload parsed but holds no record
    #[error("Payload contains no record")]
    NoRecord,

    /// Payload parsed but is not a record (object)
    #[error("Expected a record, found {0}")]
    NotARecord(String),

    /// A value does not fit the declared schema
    #[error("Field '{field}' does not match schema: {reason}")]
    SchemaMismatch { field: String, reason: String },
}

impl From<serde_json::Error> for ParseError {
    fn from(e: serde_json::Error) -> Self {
        ParseError::Malformed(e.to_string())
    }
}

/// Main error type for lookup operations
#[derive(Error, Debug)]
pub enum LookupFailure {
    /// Coordinates are missing the key field, or it is empty
    #[error("Invalid lookup coordinates: {0}")]
    InvalidInput(String),

    /// The cache could not be queried
    #[error("Cache lookup failed: {0}")]
    Cache(#[from] CacheError),

    /// Bytes were found but could not be read as a record
    #[error("Failed to read record for key '{key}': {source}")]
    Parse {
        key: String,
        #[source]
        source: ParseError,
    },

    /// A named collaborator is not registered
    #[error("No {kind} registered under '{name}'")]
    ServiceNotFound { kind: &'static str, name: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type alias for lookup operations
pub type Result<T> = std::result::Result<T, LookupFailure>;

impl LookupFailure {
    /// True when the failure came from the cache transport
    pub fn is_transport(&self) -> bool {
        matches!(self, LookupFailure::Cache(e) if e.is_transport())
    }
}
