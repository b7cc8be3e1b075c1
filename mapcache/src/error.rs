//! Error types for cache client operations
//!
//! Errors fall into two classes that callers must be able to tell apart:
//! transport failures (the cache could not be reached or did not answer in
//! time) and data failures (bytes did not match what a serializer or
//! deserializer expected). A missing key is never an error; it is reported as
//! `None` by the operation itself.

use thiserror::Error;

/// Main error type for cache client operations
#[derive(Error, Debug)]
pub enum CacheError {
    /// Connection error - the remote cache is unreachable or the connection broke
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Operation timeout
    #[error("Operation timed out after {timeout_ms}ms: {context}")]
    TimeoutError { timeout_ms: u64, context: String },

    /// The client has been closed and no longer holds a connection
    #[error("Cache client '{0}' is closed")]
    Closed(String),

    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A value could not be turned into bytes
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Stored bytes do not conform to what the deserializer expects
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// A key pattern is not a valid regular expression
    #[error("Invalid key pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type alias for cache client operations
pub type Result<T> = std::result::Result<T, CacheError>;

impl CacheError {
    /// True for failures to reach or talk to the cache
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            CacheError::ConnectionError(_)
                | CacheError::TimeoutError { .. }
                | CacheError::Closed(_)
                | CacheError::Io(_)
        )
    }

    /// True when bytes and the serialization scheme disagree
    pub fn is_data(&self) -> bool {
        matches!(
            self,
            CacheError::SerializationError(_) | CacheError::DeserializationError(_)
        )
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() {
            CacheError::Io(e.into())
        } else {
            CacheError::DeserializationError(e.to_string())
        }
    }
}
