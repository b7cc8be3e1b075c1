//! Byte-level transport to the remote cache
//!
//! The client serializes keys and values and hands plain bytes to a
//! [`CacheTransport`]. Everything behind this trait (sockets, framing, the
//! server itself) is a transport detail. Conditional operations must be atomic
//! per key on the server side; the client adds no locking of its own.

pub mod memory;

use crate::error::Result;
use async_trait::async_trait;
use regex::Regex;

pub use memory::{MemoryServer, MemoryTransport};

/// Server-side version of an entry, bumped on every successful write
pub type Revision = u64;

/// Key pattern matched against the textual (UTF-8) form of stored keys
///
/// The whole key must match, so `a.*` selects `a1` but not `ba1`.
#[derive(Debug, Clone)]
pub struct KeyPattern {
    source: String,
    regex: Regex,
}

impl KeyPattern {
    /// Compile a pattern; invalid expressions fail before any remote call
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(&format!("^(?:{})$", pattern))?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// The pattern as supplied by the caller
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Check a stored key against the pattern
    pub fn matches(&self, key: &[u8]) -> bool {
        self.regex.is_match(&String::from_utf8_lossy(key))
    }
}

/// A value together with the revision it was read at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedValue {
    pub revision: Revision,
    pub value: Vec<u8>,
}

/// Byte-oriented connection to a remote key/value cache
#[async_trait]
pub trait CacheTransport: Send + Sync {
    /// Establish the connection
    async fn connect(&self) -> Result<()>;

    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Fetch many keys in one round-trip, results aligned with `keys`
    async fn get_all(&self, keys: &[Vec<u8>]) -> Result<Vec<Option<Vec<u8>>>>;

    async fn put(&self, key: Vec<u8>, value: Vec<u8>) -> Result<()>;

    /// Store only if absent; true when the write happened
    async fn put_if_absent(&self, key: Vec<u8>, value: Vec<u8>) -> Result<bool>;

    /// Store if absent and return `None`, otherwise return the existing value
    async fn get_and_put_if_absent(&self, key: Vec<u8>, value: Vec<u8>) -> Result<Option<Vec<u8>>>;

    async fn contains_key(&self, key: &[u8]) -> Result<bool>;

    async fn remove(&self, key: &[u8]) -> Result<bool>;

    async fn remove_and_get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Delete every key matching the pattern, returning how many were removed
    async fn remove_by_pattern(&self, pattern: &KeyPattern) -> Result<u64>;

    async fn keys(&self) -> Result<Vec<Vec<u8>>>;

    async fn fetch(&self, key: &[u8]) -> Result<Option<VersionedValue>>;

    /// Write `value` only if the stored revision equals `expected`
    ///
    /// `expected == None` means the key must be absent.
    async fn replace(&self, key: Vec<u8>, value: Vec<u8>, expected: Option<Revision>) -> Result<bool>;

    /// Release the connection
    async fn close(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_pattern_is_anchored() {
        let pattern = KeyPattern::new("a.*").unwrap();
        assert!(pattern.matches(b"a1"));
        assert!(pattern.matches(b"a"));
        assert!(!pattern.matches(b"ba1"));
        assert!(!pattern.matches(b"b1"));
        assert_eq!(pattern.as_str(), "a.*");
    }

    #[test]
    fn test_key_pattern_alternation_stays_anchored() {
        let pattern = KeyPattern::new("x|y").unwrap();
        assert!(pattern.matches(b"x"));
        assert!(!pattern.matches(b"xy"));
    }

    #[test]
    fn test_invalid_key_pattern() {
        let err = KeyPattern::new("a(").unwrap_err();
        assert!(matches!(err, crate::error::CacheError::InvalidPattern(_)));
    }
}
