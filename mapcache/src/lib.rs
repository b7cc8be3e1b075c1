//! # mapcache
//!
//! Client for a distributed key/value map cache with pluggable serialization.
//!
//! ## Features
//!
//! - Per-call serializers and deserializers for keys and values
//! - Atomic conditional writes (`put_if_absent`, `get_and_put_if_absent`)
//! - Revision-checked compare-and-replace (`fetch` / `replace`)
//! - Single-key and pattern-based deletion
//! - Bounded round-trips: every remote call is subject to a timeout
//! - Missing keys are `None`, never errors; transport and data failures are
//!   separate error classes
//!
//! ## Example
//!
//! ```rust
//! use mapcache::{ClientConfig, MapCacheClient, MemoryServer, StringDeserializer, StringSerializer};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let server = MemoryServer::new();
//! let client = MapCacheClient::enable(ClientConfig::default(), Arc::new(server.transport())).await?;
//!
//! // First writer wins
//! assert!(client.put_if_absent("session:42", "alice", &StringSerializer, &StringSerializer).await?);
//! assert!(!client.put_if_absent("session:42", "bob", &StringSerializer, &StringSerializer).await?);
//!
//! let owner: Option<String> = client.get("session:42", &StringSerializer, &StringDeserializer).await?;
//! assert_eq!(owner.as_deref(), Some("alice"));
//!
//! // Pattern deletion works on the textual form of the keys
//! assert_eq!(client.remove_by_pattern("session:.*").await?, 1);
//!
//! client.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod stats;
pub mod transport;

// Re-export main types for convenience
pub use client::{AtomicCacheEntry, MapCacheClient};
pub use codec::{
    BytesDeserializer, BytesSerializer, Deserializer, JsonDeserializer, JsonSerializer,
    Serializer, StringDeserializer, StringSerializer,
};
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{CacheError, Result};
pub use stats::CacheStats;
pub use transport::{CacheTransport, KeyPattern, MemoryServer, MemoryTransport, Revision, VersionedValue};
