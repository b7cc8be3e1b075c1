//! # mapcache-lookup
//!
//! Record lookups backed by a distributed map cache.
//!
//! A [`CacheRecordLookupService`] takes caller coordinates, reads the cache
//! key from one of them, fetches the raw bytes stored under that key and hands
//! them to a [`RecordReader`] that produces exactly one [`Record`].
//!
//! ## Outcomes
//!
//! - Key present and payload parseable: `Ok(Some(record))`
//! - Key absent: `Ok(None)`
//! - Missing key coordinate, cache failure or unparseable payload: `Err(LookupFailure)`
//!
//! ## Example
//!
//! ```rust
//! use mapcache::{ClientConfig, MapCacheClient, MemoryServer};
//! use mapcache_lookup::{
//!     CacheRecordLookupService, Coordinates, JsonRecordReader, LookupConfig, LookupService,
//!     ServiceRegistry,
//! };
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let server = MemoryServer::new();
//! server.insert("user:7", r#"{"name":"Ada","active":true}"#);
//!
//! let client = MapCacheClient::enable(ClientConfig::default(), Arc::new(server.transport())).await?;
//!
//! let mut registry = ServiceRegistry::new();
//! registry
//!     .register_client(Arc::new(client))
//!     .register_reader("json-reader", Arc::new(JsonRecordReader::infer()));
//!
//! let service = CacheRecordLookupService::enable(&LookupConfig::default(), &registry)?;
//!
//! let coordinates = Coordinates::from([("key".to_string(), "user:7".to_string())]);
//! let record = service.lookup(&coordinates).await?.expect("user is cached");
//! assert_eq!(record.get_as_string("name").as_deref(), Some("Ada"));
//! assert_eq!(record.get_as_bool("active"), Some(true));
//!
//! let coordinates = Coordinates::from([("key".to_string(), "user:8".to_string())]);
//! assert!(service.lookup(&coordinates).await?.is_none());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod lookup;
pub mod reader;
pub mod record;
pub mod registry;

// Re-export main types for convenience
pub use config::{LookupConfig, LookupConfigBuilder};
pub use error::{LookupFailure, ParseError, Result};
pub use lookup::{CacheRecordLookupService, Coordinates, LookupService, DEFAULT_KEY_FIELD};
pub use reader::{JsonRecordReader, RecordReader, SchemaAccess};
pub use record::{FieldType, FieldValue, Record, RecordField, RecordSchema};
pub use registry::ServiceRegistry;
