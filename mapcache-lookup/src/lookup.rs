//! Lookup services and the cache-backed record lookup
//!
//! A lookup walks these steps:
//!
//! 1. pull the key out of the coordinates (missing or empty fails, no cache access)
//! 2. fetch the raw bytes stored under that key
//! 3. absent: return `None` without touching the record reader
//! 4. present: parse exactly one record, failing on malformed payloads
//!
//! The service never writes to the cache and keeps no state of its own
//! besides its collaborators, so it is safe to call from many tasks at once.

use crate::config::LookupConfig;
use crate::error::{LookupFailure, Result};
use crate::reader::RecordReader;
use crate::record::{Record, RecordSchema};
use crate::registry::ServiceRegistry;
use async_trait::async_trait;
use mapcache::{BytesDeserializer, MapCacheClient, StringSerializer};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info};

/// Caller-supplied lookup coordinates: field name to value
pub type Coordinates = HashMap<String, String>;

/// Coordinate carrying the cache key unless configured otherwise
pub const DEFAULT_KEY_FIELD: &str = "key";

/// A source of records addressed by coordinates
#[async_trait]
pub trait LookupService: Send + Sync {
    /// Look up the record for `coordinates`
    ///
    /// `Ok(None)` means nothing is stored for these coordinates. `Err` means
    /// the lookup could not be performed.
    async fn lookup(&self, coordinates: &Coordinates) -> Result<Option<Record>>;

    /// Coordinate names this service needs
    fn required_keys(&self) -> BTreeSet<String>;
}

/// Record lookup backed by a [`MapCacheClient`]
///
/// # Example
/// ```
/// use mapcache::{ClientConfig, MapCacheClient, MemoryServer};
/// use mapcache_lookup::{CacheRecordLookupService, Coordinates, JsonRecordReader, LookupService};
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() -> anyhow::Result<()> {
/// let server = MemoryServer::new();
/// server.insert("myKey", r#"{"myKey1":"myValue1"}"#);
///
/// let client = MapCacheClient::enable(ClientConfig::default(), Arc::new(server.transport())).await?;
/// let service = CacheRecordLookupService::new(Arc::new(client), Arc::new(JsonRecordReader::infer()));
///
/// let coordinates = Coordinates::from([("key".to_string(), "myKey".to_string())]);
/// let record = service.lookup(&coordinates).await?.expect("record is cached");
/// assert_eq!(record.get_as_string("myKey1").as_deref(), Some("myValue1"));
/// # Ok(())
/// # }
/// ```
pub struct CacheRecordLookupService {
    client: Arc<MapCacheClient>,
    reader: Arc<dyn RecordReader>,
    key_field: String,
    schema_hint: Option<RecordSchema>,
}

impl CacheRecordLookupService {
    /// Create a service reading the key from the `"key"` coordinate
    pub fn new(client: Arc<MapCacheClient>, reader: Arc<dyn RecordReader>) -> Self {
        Self {
            client,
            reader,
            key_field: DEFAULT_KEY_FIELD.to_string(),
            schema_hint: None,
        }
    }

    /// Resolve the configured collaborators by name and build the service
    pub fn enable(config: &LookupConfig, registry: &ServiceRegistry) -> Result<Self> {
        config.validate()?;

        let client = registry.client(&config.cache_service)?;
        let reader = registry.reader(&config.record_reader)?;

        info!(
            "Enabled cache record lookup (cache: '{}', reader: '{}', key field: '{}')",
            config.cache_service, config.record_reader, config.key_field
        );

        Ok(Self::new(client, reader).with_key_field(config.key_field.clone()))
    }

    pub fn with_key_field(mut self, key_field: impl Into<String>) -> Self {
        self.key_field = key_field.into();
        self
    }

    /// Schema handed to the reader on every lookup, overriding its own strategy
    pub fn with_schema_hint(mut self, schema: RecordSchema) -> Self {
        self.schema_hint = Some(schema);
        self
    }

    pub fn key_field(&self) -> &str {
        &self.key_field
    }

    fn extract_key<'a>(&self, coordinates: &'a Coordinates) -> Result<&'a str> {
        match coordinates.get(&self.key_field) {
            None => Err(LookupFailure::InvalidInput(format!(
                "required coordinate '{}' is missing",
                self.key_field
            ))),
            Some(key) if key.is_empty() => Err(LookupFailure::InvalidInput(format!(
                "required coordinate '{}' is empty",
                self.key_field
            ))),
            Some(key) => Ok(key),
        }
    }
}

#[async_trait]
impl LookupService for CacheRecordLookupService {
    async fn lookup(&self, coordinates: &Coordinates) -> Result<Option<Record>> {
        let key = self.extract_key(coordinates)?;
        debug!("Looking up record for key '{}'", key);

        let bytes: Option<Vec<u8>> = self
            .client
            .get(key, &StringSerializer, &BytesDeserializer)
            .await?;

        let Some(bytes) = bytes else {
            debug!("No cache entry for key '{}'", key);
            return Ok(None);
        };

        debug!("Read {} bytes for key '{}'", bytes.len(), key);

        let record = self
            .reader
            .parse(&bytes, self.schema_hint.as_ref())
            .map_err(|source| LookupFailure::Parse {
                key: key.to_string(),
                source,
            })?;

        Ok(Some(record))
    }

    fn required_keys(&self) -> BTreeSet<String> {
        BTreeSet::from([self.key_field.clone()])
    }
}

impl std::fmt::Debug for CacheRecordLookupService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheRecordLookupService")
            .field("client", &self.client.name())
            .field("key_field", &self.key_field)
            .field("schema_hint", &self.schema_hint)
            .finish()
    }
}
