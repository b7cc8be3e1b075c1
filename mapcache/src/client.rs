//! Distributed map cache client
//!
//! [`MapCacheClient`] turns typed keys and values into bytes with
//! caller-supplied serializers and forwards them to a [`CacheTransport`].
//! One client is enabled once, shared behind an `Arc`, and closed on shutdown.

use crate::codec::{to_bytes, Deserializer, Serializer};
use crate::config::ClientConfig;
use crate::error::{CacheError, Result};
use crate::transport::{CacheTransport, KeyPattern, Revision};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A value read together with the revision it was stored at
///
/// Hand it back to [`MapCacheClient::replace`] after changing the value to
/// perform a compare-and-set. `revision == None` describes an entry that did
/// not exist yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomicCacheEntry<K, V> {
    pub key: K,
    pub value: V,
    pub revision: Option<Revision>,
}

impl<K, V> AtomicCacheEntry<K, V> {
    pub fn new(key: K, value: V, revision: Option<Revision>) -> Self {
        Self {
            key,
            value,
            revision,
        }
    }

    pub fn set_value(&mut self, value: V) {
        self.value = value;
    }
}

/// Client for a remote key/value cache
///
/// # Example
/// ```
/// use mapcache::{ClientConfig, MapCacheClient, MemoryServer, StringDeserializer, StringSerializer};
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() -> mapcache::Result<()> {
/// let server = MemoryServer::new();
/// let client = MapCacheClient::enable(ClientConfig::default(), Arc::new(server.transport())).await?;
///
/// client.put("region", "eu-west", &StringSerializer, &StringSerializer).await?;
/// let region: Option<String> = client.get("region", &StringSerializer, &StringDeserializer).await?;
/// assert_eq!(region.as_deref(), Some("eu-west"));
///
/// client.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct MapCacheClient {
    config: ClientConfig,
    transport: Arc<dyn CacheTransport>,
    closed: AtomicBool,
}

impl std::fmt::Debug for MapCacheClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapCacheClient")
            .field("config", &self.config)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl MapCacheClient {
    /// Validate the configuration and connect the transport
    ///
    /// Connection setup is bounded by `connect_timeout`.
    pub async fn enable(config: ClientConfig, transport: Arc<dyn CacheTransport>) -> Result<Self> {
        config.validate()?;

        info!(
            "Enabling cache client '{}' (communications timeout: {:?})",
            config.name, config.communications_timeout
        );

        bounded(config.connect_timeout, "connect", transport.connect()).await?;

        info!("Cache client '{}' connected", config.name);

        Ok(Self {
            config,
            transport,
            closed: AtomicBool::new(false),
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Store `value` only if `key` is absent; true when the write happened
    pub async fn put_if_absent<K, V, KS, VS>(
        &self,
        key: &K,
        value: &V,
        key_serializer: &KS,
        value_serializer: &VS,
    ) -> Result<bool>
    where
        K: ?Sized,
        V: ?Sized,
        KS: Serializer<K> + ?Sized,
        VS: Serializer<V> + ?Sized,
    {
        let key_bytes = to_bytes(key, key_serializer)?;
        let value_bytes = to_bytes(value, value_serializer)?;

        let stored = self
            .call("put_if_absent", self.transport.put_if_absent(key_bytes, value_bytes))
            .await?;
        debug!("put_if_absent on '{}': stored={}", self.name(), stored);
        Ok(stored)
    }

    /// Store `value` if `key` is absent and return `None`; otherwise leave the
    /// entry untouched and return the value already stored
    ///
    /// Racing callers on one key see a single winner: every loser gets the
    /// winner's value back.
    pub async fn get_and_put_if_absent<K, V, KS, VS, VD>(
        &self,
        key: &K,
        value: &V,
        key_serializer: &KS,
        value_serializer: &VS,
        value_deserializer: &VD,
    ) -> Result<Option<V>>
    where
        K: ?Sized,
        KS: Serializer<K> + ?Sized,
        VS: Serializer<V> + ?Sized,
        VD: Deserializer<V> + ?Sized,
    {
        let key_bytes = to_bytes(key, key_serializer)?;
        let value_bytes = to_bytes(value, value_serializer)?;

        let existing = self
            .call(
                "get_and_put_if_absent",
                self.transport.get_and_put_if_absent(key_bytes, value_bytes),
            )
            .await?;

        match existing {
            Some(bytes) => Ok(Some(value_deserializer.deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Check for an entry without transferring its value
    pub async fn contains_key<K, KS>(&self, key: &K, key_serializer: &KS) -> Result<bool>
    where
        K: ?Sized,
        KS: Serializer<K> + ?Sized,
    {
        let key_bytes = to_bytes(key, key_serializer)?;
        self.call("contains_key", self.transport.contains_key(&key_bytes))
            .await
    }

    /// Retrieve and decode a value; `None` when no entry exists
    pub async fn get<K, V, KS, VD>(
        &self,
        key: &K,
        key_serializer: &KS,
        value_deserializer: &VD,
    ) -> Result<Option<V>>
    where
        K: ?Sized,
        KS: Serializer<K> + ?Sized,
        VD: Deserializer<V> + ?Sized,
    {
        let key_bytes = to_bytes(key, key_serializer)?;

        match self.call("get", self.transport.get(&key_bytes)).await? {
            Some(bytes) => {
                debug!("Cache hit on '{}' ({} bytes)", self.name(), bytes.len());
                Ok(Some(value_deserializer.deserialize(&bytes)?))
            }
            None => {
                debug!("Cache miss on '{}'", self.name());
                Ok(None)
            }
        }
    }

    /// Retrieve several keys in one round-trip, aligned with `keys`
    pub async fn get_all<K, V, KS, VD>(
        &self,
        keys: &[&K],
        key_serializer: &KS,
        value_deserializer: &VD,
    ) -> Result<Vec<Option<V>>>
    where
        K: ?Sized,
        KS: Serializer<K> + ?Sized,
        VD: Deserializer<V> + ?Sized,
    {
        let key_bytes = keys
            .iter()
            .map(|key| to_bytes(*key, key_serializer))
            .collect::<Result<Vec<_>>>()?;

        let values = self.call("get_all", self.transport.get_all(&key_bytes)).await?;

        values
            .into_iter()
            .map(|value| {
                value
                    .map(|bytes| value_deserializer.deserialize(&bytes))
                    .transpose()
            })
            .collect()
    }

    /// Unconditionally write `value` under `key`
    pub async fn put<K, V, KS, VS>(
        &self,
        key: &K,
        value: &V,
        key_serializer: &KS,
        value_serializer: &VS,
    ) -> Result<()>
    where
        K: ?Sized,
        V: ?Sized,
        KS: Serializer<K> + ?Sized,
        VS: Serializer<V> + ?Sized,
    {
        let key_bytes = to_bytes(key, key_serializer)?;
        let value_bytes = to_bytes(value, value_serializer)?;

        self.call("put", self.transport.put(key_bytes, value_bytes))
            .await
    }

    /// Delete `key`; true when something was deleted
    pub async fn remove<K, KS>(&self, key: &K, key_serializer: &KS) -> Result<bool>
    where
        K: ?Sized,
        KS: Serializer<K> + ?Sized,
    {
        let key_bytes = to_bytes(key, key_serializer)?;
        let removed = self.call("remove", self.transport.remove(&key_bytes)).await?;
        debug!("remove on '{}': removed={}", self.name(), removed);
        Ok(removed)
    }

    /// Delete `key` and return the value it held
    pub async fn remove_and_get<K, V, KS, VD>(
        &self,
        key: &K,
        key_serializer: &KS,
        value_deserializer: &VD,
    ) -> Result<Option<V>>
    where
        K: ?Sized,
        KS: Serializer<K> + ?Sized,
        VD: Deserializer<V> + ?Sized,
    {
        let key_bytes = to_bytes(key, key_serializer)?;

        match self
            .call("remove_and_get", self.transport.remove_and_get(&key_bytes))
            .await?
        {
            Some(bytes) => Ok(Some(value_deserializer.deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Delete every key whose text form fully matches the regular expression
    ///
    /// No key serializer is involved: patterns apply to the UTF-8 form of the
    /// stored key bytes. Returns the number of entries removed.
    pub async fn remove_by_pattern(&self, pattern: &str) -> Result<u64> {
        let pattern = KeyPattern::new(pattern)?;

        let removed = self
            .call("remove_by_pattern", self.transport.remove_by_pattern(&pattern))
            .await?;

        info!(
            "Removed {} entries matching '{}' from '{}'",
            removed,
            pattern.as_str(),
            self.name()
        );
        Ok(removed)
    }

    /// Decode every key currently stored
    pub async fn key_set<K, KD>(&self, key_deserializer: &KD) -> Result<Vec<K>>
    where
        KD: Deserializer<K> + ?Sized,
    {
        let keys = self.call("key_set", self.transport.keys()).await?;

        keys.iter()
            .map(|bytes| key_deserializer.deserialize(bytes))
            .collect()
    }

    /// Read an entry along with its revision for a later [`replace`](Self::replace)
    pub async fn fetch<K, V, KS, VD>(
        &self,
        key: K,
        key_serializer: &KS,
        value_deserializer: &VD,
    ) -> Result<Option<AtomicCacheEntry<K, V>>>
    where
        KS: Serializer<K> + ?Sized,
        VD: Deserializer<V> + ?Sized,
    {
        let key_bytes = to_bytes(&key, key_serializer)?;

        match self.call("fetch", self.transport.fetch(&key_bytes)).await? {
            Some(versioned) => {
                let value = value_deserializer.deserialize(&versioned.value)?;
                Ok(Some(AtomicCacheEntry::new(key, value, Some(versioned.revision))))
            }
            None => Ok(None),
        }
    }

    /// Write the entry only if nobody changed it since it was fetched
    ///
    /// Returns false when the stored revision moved on (or, for an entry
    /// without revision, when the key appeared in the meantime).
    pub async fn replace<K, V, KS, VS>(
        &self,
        entry: &AtomicCacheEntry<K, V>,
        key_serializer: &KS,
        value_serializer: &VS,
    ) -> Result<bool>
    where
        KS: Serializer<K> + ?Sized,
        VS: Serializer<V> + ?Sized,
    {
        let key_bytes = to_bytes(&entry.key, key_serializer)?;
        let value_bytes = to_bytes(&entry.value, value_serializer)?;

        let replaced = self
            .call(
                "replace",
                self.transport.replace(key_bytes, value_bytes, entry.revision),
            )
            .await?;

        if !replaced {
            debug!(
                "replace on '{}' rejected, revision {:?} is stale",
                self.name(),
                entry.revision
            );
        }
        Ok(replaced)
    }

    /// Lifecycle hook counterpart of [`enable`](Self::enable)
    pub async fn disable(&self) -> Result<()> {
        self.close().await
    }

    /// Release the connection; calling it again is a no-op
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        info!("Closing cache client '{}'", self.name());
        bounded(
            self.config.communications_timeout,
            "close",
            self.transport.close(),
        )
        .await
    }

    async fn call<T, F>(&self, operation: &'static str, op: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.is_closed() {
            return Err(CacheError::Closed(self.config.name.clone()));
        }

        bounded(self.config.communications_timeout, operation, op).await
    }
}

async fn bounded<T, F>(limit: Duration, operation: &'static str, op: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, op).await {
        Ok(result) => result,
        Err(_) => {
            warn!("Cache operation '{}' timed out after {:?}", operation, limit);
            Err(CacheError::TimeoutError {
                timeout_ms: limit.as_millis() as u64,
                context: operation.to_string(),
            })
        }
    }
}
