//! In-process cache server and connections to it
//!
//! [`MemoryServer`] plays the role of the remote cache: it is cheap to clone
//! and every clone shares the same entries, so several clients connected to
//! one server observe each other's writes. Per-key atomicity comes from the
//! shard locks of the underlying `DashMap`; operations on keys in different
//! shards never wait on each other.
//!
//! [`MemoryTransport`] is one connection. It can be severed or slowed down to
//! reproduce broken and laggy links.

use crate::error::{CacheError, Result};
use crate::stats::CacheStats;
use crate::transport::{CacheTransport, KeyPattern, Revision, VersionedValue};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone)]
struct StoredEntry {
    value: Vec<u8>,
    revision: Revision,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    rejected_writes: AtomicU64,
    removals: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }
}

#[derive(Debug)]
struct ServerState {
    entries: DashMap<Vec<u8>, StoredEntry>,
    revision: AtomicU64,
    available: AtomicBool,
    counters: Counters,
}

/// Shared in-process key/value server
#[derive(Debug, Clone)]
pub struct MemoryServer {
    state: Arc<ServerState>,
}

impl Default for MemoryServer {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryServer {
    pub fn new() -> Self {
        Self {
            state: Arc::new(ServerState {
                entries: DashMap::new(),
                revision: AtomicU64::new(0),
                available: AtomicBool::new(true),
                counters: Counters::default(),
            }),
        }
    }

    /// Open a new, not yet connected, transport to this server
    pub fn transport(&self) -> MemoryTransport {
        MemoryTransport {
            server: self.clone(),
            connected: AtomicBool::new(false),
            severed: AtomicBool::new(false),
            latency: None,
        }
    }

    /// Toggle reachability; while unavailable every connection fails
    pub fn set_available(&self, available: bool) {
        info!("Memory cache server availability set to {}", available);
        self.state.available.store(available, Ordering::SeqCst);
    }

    pub fn is_available(&self) -> bool {
        self.state.available.load(Ordering::SeqCst)
    }

    /// Seed an entry directly, bypassing any client
    pub fn insert(&self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        let revision = self.next_revision();
        self.state.entries.insert(
            key.into(),
            StoredEntry {
                value: value.into(),
                revision,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.state.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.entries.is_empty()
    }

    /// Snapshot of the server counters
    pub fn stats(&self) -> CacheStats {
        let counters = &self.state.counters;
        let size_bytes = self
            .state
            .entries
            .iter()
            .map(|e| e.key().len() + e.value().value.len())
            .sum();

        CacheStats {
            hits: counters.hits.load(Ordering::Relaxed),
            misses: counters.misses.load(Ordering::Relaxed),
            writes: counters.writes.load(Ordering::Relaxed),
            rejected_writes: counters.rejected_writes.load(Ordering::Relaxed),
            removals: counters.removals.load(Ordering::Relaxed),
            entries: self.state.entries.len(),
            size_bytes,
        }
    }

    fn next_revision(&self) -> Revision {
        self.state.revision.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn record_read(&self, found: bool) {
        let counters = &self.state.counters;
        if found {
            Counters::bump(&counters.hits, 1);
        } else {
            Counters::bump(&counters.misses, 1);
        }
    }

    fn record_write(&self, accepted: bool) {
        let counters = &self.state.counters;
        if accepted {
            Counters::bump(&counters.writes, 1);
        } else {
            Counters::bump(&counters.rejected_writes, 1);
        }
    }
}

/// One connection to a [`MemoryServer`]
#[derive(Debug)]
pub struct MemoryTransport {
    server: MemoryServer,
    connected: AtomicBool,
    severed: AtomicBool,
    latency: Option<Duration>,
}

impl MemoryTransport {
    /// Delay every round-trip by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Break the connection; all later calls fail with a connection error
    pub fn sever(&self) {
        self.severed.store(true, Ordering::SeqCst);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst) && !self.severed.load(Ordering::SeqCst)
    }

    pub fn server(&self) -> &MemoryServer {
        &self.server
    }

    async fn round_trip(&self) -> Result<&ServerState> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if self.severed.load(Ordering::SeqCst) {
            return Err(CacheError::ConnectionError(
                "connection reset by peer".to_string(),
            ));
        }
        if !self.connected.load(Ordering::SeqCst) {
            return Err(CacheError::ConnectionError("not connected".to_string()));
        }
        if !self.server.is_available() {
            return Err(CacheError::ConnectionError(
                "cache server unreachable".to_string(),
            ));
        }

        Ok(&self.server.state)
    }
}

#[async_trait]
impl CacheTransport for MemoryTransport {
    async fn connect(&self) -> Result<()> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if !self.server.is_available() {
            return Err(CacheError::ConnectionError("connection refused".to_string()));
        }

        self.severed.store(false, Ordering::SeqCst);
        self.connected.store(true, Ordering::SeqCst);
        debug!("Memory transport connected");
        Ok(())
    }

    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let state = self.round_trip().await?;
        let value = state.entries.get(key).map(|e| e.value.clone());
        self.server.record_read(value.is_some());
        Ok(value)
    }

    async fn get_all(&self, keys: &[Vec<u8>]) -> Result<Vec<Option<Vec<u8>>>> {
        let state = self.round_trip().await?;
        let values = keys
            .iter()
            .map(|key| {
                let value = state.entries.get(key).map(|e| e.value.clone());
                self.server.record_read(value.is_some());
                value
            })
            .collect();
        Ok(values)
    }

    async fn put(&self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        let state = self.round_trip().await?;
        let revision = self.server.next_revision();
        state.entries.insert(key, StoredEntry { value, revision });
        self.server.record_write(true);
        Ok(())
    }

    async fn put_if_absent(&self, key: Vec<u8>, value: Vec<u8>) -> Result<bool> {
        let state = self.round_trip().await?;
        let stored = match state.entries.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                let revision = self.server.next_revision();
                slot.insert(StoredEntry { value, revision });
                true
            }
        };
        self.server.record_write(stored);
        Ok(stored)
    }

    async fn get_and_put_if_absent(&self, key: Vec<u8>, value: Vec<u8>) -> Result<Option<Vec<u8>>> {
        let state = self.round_trip().await?;
        let existing = match state.entries.entry(key) {
            Entry::Occupied(current) => Some(current.get().value.clone()),
            Entry::Vacant(slot) => {
                let revision = self.server.next_revision();
                slot.insert(StoredEntry { value, revision });
                None
            }
        };
        self.server.record_write(existing.is_none());
        Ok(existing)
    }

    async fn contains_key(&self, key: &[u8]) -> Result<bool> {
        let state = self.round_trip().await?;
        Ok(state.entries.contains_key(key))
    }

    async fn remove(&self, key: &[u8]) -> Result<bool> {
        Ok(self.remove_and_get(key).await?.is_some())
    }

    async fn remove_and_get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let state = self.round_trip().await?;
        let removed = state.entries.remove(key).map(|(_, entry)| entry.value);
        if removed.is_some() {
            Counters::bump(&state.counters.removals, 1);
        }
        Ok(removed)
    }

    async fn remove_by_pattern(&self, pattern: &KeyPattern) -> Result<u64> {
        let state = self.round_trip().await?;
        let mut removed = 0u64;
        state.entries.retain(|key, _| {
            if pattern.matches(key) {
                removed += 1;
                false
            } else {
                true
            }
        });
        Counters::bump(&state.counters.removals, removed);
        Ok(removed)
    }

    async fn keys(&self) -> Result<Vec<Vec<u8>>> {
        let state = self.round_trip().await?;
        Ok(state.entries.iter().map(|e| e.key().clone()).collect())
    }

    async fn fetch(&self, key: &[u8]) -> Result<Option<VersionedValue>> {
        let state = self.round_trip().await?;
        let fetched = state.entries.get(key).map(|e| VersionedValue {
            revision: e.revision,
            value: e.value.clone(),
        });
        self.server.record_read(fetched.is_some());
        Ok(fetched)
    }

    async fn replace(&self, key: Vec<u8>, value: Vec<u8>, expected: Option<Revision>) -> Result<bool> {
        let state = self.round_trip().await?;
        let replaced = match (state.entries.entry(key), expected) {
            (Entry::Vacant(slot), None) => {
                let revision = self.server.next_revision();
                slot.insert(StoredEntry { value, revision });
                true
            }
            (Entry::Occupied(mut current), Some(expected)) => {
                if current.get().revision == expected {
                    let revision = self.server.next_revision();
                    current.insert(StoredEntry { value, revision });
                    true
                } else {
                    false
                }
            }
            _ => false,
        };
        self.server.record_write(replaced);
        Ok(replaced)
    }

    async fn close(&self) -> Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        debug!("Memory transport closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn connected(server: &MemoryServer) -> MemoryTransport {
        let transport = server.transport();
        transport.connect().await.unwrap();
        transport
    }

    #[tokio::test]
    async fn test_operations_require_connection() {
        let server = MemoryServer::new();
        let transport = server.transport();

        let err = transport.get(b"k").await.unwrap_err();
        assert!(err.is_transport());

        transport.connect().await.unwrap();
        assert!(transport.is_connected());
        assert_eq!(transport.get(b"k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_connections_share_server_state() {
        let server = MemoryServer::new();
        let first = connected(&server).await;
        let second = connected(&server).await;

        first.put(b"shared".to_vec(), b"v".to_vec()).await.unwrap();
        assert_eq!(second.get(b"shared").await.unwrap(), Some(b"v".to_vec()));
        assert_eq!(server.len(), 1);
    }

    #[tokio::test]
    async fn test_severed_connection() {
        let server = MemoryServer::new();
        let transport = connected(&server).await;

        transport.sever();
        assert!(!transport.is_connected());
        let err = transport.put(b"k".to_vec(), b"v".to_vec()).await.unwrap_err();
        assert!(matches!(err, CacheError::ConnectionError(_)));
        assert!(server.is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_server_refuses_connections() {
        let server = MemoryServer::new();
        server.set_available(false);

        let err = server.transport().connect().await.unwrap_err();
        assert!(err.is_transport());

        server.set_available(true);
        assert!(server.transport().connect().await.is_ok());
    }

    #[tokio::test]
    async fn test_replace_checks_revision() {
        let server = MemoryServer::new();
        let transport = connected(&server).await;

        assert!(transport.replace(b"k".to_vec(), b"v1".to_vec(), None).await.unwrap());
        assert!(!transport.replace(b"k".to_vec(), b"v1".to_vec(), None).await.unwrap());

        let fetched = transport.fetch(b"k").await.unwrap().unwrap();
        assert!(transport
            .replace(b"k".to_vec(), b"v2".to_vec(), Some(fetched.revision))
            .await
            .unwrap());
        assert!(!transport
            .replace(b"k".to_vec(), b"v3".to_vec(), Some(fetched.revision))
            .await
            .unwrap());
        assert!(!transport
            .replace(b"missing".to_vec(), b"v".to_vec(), Some(1))
            .await
            .unwrap());

        assert_eq!(transport.get(b"k").await.unwrap(), Some(b"v2".to_vec()));
    }

    #[tokio::test]
    async fn test_stats_track_reads_and_writes() {
        let server = MemoryServer::new();
        let transport = connected(&server).await;

        transport.put(b"a".to_vec(), b"1".to_vec()).await.unwrap();
        transport.put_if_absent(b"a".to_vec(), b"2".to_vec()).await.unwrap();
        transport.get(b"a").await.unwrap();
        transport.get(b"b").await.unwrap();
        transport.remove(b"a").await.unwrap();

        let stats = server.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.writes, 1);
        assert_eq!(stats.rejected_writes, 1);
        assert_eq!(stats.removals, 1);
        assert_eq!(stats.entries, 0);
    }
}
