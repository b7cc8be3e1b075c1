//! Named collaborators that lookup services resolve at enable time

use crate::error::{LookupFailure, Result};
use crate::reader::RecordReader;
use mapcache::MapCacheClient;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Registry of enabled cache clients and record readers, keyed by name
#[derive(Default, Clone)]
pub struct ServiceRegistry {
    clients: HashMap<String, Arc<MapCacheClient>>,
    readers: HashMap<String, Arc<dyn RecordReader>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client under its configured name, replacing any previous one
    pub fn register_client(&mut self, client: Arc<MapCacheClient>) -> &mut Self {
        debug!("Registering cache client '{}'", client.name());
        self.clients.insert(client.name().to_string(), client);
        self
    }

    pub fn register_reader(&mut self, name: impl Into<String>, reader: Arc<dyn RecordReader>) -> &mut Self {
        let name = name.into();
        debug!("Registering record reader '{}'", name);
        self.readers.insert(name, reader);
        self
    }

    pub fn client(&self, name: &str) -> Result<Arc<MapCacheClient>> {
        self.clients
            .get(name)
            .cloned()
            .ok_or_else(|| LookupFailure::ServiceNotFound {
                kind: "cache client",
                name: name.to_string(),
            })
    }

    pub fn reader(&self, name: &str) -> Result<Arc<dyn RecordReader>> {
        self.readers
            .get(name)
            .cloned()
            .ok_or_else(|| LookupFailure::ServiceNotFound {
                kind: "record reader",
                name: name.to_string(),
            })
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("clients", &self.clients.keys().collect::<Vec<_>>())
            .field("readers", &self.readers.keys().collect::<Vec<_>>())
            .finish()
    }
}
