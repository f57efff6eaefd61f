//! Single-flight reference cache
//!
//! Maps `type/identifier` keys to once-cells. Concurrent lookups of the same
//! key share one fetch; a failed fetch leaves the slot empty so the next
//! caller tries again. The cache lives as long as its owner, typically one
//! traversal of an object graph.

use crate::client::Client;
use crate::error::Result;
use crate::materialize::{Object, Reference};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;

type Slot = Arc<OnceCell<Arc<Object>>>;

#[derive(Default)]
pub struct ReferenceCache {
    entries: Mutex<HashMap<String, Slot>>,
}

impl ReferenceCache {
    pub fn new() -> Self {
        Self::default()
    }

    // the lock is only held to find or insert the slot, never across a fetch
    fn slot(&self, key: &str) -> Slot {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.entry(key.to_string()).or_default().clone()
    }

    /// Return the cached object for `key`, running `fetch` if nobody has
    /// loaded it yet.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, fetch: F) -> Result<Arc<Object>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Object>>,
    {
        let slot = self.slot(key);
        if let Some(object) = slot.get() {
            tracing::trace!("Cache hit for {}", key);
            return Ok(object.clone());
        }

        slot.get_or_try_init(|| async {
            tracing::trace!("Cache miss for {}", key);
            fetch().await.map(Arc::new)
        })
        .await
        .cloned()
    }

    /// Load the referenced object through the cache.
    pub async fn resolve(&self, client: &Client, reference: &Reference) -> Result<Arc<Object>> {
        self.get_or_fetch(&reference.key(), || {
            client.get(reference.type_name(), reference.identifier())
        })
        .await
    }

    /// The loaded object for `key`, if any.
    pub fn get(&self, key: &str) -> Option<Arc<Object>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).and_then(|slot| slot.get().cloned())
    }

    /// Number of loaded objects.
    pub fn len(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.values().filter(|slot| slot.initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
