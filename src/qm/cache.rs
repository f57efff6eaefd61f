//! Per-project cache of QM resources
//!
//! Same single-flight scheme as the reference cache: one once-cell per
//! resource URL, so concurrent lookups share a request and failures are
//! retried by the next caller.

use super::{QmProject, QmResource};
use crate::client::Client;
use crate::error::Result;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;

type Slot<T> = Arc<OnceCell<Arc<T>>>;

/// Loads every resource of one type and project at most once.
pub struct QmCache<T> {
    client: Client,
    project: QmProject,
    entries: Mutex<HashMap<String, Slot<T>>>,
}

impl<T: QmResource> QmCache<T> {
    pub fn new(client: Client, project: QmProject) -> Self {
        Self {
            client,
            project,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn project(&self) -> &QmProject {
        &self.project
    }

    fn slot(&self, href: &str) -> Slot<T> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.entry(href.to_string()).or_default().clone()
    }

    /// The resource at `href`, loaded on first use.
    pub async fn get(&self, href: &str) -> Result<Arc<T>> {
        let slot = self.slot(href);
        slot.get_or_try_init(|| async {
            tracing::trace!("QM cache miss for {}", href);
            self.client
                .qm_get::<T>(&self.project, href)
                .await
                .map(Arc::new)
        })
        .await
        .cloned()
    }

    /// Number of loaded resources.
    pub fn len(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.values().filter(|slot| slot.initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
