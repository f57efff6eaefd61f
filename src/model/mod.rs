//! Typed resources
//!
//! Optional typed view on top of [`Object`](crate::Object): a struct that
//! implements [`Resource`] can be loaded with [`Client::get_as`] and
//! [`Client::list_as`]. Related resources are held as [`Ref`]s and loaded
//! on demand.

mod foundation;
mod workitem;

pub use foundation::{
    Contributor, DevelopmentLine, Iteration, ProjectArea, Role, RoleAssignment, TeamArea,
    TeamAreaHierarchyRecord,
};
pub use workitem::{Category, Comment, Deliverable, Literal, State, TimeSheetEntry, WorkItem};

use crate::client::Client;
use crate::error::Result;
use chrono::{DateTime, FixedOffset};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// A typed resource with a catalog entry.
pub trait Resource: DeserializeOwned + Send + Sync + 'static {
    /// Name of the catalog descriptor
    const TYPE_NAME: &'static str;
}

/// Lazy typed reference, (de)serialized as `{"itemId": ...}`.
pub struct Ref<T> {
    item_id: String,
    cell: Arc<OnceCell<Arc<T>>>,
}

impl<T> Ref<T> {
    pub fn new(item_id: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            cell: Arc::new(OnceCell::new()),
        }
    }

    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    /// The loaded resource, if already resolved.
    pub fn get(&self) -> Option<&Arc<T>> {
        self.cell.get()
    }
}

impl<T: Resource> Ref<T> {
    /// Load the referenced resource once; later calls return the same value.
    pub async fn resolve(&self, client: &Client) -> Result<Arc<T>> {
        self.cell
            .get_or_try_init(|| async { client.get_as::<T>(&self.item_id).await.map(Arc::new) })
            .await
            .cloned()
    }
}

impl<T> Clone for Ref<T> {
    fn clone(&self) -> Self {
        Self {
            item_id: self.item_id.clone(),
            cell: self.cell.clone(),
        }
    }
}

impl<T> fmt::Debug for Ref<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ref")
            .field("item_id", &self.item_id)
            .field("resolved", &self.cell.initialized())
            .finish()
    }
}

impl<T> PartialEq for Ref<T> {
    fn eq(&self, other: &Self) -> bool {
        self.item_id == other.item_id
    }
}

impl<T> fmt::Display for Ref<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.item_id)
    }
}

#[derive(Serialize, Deserialize)]
struct RefRepr {
    #[serde(rename = "itemId")]
    item_id: String,
}

impl<T> Serialize for Ref<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        RefRepr {
            item_id: self.item_id.clone(),
        }
        .serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for Ref<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        RefRepr::deserialize(deserializer).map(|repr| Ref::new(repr.item_id))
    }
}

/// Properties shared by every resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Base {
    /// Storage UUID of the item
    pub item_id: String,
    /// MD5 hash of the resource URI
    pub unique_id: String,
    pub state_id: String,
    pub context_id: String,
    pub modified: Option<DateTime<FixedOffset>>,
    /// Archived resources are usually hidden from the UI
    pub archived: bool,
    pub reportable_url: String,
    pub modified_by: Option<Ref<Contributor>>,
}
