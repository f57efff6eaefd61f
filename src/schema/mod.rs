//! Resource schema
//!
//! Explicit descriptors for every resource type the client can request,
//! the catalog holding them and the projection planner built on top.

pub mod catalog;
pub mod descriptor;
mod projection;

pub use catalog::{Catalog, CatalogBuilder};
pub use descriptor::{FieldDescriptor, FieldKind, ResourceDescriptor, ScalarKind, TypeExpr};
