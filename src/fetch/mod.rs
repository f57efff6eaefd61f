//! Fetch layer
//!
//! Pagination of listings, the bounded worker pipeline that loads the
//! listed items and the single-flight cache used to resolve references.

pub mod cache;
pub mod pipeline;
pub mod walker;

pub use cache::ReferenceCache;
pub use pipeline::{FetchPipeline, FetchStream, Fetched};
pub use walker::{ListEntry, ListWalker, Page, PageFormat};
