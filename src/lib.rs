//! jazz-client - typed access to the Jazz reportable REST services
//!
//! Resource types are described by an explicit catalog of descriptors.
//! From a descriptor the client plans the field projection of a request,
//! builds list and single-item URLs, walks paginated listings, loads the
//! listed items through a bounded pool of workers and materializes the
//! responses into [`Object`]s whose references resolve lazily.
//!
//! The [`qm`] module covers the quality management application (projects
//! and test resources) and [`gc`] selects a global configuration.
//!
//! ```no_run
//! use jazz_client::{Client, ClientConfig, Filter};
//!
//! # async fn run() -> jazz_client::Result<()> {
//! let config = ClientConfig::new("https://jazz.example.com/ccm", "jdoe");
//! let client = Client::new(config, "secret")?;
//!
//! let filter = Filter::new().with("name", "Demo");
//! let area = client.get_filter("ProjectArea", &filter).await?;
//! for member in client.resolve_all(&area).await? {
//!     println!("{}", member);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod document;
pub mod error;
pub mod fetch;
pub mod gc;
pub mod logging;
pub mod materialize;
pub mod model;
pub mod qm;
pub mod query;
pub mod schema;
pub mod transport;

pub use client::Client;
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use fetch::{FetchPipeline, FetchStream, Fetched, ListEntry, ReferenceCache};
pub use gc::GlobalConfiguration;
pub use materialize::{Object, Reference, Value};
pub use model::{Ref, Resource};
pub use qm::{QmFilter, QmProject, QmResource};
pub use query::{Filter, UrlBuilder};
pub use schema::{Catalog, ResourceDescriptor};
pub use transport::{Response, Transport};
