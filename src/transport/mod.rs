//! Transport abstraction
//!
//! The engine talks to the server only through [`Transport`], so tests and
//! alternative HTTP stacks can be plugged in.

pub mod http;

use crate::document::{Document, MediaType};
use crate::error::Result;
use async_trait::async_trait;

pub use http::HttpTransport;

/// Status and parsed body of a response.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub document: Document,
}

impl Response {
    pub fn new(status: u16, document: Document) -> Self {
        Self { status, document }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Request executor used by the client.
///
/// URLs may be relative to the server root or absolute (next-page links).
/// `configuration` is the global configuration sent as the
/// `Configuration-Context` header; the client passes `None` for feed
/// services, which reject it.
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `url`, asking for `accept`, and parse the body as such.
    async fn get(
        &self,
        url: &str,
        accept: MediaType,
        configuration: Option<&str>,
    ) -> Result<Response>;

    /// PUT `body` to `url`, returning the status code.
    async fn put(
        &self,
        url: &str,
        content_type: &str,
        body: Vec<u8>,
        configuration: Option<&str>,
    ) -> Result<u16>;
}
