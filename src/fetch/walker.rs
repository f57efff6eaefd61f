//! Paginated list walker
//!
//! Follows the page chain of a listing and yields its entries lazily. A
//! page shorter than the page size is the last one even if it carries a
//! next link, and a next link pointing back at the current page ends the
//! walk as well.

use crate::document::{Document, MediaType};
use crate::error::{Error, Result};
use crate::transport::Transport;
use futures::stream::{self, Stream, StreamExt};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;

/// How entries and the next link are found in a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageFormat {
    /// Reportable REST listing: `<root href="next"><tag><itemId>..</itemId></tag>..</root>`.
    Xml { list_tag: String },
    /// JSON feed: `{"feed": {"entry": [{"id": ..}], "next_url": ..}}`.
    Feed,
}

impl PageFormat {
    pub fn media_type(&self) -> MediaType {
        match self {
            PageFormat::Xml { .. } => MediaType::Xml,
            PageFormat::Feed => MediaType::Json,
        }
    }
}

/// One entry of a listing. Reportable REST listings only carry the id;
/// feed entries also have a title and, in the project feed, an alias.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListEntry {
    pub id: String,
    pub title: String,
    pub alias: String,
}

impl ListEntry {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

/// One page of a listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub entries: Vec<ListEntry>,
    pub next: Option<String>,
}

impl Page {
    /// Extract entries and next link from a response document.
    pub fn parse(format: &PageFormat, document: &Document) -> Result<Self> {
        match (format, document) {
            (_, Document::Empty) => Ok(Page::default()),
            (PageFormat::Xml { list_tag }, Document::Xml(root)) => {
                let entries = root
                    .find_all(&format!("{list_tag}/itemId"))
                    .into_iter()
                    .map(|e| e.text().trim())
                    .filter(|id| !id.is_empty())
                    .map(ListEntry::new)
                    .collect();
                let next = root
                    .attr("href")
                    .map(str::trim)
                    .filter(|href| !href.is_empty())
                    .map(str::to_string);
                Ok(Page { entries, next })
            }
            (PageFormat::Feed, Document::Json(value)) => Ok(parse_feed(value)),
            (PageFormat::Xml { .. }, _) => Err(Error::Parse(
                "expected an XML page".to_string(),
            )),
            (PageFormat::Feed, _) => Err(Error::Parse("expected a JSON feed".to_string())),
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.id.as_str())
    }
}

fn parse_feed(value: &Value) -> Page {
    let feed = value.get("feed").unwrap_or(value);

    // a feed with a single entry carries an object instead of a list
    let raw: Vec<&Value> = match feed.get("entry").or_else(|| feed.get("Entry")) {
        Some(Value::Array(entries)) => entries.iter().collect(),
        Some(entry @ Value::Object(_)) => vec![entry],
        _ => Vec::new(),
    };
    let entries = raw
        .into_iter()
        .filter_map(|entry| {
            let id = entry.get("id").and_then(Value::as_str)?;
            (!id.is_empty()).then(|| ListEntry {
                id: id.to_string(),
                title: content(entry.pointer("/title")),
                alias: content(entry.pointer("/content/project/alias")),
            })
        })
        .collect();

    let next = feed
        .get("next_url")
        .and_then(Value::as_str)
        .or_else(|| next_link(feed))
        .filter(|next| !next.is_empty())
        .map(str::to_string);

    Page { entries, next }
}

/// Text of an atom text construct: `{"content": ..}` or a plain string.
fn content(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(text)) => text.clone(),
        Some(value) => value
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        None => String::new(),
    }
}

fn next_link(feed: &Value) -> Option<&str> {
    let links: Vec<&Value> = match feed.get("link")? {
        Value::Array(links) => links.iter().collect(),
        link => vec![link],
    };
    links
        .into_iter()
        .find(|link| link.get("rel").and_then(Value::as_str) == Some("next"))
        .and_then(|link| link.get("href"))
        .and_then(Value::as_str)
}

/// Walks the pages of a listing
#[derive(Clone)]
pub struct ListWalker {
    transport: Arc<dyn Transport>,
    format: PageFormat,
    page_size: Option<usize>,
    configuration: Option<String>,
}

struct Cursor {
    walker: ListWalker,
    url: Option<String>,
    pending: VecDeque<ListEntry>,
}

impl ListWalker {
    pub fn new(transport: Arc<dyn Transport>, format: PageFormat) -> Self {
        Self {
            transport,
            format,
            page_size: None,
            configuration: None,
        }
    }

    /// Treat pages with fewer than `size` entries as the last page.
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = Some(size);
        self
    }

    /// Send `configuration` as the `Configuration-Context` of every page
    /// request.
    pub fn with_configuration(mut self, configuration: Option<String>) -> Self {
        self.configuration = configuration;
        self
    }

    /// Fetch and parse a single page
    pub async fn fetch_page(&self, url: &str) -> Result<Page> {
        tracing::debug!("Fetching page {}", url);

        let response = self
            .transport
            .get(url, self.format.media_type(), self.configuration.as_deref())
            .await?;
        if response.status != 200 {
            return Err(Error::Status {
                status: response.status,
                message: response
                    .document
                    .error_message()
                    .unwrap_or_else(|| "unknown error".to_string()),
            });
        }

        let page = Page::parse(&self.format, &response.document)?;
        tracing::debug!("Page returned {} entries", page.entries.len());
        Ok(page)
    }

    /// Stream the entries of all pages starting at `url`.
    ///
    /// Nothing is requested before the stream is polled. A failing page
    /// yields its error and ends the stream; entries of earlier pages have
    /// already been yielded by then.
    pub fn walk_entries(&self, url: String) -> impl Stream<Item = Result<ListEntry>> + Send + 'static {
        let cursor = Cursor {
            walker: self.clone(),
            url: Some(url),
            pending: VecDeque::new(),
        };

        stream::unfold(cursor, |mut cursor| async move {
            loop {
                if let Some(entry) = cursor.pending.pop_front() {
                    return Some((Ok(entry), cursor));
                }

                let url = cursor.url.take()?;
                match cursor.walker.fetch_page(&url).await {
                    Ok(page) => {
                        let full = cursor
                            .walker
                            .page_size
                            .map_or(true, |size| page.entries.len() >= size);
                        cursor.url = page.next.filter(|next| full && *next != url);
                        cursor.pending.extend(page.entries);
                    }
                    Err(e) => return Some((Err(e), cursor)),
                }
            }
        })
    }

    /// Stream the ids of all pages starting at `url`.
    pub fn walk(&self, url: String) -> impl Stream<Item = Result<String>> + Send + 'static {
        self.walk_entries(url).map(|entry| entry.map(|entry| entry.id))
    }
}
