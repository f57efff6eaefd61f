//! Parsed response documents
//!
//! The services answer either with XML (reportable REST, QM resources, RDF
//! from the GC application) or with JSON (feeds). Both are navigated through
//! the [`Node`] trait so that the materializer works the same way on either
//! representation.

pub mod xml;

use serde_json::Value;
use std::borrow::Cow;

pub use xml::XmlElement;

/// A navigable node of a parsed document.
pub trait Node {
    /// Child nodes matching a wire name. Repeated elements (XML) and arrays
    /// (JSON) yield one node per entry.
    fn select(&self, name: &str) -> Vec<&Self>;

    /// Text content of a leaf node.
    fn text(&self) -> Option<Cow<'_, str>>;

    /// False for empty elements and null / empty JSON values.
    fn has_content(&self) -> bool;
}

impl Node for XmlElement {
    fn select(&self, name: &str) -> Vec<&Self> {
        XmlElement::select(self, name)
    }

    fn text(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(XmlElement::text(self)))
    }

    fn has_content(&self) -> bool {
        XmlElement::has_content(self)
    }
}

impl Node for Value {
    fn select(&self, name: &str) -> Vec<&Self> {
        match self.get(name) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items.iter().collect(),
            Some(value) => vec![value],
        }
    }

    fn text(&self) -> Option<Cow<'_, str>> {
        match self {
            Value::String(s) => Some(Cow::Borrowed(s.as_str())),
            Value::Number(n) => Some(Cow::Owned(n.to_string())),
            Value::Bool(b) => Some(Cow::Owned(b.to_string())),
            _ => None,
        }
    }

    fn has_content(&self) -> bool {
        match self {
            Value::Null => false,
            Value::String(s) => !s.is_empty(),
            Value::Array(items) => !items.is_empty(),
            Value::Object(map) => !map.is_empty(),
            _ => true,
        }
    }
}

/// Media types requested from the services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Xml,
    RdfXml,
    Json,
    Text,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Xml => "application/xml",
            MediaType::RdfXml => "application/rdf+xml",
            MediaType::Json => "application/json",
            MediaType::Text => "text/plain",
        }
    }
}

/// A parsed response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    Xml(XmlElement),
    Json(Value),
    /// Plain text body, kept as sent.
    Text(String),
    /// The response had no body.
    Empty,
}

impl Document {
    /// Parse a body according to the media type it was requested as.
    /// Blank bodies become [`Document::Empty`].
    pub fn parse(body: &str, media: MediaType) -> crate::Result<Self> {
        if body.trim().is_empty() {
            return Ok(Document::Empty);
        }
        match media {
            MediaType::Xml | MediaType::RdfXml => xml::parse(body).map(Document::Xml),
            MediaType::Text => Ok(Document::Text(body.to_string())),
            MediaType::Json => serde_json::from_str(body)
                .map(Document::Json)
                .map_err(|e| crate::Error::Parse(format!("malformed JSON: {e}"))),
        }
    }

    /// Message carried by an error document, if any.
    ///
    /// XML errors put it in a (possibly prefixed) `message` element or in
    /// the text of an `error` root; JSON errors in `error.message`,
    /// `message` or a plain `error` string.
    pub fn error_message(&self) -> Option<String> {
        match self {
            Document::Xml(root) => root
                .descendant("message")
                .map(|e| e.text().trim().to_string())
                .or_else(|| (root.local_name() == "error").then(|| root.text().trim().to_string()))
                .filter(|m| !m.is_empty()),
            Document::Json(value) => value
                .pointer("/error/message")
                .or_else(|| value.get("message"))
                .or_else(|| value.get("error"))
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
            Document::Text(text) => Some(text.trim().to_string()).filter(|m| !m.is_empty()),
            Document::Empty => None,
        }
    }
}
