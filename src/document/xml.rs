//! Minimal XML element tree built with quick-xml
//!
//! Responses of the reportable REST services are small enough to be held
//! in memory, so the reader builds a full tree that the materializer and
//! the list walker can navigate by element name.

use crate::error::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// An XML element with its attributes, child elements and text content.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlElement {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlElement>,
    text: String,
}

impl XmlElement {
    /// Create an empty element (mainly useful for building documents in code).
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Append a child element.
    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(child);
        self
    }

    /// Set the text content.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Add an attribute.
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    /// Qualified element name (including a namespace prefix if present).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Element name without namespace prefix.
    pub fn local_name(&self) -> &str {
        local(&self.name)
    }

    /// Text content of the element (concatenated text and CDATA nodes).
    pub fn text(&self) -> &str {
        &self.text
    }

    /// All child elements in document order.
    pub fn children(&self) -> &[XmlElement] {
        &self.children
    }

    /// Value of an attribute, matched by qualified or local name.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| matches_name(k, key))
            .map(|(_, v)| v.as_str())
    }

    /// Child elements with the given name.
    pub fn select(&self, name: &str) -> Vec<&XmlElement> {
        self.children
            .iter()
            .filter(|c| matches_name(&c.name, name))
            .collect()
    }

    /// First child element with the given name.
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| matches_name(&c.name, name))
    }

    /// Elements reached by a relative `/`-separated path of element names.
    pub fn find_all(&self, path: &str) -> Vec<&XmlElement> {
        let mut current = vec![self];
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current = current
                .into_iter()
                .flat_map(|e| e.select(segment))
                .collect();
        }
        current
    }

    /// First descendant (depth first) with the given name.
    pub fn descendant(&self, name: &str) -> Option<&XmlElement> {
        for child in &self.children {
            if matches_name(&child.name, name) {
                return Some(child);
            }
            if let Some(found) = child.descendant(name) {
                return Some(found);
            }
        }
        None
    }

    /// All descendants (depth first) with the given name.
    pub fn descendants(&self, name: &str) -> Vec<&XmlElement> {
        let mut found = Vec::new();
        for child in &self.children {
            if matches_name(&child.name, name) {
                found.push(child);
            }
            found.extend(child.descendants(name));
        }
        found
    }

    /// True when the element has child elements or non-blank text.
    pub fn has_content(&self) -> bool {
        !self.children.is_empty() || !self.text.trim().is_empty()
    }

    fn from_start(start: &BytesStart<'_>) -> Result<Self> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut element = XmlElement::new(name);
        for attr in start.attributes() {
            let attr = attr.map_err(|e| Error::Parse(format!("invalid attribute: {e}")))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| Error::Parse(format!("invalid attribute value: {e}")))?;
            element.attributes.push((key, value.into_owned()));
        }
        Ok(element)
    }
}

/// Parse an XML document and return its root element.
pub fn parse(input: &str) -> Result<XmlElement> {
    // text is kept untrimmed; whitespace between elements only lands in
    // the text of container elements, which nothing reads as a value
    let mut reader = Reader::from_str(input);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            Error::Parse(format!(
                "malformed XML at position {}: {e}",
                reader.buffer_position()
            ))
        })?;

        match event {
            Event::Start(start) => stack.push(XmlElement::from_start(&start)?),
            Event::Empty(start) => {
                let element = XmlElement::from_start(&start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| Error::Parse("unexpected closing tag".to_string()))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                if let Some(current) = stack.last_mut() {
                    let text = text
                        .unescape()
                        .map_err(|e| Error::Parse(format!("invalid text content: {e}")))?;
                    current.text.push_str(&text);
                }
            }
            Event::CData(data) => {
                if let Some(current) = stack.last_mut() {
                    current
                        .text
                        .push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(Error::Parse(format!("unclosed element <{}>", open.name)));
    }
    root.ok_or_else(|| Error::Parse("document has no root element".to_string()))
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(Error::Parse("multiple root elements".to_string())),
    }
    Ok(())
}

fn local(name: &str) -> &str {
    name.rsplit_once(':').map(|(_, l)| l).unwrap_or(name)
}

fn matches_name(actual: &str, wanted: &str) -> bool {
    actual == wanted || (!wanted.contains(':') && local(actual) == wanted)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<foundation href="https://example.com/next" xmlns:qm="http://jazz.net/xmlns/qm">
  <contributor><itemId>_a1</itemId></contributor>
  <contributor><itemId>_b2</itemId><name>Jane &amp; John</name></contributor>
  <qm:message><![CDATA[boom]]></qm:message>
  <empty/>
</foundation>"#;

    #[test]
    fn test_parse_tree() {
        let root = parse(PAGE).unwrap();
        assert_eq!(root.name(), "foundation");
        assert_eq!(root.attr("href"), Some("https://example.com/next"));
        assert_eq!(root.select("contributor").len(), 2);
        assert_eq!(root.children().len(), 4);
    }

    #[test]
    fn test_find_all_by_path() {
        let root = parse(PAGE).unwrap();
        let ids: Vec<&str> = root
            .find_all("contributor/itemId")
            .into_iter()
            .map(|e| e.text())
            .collect();
        assert_eq!(ids, vec!["_a1", "_b2"]);
    }

    #[test]
    fn test_text_is_unescaped() {
        let root = parse(PAGE).unwrap();
        let name = root.find_all("contributor/name");
        assert_eq!(name[0].text(), "Jane & John");
    }

    #[test]
    fn test_prefixed_names_match_local_name() {
        let root = parse(PAGE).unwrap();
        let message = root.descendant("message").unwrap();
        assert_eq!(message.name(), "qm:message");
        assert_eq!(message.text(), "boom");
        assert!(root.descendant("qm:message").is_some());
    }

    #[test]
    fn test_leaf_text_is_verbatim() {
        let root = parse("<contributor>\n  <name>  Jane  </name>\n</contributor>").unwrap();
        assert_eq!(root.child("name").unwrap().text(), "  Jane  ");
        assert_eq!(root.children().len(), 1);
    }

    #[test]
    fn test_descendants() {
        let root = parse(
            r#"<rdf:RDF><rdf:Description rdf:about="a"/><x><rdf:Description rdf:about="b"/></x></rdf:RDF>"#,
        )
        .unwrap();
        let abouts: Vec<&str> = root
            .descendants("rdf:Description")
            .into_iter()
            .filter_map(|e| e.attr("rdf:about"))
            .collect();
        assert_eq!(abouts, vec!["a", "b"]);
    }

    #[test]
    fn test_content_detection() {
        let root = parse(PAGE).unwrap();
        assert!(!root.child("empty").unwrap().has_content());
        assert!(root.child("contributor").unwrap().has_content());
    }

    #[test]
    fn test_malformed_documents() {
        assert!(matches!(parse("<a><b></a>"), Err(Error::Parse(_))));
        assert!(matches!(parse("<a>"), Err(Error::Parse(_))));
        assert!(matches!(parse(""), Err(Error::Parse(_))));
        assert!(matches!(parse("<a/><b/>"), Err(Error::Parse(_))));
    }
}
