//! Query URL builder
//!
//! Renders list and get URLs of the reportable REST service from a
//! descriptor. The `fields` selector is percent-encoded as a whole, which
//! covers every literal taken from the caller.

use crate::error::{Error, Result};
use crate::schema::{Catalog, FieldKind, ResourceDescriptor};
use std::fmt::{self, Display};

/// Default path of the reportable REST service below the server root.
pub const DEFAULT_REPORT_PATH: &str = "ccm/rpt/repository";

/// List filter: terms on field values, combined with `and`.
///
/// Several values for the same field are combined with `or`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    terms: Vec<(String, Vec<String>)>,
    raw: Vec<String>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// A filter made of a predicate passed through unchanged,
    /// e.g. `name="Jane" or userId="jdoe"`.
    pub fn raw(query: impl Into<String>) -> Self {
        Self {
            raw: vec![query.into()],
            ..Self::default()
        }
    }

    /// Match `field` against a value. Calling it again for the same field
    /// adds an alternative.
    pub fn with(mut self, field: impl Into<String>, value: impl Display) -> Self {
        let field = field.into();
        let value = value.to_string();
        match self.terms.iter_mut().find(|(k, _)| *k == field) {
            Some((_, values)) => values.push(value),
            None => self.terms.push((field, vec![value])),
        }
        self
    }

    /// Match `field` against any of the values.
    pub fn with_any<I, V>(self, field: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Display,
    {
        values
            .into_iter()
            .fold(self, |filter, value| filter.with(field, value))
    }

    /// Add another raw alternative.
    pub fn or_raw(mut self, query: impl Into<String>) -> Self {
        self.raw.push(query.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty() && self.raw.is_empty()
    }

    /// Render the bracketed predicate, or an empty string for an empty filter.
    pub fn predicate(&self, catalog: &Catalog, descriptor: &ResourceDescriptor) -> Result<String> {
        if self.is_empty() {
            return Ok(String::new());
        }

        let mut terms = Vec::with_capacity(self.terms.len() + 1);
        for (key, values) in &self.terms {
            let field = catalog.field(descriptor, key).ok_or_else(|| {
                Error::Filter(format!("no field with name \"{key}\" in \"{}\"", descriptor.name))
            })?;
            let path = match catalog.kind_of(field) {
                Ok(FieldKind::Reference(_)) | Ok(FieldKind::Embedded(_)) => {
                    format!("{}/itemId", field.wire_name)
                }
                _ => field.wire_name.clone(),
            };
            // the predicate grammar has no escape for a quote inside a literal
            if let Some(value) = values.iter().find(|value| value.contains('"')) {
                return Err(Error::Filter(format!(
                    "value {value:?} for field \"{key}\" contains a double quote"
                )));
            }
            let alternatives: Vec<String> = values
                .iter()
                .map(|value| format!("{path}=\"{value}\""))
                .collect();
            terms.push(group(alternatives));
        }
        if !self.raw.is_empty() {
            terms.push(group(self.raw.clone()));
        }

        Ok(format!("[{}]", terms.join(" and ")))
    }
}

fn group(mut alternatives: Vec<String>) -> String {
    if alternatives.len() == 1 {
        alternatives.remove(0)
    } else {
        format!("({})", alternatives.join(" or "))
    }
}

impl Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut terms: Vec<String> = self
            .terms
            .iter()
            .map(|(key, values)| format!("{key}={}", values.join("|")))
            .collect();
        terms.extend(self.raw.iter().cloned());
        f.write_str(&terms.join(", "))
    }
}

/// Builds request URLs relative to the server root.
#[derive(Clone, Copy)]
pub struct UrlBuilder<'a> {
    catalog: &'a Catalog,
    root: &'a str,
}

impl<'a> UrlBuilder<'a> {
    pub fn new(catalog: &'a Catalog, root: &'a str) -> Self {
        Self {
            catalog,
            root: root.trim_end_matches('/'),
        }
    }

    /// URL listing the ids of all items matching the filter.
    pub fn list_url(&self, descriptor: &ResourceDescriptor, filter: &Filter) -> Result<String> {
        let tag = listable_tag(descriptor)?;
        let predicate = filter.predicate(self.catalog, descriptor)?;
        let fields = format!("{tag}/{tag}{predicate}/(itemId)");
        Ok(self.render(descriptor, &fields))
    }

    /// URL fetching one item with its full projection.
    pub fn get_url(&self, descriptor: &ResourceDescriptor, id: &str) -> Result<String> {
        let tag = listable_tag(descriptor)?;
        let projection = self.catalog.projection(descriptor);
        let fields = format!("{tag}/{tag}[itemId={id}]/({})", projection.join("|"));
        Ok(self.render(descriptor, &fields))
    }

    fn render(&self, descriptor: &ResourceDescriptor, fields: &str) -> String {
        format!(
            "{}/{}?fields={}",
            self.root,
            descriptor.resource_group,
            urlencoding::encode(fields)
        )
    }
}

fn listable_tag(descriptor: &ResourceDescriptor) -> Result<&str> {
    if descriptor.is_listable() {
        Ok(&descriptor.list_tag)
    } else {
        Err(Error::NotListable(descriptor.name.clone()))
    }
}
