//! Field projection planner
//!
//! Computes the `fields=` selector that asks the server for exactly the
//! data a descriptor materializes: plain values through a single `*`,
//! related resources by id only, embedded types inline.

use super::catalog::Catalog;
use super::descriptor::{FieldDescriptor, FieldKind, ResourceDescriptor};
use std::borrow::Cow;
use std::collections::HashSet;

impl Catalog {
    /// Projection paths of a descriptor, computed once per registered type.
    ///
    /// Descriptors that are not part of this catalog are planned on every call.
    pub fn projection<'a>(&'a self, descriptor: &ResourceDescriptor) -> Cow<'a, [String]> {
        match self.entries.get(&descriptor.name) {
            Some(entry) if std::ptr::eq(&entry.descriptor, descriptor) => Cow::Borrowed(
                entry
                    .projection
                    .get_or_init(|| self.plan(&entry.descriptor))
                    .as_slice(),
            ),
            _ => Cow::Owned(self.plan(descriptor)),
        }
    }

    fn plan(&self, descriptor: &ResourceDescriptor) -> Vec<String> {
        let mut paths = Vec::new();
        if descriptor.inherit_base && descriptor.is_listable() {
            paths.extend(self.plan_fields(&self.base));
        }
        paths.extend(self.plan_fields(&descriptor.fields));
        dedup(paths)
    }

    fn plan_fields(&self, fields: &[FieldDescriptor]) -> Vec<String> {
        let mut paths = Vec::new();
        let mut plain = false;
        for field in fields {
            match self.kind_of(field) {
                Ok(FieldKind::Scalar(_)) | Err(_) => plain = true,
                Ok(FieldKind::Reference(_)) => paths.push(format!("{}/itemId", field.wire_name)),
                Ok(FieldKind::Embedded(related)) => {
                    let sub = self.projection(related);
                    let path = match sub.as_ref() {
                        [] => format!("{}/*", field.wire_name),
                        [single] => format!("{}/{}", field.wire_name, single),
                        many => format!("{}/({})", field.wire_name, many.join("|")),
                    };
                    paths.push(path);
                }
            }
        }
        if plain {
            paths.push("*".to_string());
        }
        paths
    }
}

fn dedup(paths: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(paths.len());
    paths
        .into_iter()
        .filter(|p| seen.insert(p.clone()))
        .collect()
}
