//! Descriptor catalog
//!
//! The catalog is the resource descriptor table of the client. It is built
//! once, validated, and never mutated afterwards. The builtin catalog is
//! loaded from JSON files embedded in the binary, so new resource types can
//! be described without code changes.

use super::descriptor::{FieldDescriptor, FieldKind, ResourceDescriptor, ScalarKind, TypeExpr};
use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};

/// Embedded catalog files (compiled into the binary)
const CATALOG_FILES: &[&str] = &[
    include_str!("../resources/foundation.json"),
    include_str!("../resources/workitem.json"),
    include_str!("../resources/scm.json"),
    include_str!("../resources/build.json"),
];

/// Root structure of resources/*.json
#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    base_fields: Vec<FieldDescriptor>,
    #[serde(default)]
    resources: HashMap<String, ResourceDescriptor>,
}

pub(super) struct Entry {
    pub(super) descriptor: ResourceDescriptor,
    pub(super) projection: OnceLock<Vec<String>>,
}

/// Immutable table of resource descriptors, looked up by type name.
pub struct Catalog {
    pub(super) base: Vec<FieldDescriptor>,
    pub(super) entries: HashMap<String, Entry>,
}

static BUILTIN: OnceLock<Arc<Catalog>> = OnceLock::new();

impl Catalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    /// The catalog of embedded resource definitions (loaded on first access).
    pub fn builtin() -> Arc<Catalog> {
        BUILTIN
            .get_or_init(|| {
                let mut builder = Catalog::builder();
                for content in CATALOG_FILES {
                    builder = builder
                        .load_json(content)
                        .unwrap_or_else(|e| panic!("Failed to parse embedded catalog JSON: {}", e));
                }
                let catalog = builder
                    .build()
                    .unwrap_or_else(|e| panic!("Embedded catalog is invalid: {}", e));
                Arc::new(catalog)
            })
            .clone()
    }

    /// Look up a descriptor by type name. Pointer and list wrappers are
    /// stripped first, so `[]*Contributor` yields the `Contributor` descriptor.
    pub fn lookup(&self, ty: &str) -> Result<&ResourceDescriptor> {
        let expr = TypeExpr::new(ty);
        self.entries
            .get(expr.base())
            .map(|entry| &entry.descriptor)
            .ok_or_else(|| Error::NotFound(expr.base().to_string()))
    }

    /// Fields shared by every descriptor that inherits the base.
    pub fn base_fields(&self) -> &[FieldDescriptor] {
        &self.base
    }

    /// All fields of a descriptor: inherited base fields first, then its own.
    pub fn fields<'a>(
        &'a self,
        descriptor: &'a ResourceDescriptor,
    ) -> impl Iterator<Item = &'a FieldDescriptor> + 'a {
        let base: &[FieldDescriptor] = if descriptor.inherit_base {
            &self.base
        } else {
            &[]
        };
        base.iter().chain(descriptor.fields.iter())
    }

    /// Field of a descriptor by wire name.
    pub fn field<'a>(
        &'a self,
        descriptor: &'a ResourceDescriptor,
        wire_name: &str,
    ) -> Option<&'a FieldDescriptor> {
        self.fields(descriptor).find(|f| f.wire_name == wire_name)
    }

    /// Classify a field. Fails with [`Error::NotFound`] when the field
    /// names a type that is neither a scalar nor registered.
    pub fn kind_of(&self, field: &FieldDescriptor) -> Result<FieldKind<'_>> {
        if let Some(kind) = field.ty.scalar() {
            return Ok(FieldKind::Scalar(kind));
        }
        let related = self.lookup(field.ty.base())?;
        if related.is_listable() {
            Ok(FieldKind::Reference(related))
        } else {
            Ok(FieldKind::Embedded(related))
        }
    }

    /// Registered type names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Collects descriptors before the catalog is frozen.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    base: Vec<FieldDescriptor>,
    descriptors: Vec<ResourceDescriptor>,
}

impl CatalogBuilder {
    /// Add shared base fields.
    pub fn base_fields(mut self, fields: impl IntoIterator<Item = FieldDescriptor>) -> Self {
        self.base.extend(fields);
        self
    }

    /// Register one descriptor.
    pub fn register(mut self, descriptor: ResourceDescriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    /// Register everything from a catalog file.
    pub fn load_json(mut self, content: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(content)
            .map_err(|e| Error::Schema(format!("failed to parse catalog file: {e}")))?;
        self.base.extend(file.base_fields);

        let mut resources: Vec<(String, ResourceDescriptor)> = file.resources.into_iter().collect();
        resources.sort_by(|a, b| a.0.cmp(&b.0));
        for (name, mut descriptor) in resources {
            descriptor.name = name;
            self.descriptors.push(descriptor);
        }
        Ok(self)
    }

    /// Validate and freeze the catalog.
    pub fn build(self) -> Result<Catalog> {
        check_unique(&self.base, "base fields")?;

        let mut entries = HashMap::with_capacity(self.descriptors.len());
        for descriptor in self.descriptors {
            if descriptor.name.is_empty() {
                return Err(Error::Schema("descriptor without name".to_string()));
            }
            if descriptor.resource_group.is_empty() {
                return Err(Error::Schema(format!(
                    "descriptor \"{}\" has no resource group",
                    descriptor.name
                )));
            }
            if ScalarKind::from_name(&descriptor.name).is_some() {
                return Err(Error::Schema(format!(
                    "descriptor name \"{}\" shadows a scalar type",
                    descriptor.name
                )));
            }
            let mut fields = descriptor.fields.clone();
            if descriptor.inherit_base {
                fields.extend(self.base.iter().cloned());
            }
            check_unique(&fields, &descriptor.name)?;

            let name = descriptor.name.clone();
            let entry = Entry {
                descriptor,
                projection: OnceLock::new(),
            };
            if entries.insert(name.clone(), entry).is_some() {
                return Err(Error::Schema(format!("type \"{name}\" registered twice")));
            }
        }

        let catalog = Catalog {
            base: self.base,
            entries,
        };
        check_embedding_cycles(&catalog)?;

        tracing::debug!("Catalog built with {} descriptors", catalog.len());
        Ok(catalog)
    }
}

fn check_unique(fields: &[FieldDescriptor], owner: &str) -> Result<()> {
    let mut seen = HashSet::with_capacity(fields.len());
    for field in fields {
        if field.wire_name.is_empty() || field.ty.base().is_empty() {
            return Err(Error::Schema(format!(
                "incomplete field \"{}\" in \"{owner}\"",
                field.wire_name
            )));
        }
        if !seen.insert(field.wire_name.as_str()) {
            return Err(Error::Schema(format!(
                "duplicate field \"{}\" in \"{owner}\"",
                field.wire_name
            )));
        }
    }
    Ok(())
}

/// Embedded fields are materialized recursively, so a cycle made only of
/// embedded links would never terminate. Reference fields end the recursion.
fn check_embedding_cycles(catalog: &Catalog) -> Result<()> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Visiting,
        Done,
    }

    fn visit<'a>(
        catalog: &'a Catalog,
        descriptor: &'a ResourceDescriptor,
        marks: &mut HashMap<&'a str, Mark>,
        path: &mut Vec<&'a str>,
    ) -> Result<()> {
        match marks.get(descriptor.name.as_str()) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => {
                path.push(&descriptor.name);
                return Err(Error::Schema(format!(
                    "embedding cycle {}",
                    path.join(" -> ")
                )));
            }
            None => {}
        }
        marks.insert(&descriptor.name, Mark::Visiting);
        path.push(&descriptor.name);
        for field in catalog.fields(descriptor) {
            if let Ok(FieldKind::Embedded(related)) = catalog.kind_of(field) {
                visit(catalog, related, marks, path)?;
            }
        }
        path.pop();
        marks.insert(&descriptor.name, Mark::Done);
        Ok(())
    }

    let mut marks = HashMap::new();
    for entry in catalog.entries.values() {
        visit(catalog, &entry.descriptor, &mut marks, &mut Vec::new())?;
    }
    Ok(())
}
