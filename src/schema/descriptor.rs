//! Resource and field descriptors
//!
//! A [`ResourceDescriptor`] is the explicit schema of one resource type:
//! where it lives on the server, which element name lists it, and the
//! ordered fields that make up its wire representation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Scalar kinds a field value can be coerced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    String,
    Int,
    Uint,
    Float,
    Bool,
    Timestamp,
}

impl ScalarKind {
    /// Resolve a scalar type name as used in catalog files.
    pub fn from_name(name: &str) -> Option<Self> {
        let kind = match name {
            "string" | "str" | "String" => Self::String,
            "int" | "int8" | "int16" | "int32" | "int64" | "i8" | "i16" | "i32" | "i64" => {
                Self::Int
            }
            "uint" | "uint8" | "uint16" | "uint32" | "uint64" | "u8" | "u16" | "u32" | "u64" => {
                Self::Uint
            }
            "float" | "float32" | "float64" | "double" | "f32" | "f64" => Self::Float,
            "bool" | "boolean" => Self::Bool,
            "timestamp" | "time" | "time.Time" | "DateTime" => Self::Timestamp,
            _ => return None,
        };
        Some(kind)
    }
}

/// A field type expression such as `string`, `*Contributor` or
/// `[]*Contributor`.
///
/// Pointer, option and box wrappers are transparent; a list wrapper
/// (`[]T` or `Vec<T>`) marks the field as repeated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct TypeExpr {
    base: String,
    repeated: bool,
}

impl TypeExpr {
    pub fn new(expr: &str) -> Self {
        let mut rest = expr.trim();
        let mut repeated = false;
        loop {
            if let Some(inner) = rest.strip_prefix('*') {
                rest = inner.trim_start();
            } else if let Some(inner) = rest.strip_prefix("[]") {
                repeated = true;
                rest = inner.trim_start();
            } else if let Some(inner) = strip_generic(rest, "Vec") {
                repeated = true;
                rest = inner;
            } else if let Some(inner) =
                strip_generic(rest, "Option").or_else(|| strip_generic(rest, "Box"))
            {
                rest = inner;
            } else {
                break;
            }
        }
        Self {
            base: rest.to_string(),
            repeated,
        }
    }

    /// The innermost type name.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// True for list types.
    pub fn is_repeated(&self) -> bool {
        self.repeated
    }

    /// Scalar kind of the base type, `None` for related types.
    pub fn scalar(&self) -> Option<ScalarKind> {
        ScalarKind::from_name(&self.base)
    }
}

fn strip_generic<'a>(expr: &'a str, wrapper: &str) -> Option<&'a str> {
    expr.strip_prefix(wrapper)?
        .trim_start()
        .strip_prefix('<')?
        .strip_suffix('>')
        .map(str::trim)
}

impl From<String> for TypeExpr {
    fn from(expr: String) -> Self {
        Self::new(&expr)
    }
}

impl From<&str> for TypeExpr {
    fn from(expr: &str) -> Self {
        Self::new(expr)
    }
}

impl From<TypeExpr> for String {
    fn from(expr: TypeExpr) -> Self {
        expr.to_string()
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.repeated {
            write!(f, "[]{}", self.base)
        } else {
            f.write_str(&self.base)
        }
    }
}

/// One field of a resource: its wire (element) name and its type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    #[serde(rename = "name")]
    pub wire_name: String,
    #[serde(rename = "type")]
    pub ty: TypeExpr,
}

impl FieldDescriptor {
    pub fn new(wire_name: impl Into<String>, ty: impl Into<TypeExpr>) -> Self {
        Self {
            wire_name: wire_name.into(),
            ty: ty.into(),
        }
    }
}

/// Schema of one resource type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    /// Type identity used for lookups (filled from the map key when loaded
    /// from a catalog file).
    #[serde(default)]
    pub name: String,
    /// Top level resource group (`foundation`, `scm`, `build`, `workitem`, ...).
    pub resource_group: String,
    /// Element name used when the type is listed on its own; empty for
    /// types that only appear embedded in other objects.
    #[serde(default)]
    pub list_tag: String,
    /// External type identifier (e.g. `com.ibm.team.repository.Contributor`).
    #[serde(default)]
    pub type_id: String,
    /// Whether the shared base fields of the catalog belong to this type.
    #[serde(default = "default_inherit_base")]
    pub inherit_base: bool,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
}

fn default_inherit_base() -> bool {
    true
}

impl ResourceDescriptor {
    pub fn new(
        name: impl Into<String>,
        resource_group: impl Into<String>,
        list_tag: impl Into<String>,
        type_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            resource_group: resource_group.into(),
            list_tag: list_tag.into(),
            type_id: type_id.into(),
            inherit_base: true,
            fields: Vec::new(),
        }
    }

    /// Append a field.
    pub fn with_field(mut self, wire_name: &str, ty: &str) -> Self {
        self.fields.push(FieldDescriptor::new(wire_name, ty));
        self
    }

    /// Do not inherit the catalog base fields.
    pub fn without_base(mut self) -> Self {
        self.inherit_base = false;
        self
    }

    /// True when the type can be requested as a standalone page.
    pub fn is_listable(&self) -> bool {
        !self.list_tag.is_empty()
    }
}

/// Classification of a field against a catalog.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind<'a> {
    /// Plain value coerced from text.
    Scalar(ScalarKind),
    /// Independently addressable related resource, only its id is fetched eagerly.
    Reference(&'a ResourceDescriptor),
    /// Related type without list tag, its data is inlined into the parent.
    Embedded(&'a ResourceDescriptor),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_expr_strips_wrappers() {
        let expr = TypeExpr::new("[]*Contributor");
        assert_eq!(expr.base(), "Contributor");
        assert!(expr.is_repeated());

        let expr = TypeExpr::new("*Iteration");
        assert_eq!(expr.base(), "Iteration");
        assert!(!expr.is_repeated());

        let expr = TypeExpr::new("Vec<Option<Box<Role>>>");
        assert_eq!(expr.base(), "Role");
        assert!(expr.is_repeated());
    }

    #[test]
    fn test_type_expr_display() {
        assert_eq!(TypeExpr::new("[]*Role").to_string(), "[]Role");
        assert_eq!(TypeExpr::new("Option<string>").to_string(), "string");
    }

    #[test]
    fn test_scalar_names() {
        assert_eq!(TypeExpr::new("int64").scalar(), Some(ScalarKind::Int));
        assert_eq!(TypeExpr::new("*time.Time").scalar(), Some(ScalarKind::Timestamp));
        assert_eq!(TypeExpr::new("[]string").scalar(), Some(ScalarKind::String));
        assert_eq!(TypeExpr::new("Contributor").scalar(), None);
    }

    #[test]
    fn test_descriptor_from_json() {
        let descriptor: ResourceDescriptor = serde_json::from_str(
            r#"{"resource_group": "foundation", "fields": [{"name": "parent", "type": "*TeamArea"}]}"#,
        )
        .unwrap();
        assert!(descriptor.inherit_base);
        assert!(!descriptor.is_listable());
        assert_eq!(descriptor.fields[0].ty.base(), "TeamArea");
    }
}
