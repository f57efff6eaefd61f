//! Response materializer
//!
//! Turns a parsed response tree into an [`Object`] by walking the fields of
//! a descriptor. Missing or empty elements yield zero values, related
//! resources with a list tag become lazy [`Reference`]s and related
//! resources without one are materialized inline.

mod object;
mod reference;
mod render;
pub mod scalar;

pub use object::{Object, Value};
pub use reference::Reference;
pub use render::render_xml;

use crate::document::Node;
use crate::error::{Error, Result};
use crate::schema::{Catalog, FieldDescriptor, FieldKind, ResourceDescriptor};

/// Materialize `node` as an object of the described type.
pub fn materialize<N: Node>(
    catalog: &Catalog,
    descriptor: &ResourceDescriptor,
    node: &N,
) -> Result<Object> {
    let mut object = Object::new(descriptor.name.as_str());
    for field in catalog.fields(descriptor) {
        let value = materialize_field(catalog, field, node)?;
        object.set(&field.wire_name, value);
    }
    Ok(object)
}

fn materialize_field<N: Node>(catalog: &Catalog, field: &FieldDescriptor, node: &N) -> Result<Value> {
    let kind = catalog.kind_of(field).map_err(|_| Error::Type {
        field: field.wire_name.clone(),
        ty: field.ty.to_string(),
    })?;
    let elements = node.select(&field.wire_name);

    if field.ty.is_repeated() {
        let mut items = Vec::with_capacity(elements.len());
        for element in elements {
            match kind {
                FieldKind::Scalar(scalar) if !element.has_content() => items.push(Value::zero(scalar)),
                _ if !element.has_content() => {}
                // list entries without an id carry nothing to resolve
                _ => match materialize_value(catalog, kind, &field.wire_name, element)? {
                    Value::Null => {}
                    value => items.push(value),
                },
            }
        }
        return Ok(Value::List(items));
    }

    match elements.first() {
        Some(element) if element.has_content() => {
            materialize_value(catalog, kind, &field.wire_name, *element)
        }
        _ => Ok(zero_of(kind)),
    }
}

fn materialize_value<N: Node>(
    catalog: &Catalog,
    kind: FieldKind<'_>,
    field: &str,
    element: &N,
) -> Result<Value> {
    match kind {
        FieldKind::Scalar(scalar) => {
            let text = element.text().ok_or_else(|| {
                Error::Parse(format!("field \"{field}\": expected a value, found a structure"))
            })?;
            scalar::coerce(scalar, field, &text)
        }
        FieldKind::Reference(related) => {
            let id = element
                .select("itemId")
                .into_iter()
                .next()
                .and_then(|e| e.text())
                .filter(|id| !id.trim().is_empty());
            Ok(match id {
                Some(id) => Value::Reference(Reference::new(related.name.as_str(), id.trim())),
                None => Value::Null,
            })
        }
        FieldKind::Embedded(related) => Ok(Value::Object(Box::new(materialize(
            catalog, related, element,
        )?))),
    }
}

fn zero_of(kind: FieldKind<'_>) -> Value {
    match kind {
        FieldKind::Scalar(scalar) => Value::zero(scalar),
        FieldKind::Reference(_) | FieldKind::Embedded(_) => Value::Null,
    }
}
