//! XML rendering of objects, used as request body when saving.

use super::object::{Object, Value};
use crate::error::{Error, Result};
use crate::schema::{Catalog, ResourceDescriptor};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

/// Render an object as an XML document. Zero-valued scalars are left out;
/// references are written as their `itemId`.
pub fn render_xml(catalog: &Catalog, object: &Object) -> Result<String> {
    let descriptor = catalog.lookup(object.type_name())?;
    let root = if descriptor.is_listable() {
        descriptor.list_tag.as_str()
    } else {
        descriptor.name.as_str()
    };

    let mut writer = Writer::new(Vec::new());
    write(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
    )?;
    write(&mut writer, Event::Start(BytesStart::new(root)))?;
    write_fields(catalog, descriptor, object, &mut writer)?;
    write(&mut writer, Event::End(BytesEnd::new(root)))?;

    String::from_utf8(writer.into_inner())
        .map_err(|e| Error::Parse(format!("rendered XML is not UTF-8: {e}")))
}

fn write_fields(
    catalog: &Catalog,
    descriptor: &ResourceDescriptor,
    object: &Object,
    writer: &mut Writer<Vec<u8>>,
) -> Result<()> {
    for field in catalog.fields(descriptor) {
        if let Some(value) = object.get(&field.wire_name) {
            write_value(catalog, &field.wire_name, value, writer)?;
        }
    }
    Ok(())
}

fn write_value(
    catalog: &Catalog,
    name: &str,
    value: &Value,
    writer: &mut Writer<Vec<u8>>,
) -> Result<()> {
    match value {
        Value::List(items) => {
            for item in items {
                write_value(catalog, name, item, writer)?;
            }
        }
        Value::Reference(reference) => {
            write(writer, Event::Start(BytesStart::new(name)))?;
            write_text(writer, "itemId", reference.identifier())?;
            write(writer, Event::End(BytesEnd::new(name)))?;
        }
        Value::Object(nested) => {
            let descriptor = catalog.lookup(nested.type_name())?;
            write(writer, Event::Start(BytesStart::new(name)))?;
            write_fields(catalog, descriptor, nested, writer)?;
            write(writer, Event::End(BytesEnd::new(name)))?;
        }
        scalar if scalar.is_zero() => {}
        scalar => {
            if let Some(text) = scalar.to_text() {
                write_text(writer, name, &text)?;
            }
        }
    }
    Ok(())
}

fn write_text(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<()> {
    write(writer, Event::Start(BytesStart::new(name)))?;
    write(writer, Event::Text(BytesText::new(text)))?;
    write(writer, Event::End(BytesEnd::new(name)))
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| Error::Parse(format!("failed to render XML: {e}")))
}
