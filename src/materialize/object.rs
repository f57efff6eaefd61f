//! Materialized objects and field values

use super::reference::Reference;
use super::scalar::format_timestamp;
use crate::error::Result;
use crate::schema::ScalarKind;
use chrono::{DateTime, FixedOffset};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::fmt;

/// Value of one field of an [`Object`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent timestamp or related object.
    Null,
    Int(i64),
    Uint(u64),
    Float(f64),
    Bool(bool),
    String(String),
    Timestamp(DateTime<FixedOffset>),
    /// Independently addressable resource, loaded on demand.
    Reference(Reference),
    /// Inlined resource without list tag.
    Object(Box<Object>),
    List(Vec<Value>),
}

impl Value {
    /// Zero value of a scalar kind, used for missing and empty elements.
    pub fn zero(kind: ScalarKind) -> Self {
        match kind {
            ScalarKind::String => Value::String(String::new()),
            ScalarKind::Int => Value::Int(0),
            ScalarKind::Uint => Value::Uint(0),
            ScalarKind::Float => Value::Float(0.0),
            ScalarKind::Bool => Value::Bool(false),
            ScalarKind::Timestamp => Value::Null,
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Int(v) => *v == 0,
            Value::Uint(v) => *v == 0,
            Value::Float(v) => *v == 0.0,
            Value::Bool(v) => !v,
            Value::String(v) => v.is_empty(),
            Value::List(items) => items.is_empty(),
            Value::Timestamp(_) | Value::Reference(_) | Value::Object(_) => false,
        }
    }

    /// Wire text of a scalar or the id of a reference.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::Int(v) => Some(v.to_string()),
            Value::Uint(v) => Some(v.to_string()),
            Value::Float(v) => Some(v.to_string()),
            Value::Bool(v) => Some(v.to_string()),
            Value::String(v) => Some(v.clone()),
            Value::Timestamp(v) => Some(format_timestamp(v)),
            Value::Reference(r) => Some(r.identifier().to_string()),
            Value::Null | Value::Object(_) | Value::List(_) => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Int(v) => json!(v),
            Value::Uint(v) => json!(v),
            Value::Float(v) => json!(v),
            Value::Bool(v) => json!(v),
            Value::String(v) => json!(v),
            Value::Timestamp(v) => json!(v.to_rfc3339()),
            Value::Reference(r) => json!({ "itemId": r.identifier() }),
            Value::Object(o) => o.to_json(),
            Value::List(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
        }
    }
}

/// A resource materialized from a response document.
///
/// Fields keep the order of the descriptor they were materialized with.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    type_name: String,
    fields: Vec<(String, Value)>,
}

impl Object {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
        }
    }

    /// Builder style [`Object::set`].
    pub fn with(mut self, name: &str, value: Value) -> Self {
        self.set(name, value);
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The `itemId` field, empty if the object has none.
    pub fn item_id(&self) -> &str {
        self.str("itemId").unwrap_or_default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Set a field, replacing an existing value in place.
    pub fn set(&mut self, name: &str, value: Value) {
        match self.fields.iter_mut().find(|(k, _)| k == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name.to_string(), value)),
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            Value::Int(v) => Some(*v),
            Value::Uint(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn float(&self, name: &str) -> Option<f64> {
        match self.get(name)? {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn timestamp(&self, name: &str) -> Option<&DateTime<FixedOffset>> {
        match self.get(name)? {
            Value::Timestamp(v) => Some(v),
            _ => None,
        }
    }

    pub fn reference(&self, name: &str) -> Option<&Reference> {
        match self.get(name)? {
            Value::Reference(r) => Some(r),
            _ => None,
        }
    }

    pub fn object(&self, name: &str) -> Option<&Object> {
        match self.get(name)? {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Items of a repeated field, empty when the field is missing.
    pub fn list(&self, name: &str) -> &[Value] {
        match self.get(name) {
            Some(Value::List(items)) => items,
            _ => &[],
        }
    }

    /// Every reference held by this object, including those inside lists
    /// and embedded objects, in field order.
    pub fn references(&self) -> Vec<&Reference> {
        fn collect<'a>(value: &'a Value, out: &mut Vec<&'a Reference>) {
            match value {
                Value::Reference(r) => out.push(r),
                Value::List(items) => items.iter().for_each(|v| collect(v, out)),
                Value::Object(o) => o.fields.iter().for_each(|(_, v)| collect(v, out)),
                _ => {}
            }
        }

        let mut out = Vec::new();
        for (_, value) in &self.fields {
            collect(value, &mut out);
        }
        out
    }

    /// JSON view of the object (references as `{"itemId": ...}`,
    /// timestamps in RFC 3339).
    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        serde_json::Value::Object(map)
    }

    /// Decode into a typed struct through its serde representation.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.to_json())?)
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.item_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    fn contributor() -> Object {
        Object::new("Contributor")
            .with("itemId", Value::String("_a1".to_string()))
            .with("name", Value::String("Jane".to_string()))
            .with("archived", Value::Bool(false))
            .with("modifiedBy", Value::Reference(Reference::new("Contributor", "_root")))
    }

    #[test]
    fn test_accessors() {
        let object = contributor();
        assert_eq!(object.item_id(), "_a1");
        assert_eq!(object.to_string(), "_a1");
        assert_eq!(object.str("name"), Some("Jane"));
        assert_eq!(object.bool("archived"), Some(false));
        assert_eq!(object.reference("modifiedBy").unwrap().identifier(), "_root");
        assert!(object.list("teamMembers").is_empty());
    }

    #[test]
    fn test_set_keeps_order() {
        let mut object = contributor();
        object.set("itemId", Value::String("_b2".to_string()));
        let names: Vec<&str> = object.fields().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["itemId", "name", "archived", "modifiedBy"]);
        assert_eq!(object.item_id(), "_b2");
    }

    #[test]
    fn test_references_are_collected_recursively() {
        let nested = Object::new("RoleAssignment")
            .with("contributor", Value::Reference(Reference::new("Contributor", "_c")));
        let object = contributor()
            .with(
                "teamMembers",
                Value::List(vec![Value::Reference(Reference::new("Contributor", "_m"))]),
            )
            .with("roleAssignments", Value::List(vec![Value::Object(Box::new(nested))]));
        let ids: Vec<&str> = object.references().iter().map(|r| r.identifier()).collect();
        assert_eq!(ids, vec!["_root", "_m", "_c"]);
    }

    #[test]
    fn test_decode_typed() {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Person {
            item_id: String,
            name: String,
            modified_by: serde_json::Value,
        }

        let person: Person = contributor().decode().unwrap();
        assert_eq!(person.item_id, "_a1");
        assert_eq!(person.name, "Jane");
        assert_eq!(person.modified_by["itemId"], "_root");
    }

    #[test]
    fn test_zero_values() {
        assert!(Value::zero(ScalarKind::Int).is_zero());
        assert!(Value::zero(ScalarKind::String).is_zero());
        assert_eq!(Value::zero(ScalarKind::Timestamp), Value::Null);
        assert!(!Value::Reference(Reference::new("Contributor", "_x")).is_zero());
    }
}
