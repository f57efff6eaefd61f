//! Scalar coercion from wire text

use super::object::Value;
use crate::error::{Error, Result};
use crate::schema::ScalarKind;
use chrono::{DateTime, FixedOffset};

/// Wire format of timestamps (e.g. `2023-01-31T12:30:00.000+0100`).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%z";

/// Coerce the text of a leaf into a value of the given kind.
pub fn coerce(kind: ScalarKind, field: &str, text: &str) -> Result<Value> {
    let value = match kind {
        ScalarKind::String => Value::String(text.to_string()),
        ScalarKind::Int => Value::Int(parse_number(field, text)?),
        ScalarKind::Uint => Value::Uint(parse_number(field, text)?),
        ScalarKind::Float => Value::Float(parse_number(field, text)?),
        ScalarKind::Bool => Value::Bool(parse_bool(field, text)?),
        ScalarKind::Timestamp => Value::Timestamp(parse_timestamp(field, text)?),
    };
    Ok(value)
}

fn parse_number<T>(field: &str, text: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    text.trim()
        .parse()
        .map_err(|e| Error::Parse(format!("field \"{field}\": invalid number \"{text}\": {e}")))
}

fn parse_bool(field: &str, text: &str) -> Result<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "1" => Ok(true),
        "false" | "f" | "0" => Ok(false),
        _ => Err(Error::Parse(format!(
            "field \"{field}\": invalid boolean \"{text}\""
        ))),
    }
}

/// Parse a timestamp in the wire format.
///
/// Exactly three fractional digits and a `±hhmm` offset are required;
/// chrono alone would also take `+hh:mm` offsets.
pub fn parse_timestamp(field: &str, text: &str) -> Result<DateTime<FixedOffset>> {
    let text = text.trim();
    let invalid = |reason: String| Error::TimeParse {
        field: field.to_string(),
        value: text.to_string(),
        reason,
    };

    let parsed =
        DateTime::parse_from_str(text, TIMESTAMP_FORMAT).map_err(|e| invalid(e.to_string()))?;
    if format_timestamp(&parsed) != text {
        return Err(invalid(format!("expected the format {TIMESTAMP_FORMAT}")));
    }
    Ok(parsed)
}

/// Render a timestamp in the wire format.
pub fn format_timestamp(value: &DateTime<FixedOffset>) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}
