//! Field codec: one field value to and from its column representation.
//!
//! | kind | column value |
//! |------|--------------|
//! | integers, enum | decimal text |
//! | float, double | shortest text that parses back to the same value |
//! | bool | `1` / `0` |
//! | string | the text |
//! | bytes | escaped bytes |
//! | message, list, map | escaped wire encoding, empty when unset |
//! | timestamp | `YYYY-MM-DD HH:MM:SS` UTC, empty when unset |
//!
//! Deserialization is the exact inverse and runs column-by-column in
//! declared field order.

pub mod escape;
pub mod wire;

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::core::descriptor::{FieldDescriptor, FieldKind};
use crate::core::record::{DynamicRecord, Record, Value};
use crate::core::value::SqlValue;
use crate::error::{MapperError, Result};

pub use escape::{escape_bytes, unescape_bytes};

/// Column format of timestamp values.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Serialize one field of `record` into a statement argument.
///
/// Unset scalar fields serialize as the kind's zero value. NaN and infinite
/// floats are rejected.
pub fn serialize_field(record: &dyn Record, field: &FieldDescriptor) -> Result<SqlValue<'static>> {
    let value = record.get(field);
    let mismatch = |other: &Value| {
        MapperError::mismatch(
            qualified(record, field),
            field.kind().to_string(),
            other.kind_name(),
        )
    };

    let encoded = match field.kind() {
        FieldKind::Int32
        | FieldKind::Uint32
        | FieldKind::Int64
        | FieldKind::Uint64
        | FieldKind::Float
        | FieldKind::Double
        | FieldKind::Bool
        | FieldKind::Enum
        | FieldKind::String => {
            let zero;
            let value = match value {
                Some(v) => v,
                None => {
                    zero = Value::zero(field.kind());
                    &zero
                }
            };
            if !value.matches(field.kind()) {
                return Err(mismatch(value));
            }
            if let Some(text) = non_finite(value) {
                return Err(MapperError::codec(
                    record.type_name(),
                    field.name(),
                    text.as_bytes(),
                    "non-finite float cannot be stored",
                ));
            }
            SqlValue::text_owned(scalar_text(value).ok_or_else(|| mismatch(value))?)
        }
        FieldKind::Bytes => match value {
            None => SqlValue::bytes_owned(Vec::new()),
            Some(Value::Bytes(b)) => SqlValue::bytes_owned(escape_bytes(b)),
            Some(other) => return Err(mismatch(other)),
        },
        FieldKind::Message(_) => match value {
            None => SqlValue::bytes_owned(Vec::new()),
            Some(Value::Message(m)) => SqlValue::bytes_owned(escape_bytes(&m.encode()?)),
            Some(other) => return Err(mismatch(other)),
        },
        FieldKind::List(elem) => match value {
            None => SqlValue::bytes_owned(Vec::new()),
            Some(Value::List(items)) => {
                SqlValue::bytes_owned(escape_bytes(&wire::encode_list(elem, items)?))
            }
            Some(other) => return Err(mismatch(other)),
        },
        FieldKind::Map(key, val) => match value {
            None => SqlValue::bytes_owned(Vec::new()),
            Some(Value::Map(entries)) => {
                SqlValue::bytes_owned(escape_bytes(&wire::encode_map(key, val, entries)?))
            }
            Some(other) => return Err(mismatch(other)),
        },
        FieldKind::Timestamp => match value {
            None => SqlValue::text_owned(String::new()),
            Some(Value::Timestamp(ts)) => SqlValue::text_owned(format_timestamp(ts)),
            Some(other) => return Err(mismatch(other)),
        },
    };
    Ok(encoded)
}

/// Decimal / literal text of a scalar value.
fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::Int32(v) | Value::Enum(v) => v.to_string(),
        Value::Uint32(v) => v.to_string(),
        Value::Int64(v) => v.to_string(),
        Value::Uint64(v) => v.to_string(),
        Value::Float(v) => v.to_string(),
        Value::Double(v) => v.to_string(),
        Value::Bool(v) => if *v { "1" } else { "0" }.to_string(),
        Value::String(s) => s.clone(),
        Value::Bytes(_)
        | Value::Timestamp(_)
        | Value::Message(_)
        | Value::List(_)
        | Value::Map(_) => return None,
    };
    Some(text)
}

/// Text of a NaN or infinite float, which no numeric column accepts.
fn non_finite(value: &Value) -> Option<String> {
    match value {
        Value::Float(v) if !v.is_finite() => Some(v.to_string()),
        Value::Double(v) if !v.is_finite() => Some(v.to_string()),
        _ => None,
    }
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse `YYYY-MM-DD HH:MM:SS[.fraction]` or `YYYY-MM-DD` as UTC.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;
    Some(Utc.from_utc_datetime(&naive))
}

/// Apply row columns to `record` in declared field order.
///
/// Extra columns are ignored; a short row stops at its last column. Fields
/// applied before a failing column stay set.
pub fn deserialize_row(row: &[Option<Vec<u8>>], record: &mut dyn Record) -> Result<()> {
    let descriptor = Arc::clone(record.descriptor());
    for field in descriptor.fields() {
        let Some(raw) = row.get(field.ordinal()) else {
            break;
        };
        deserialize_field(record, field, raw.as_deref())?;
    }
    Ok(())
}

/// Decode one column value into `field` of `record`. `None` is SQL NULL.
pub fn deserialize_field(
    record: &mut dyn Record,
    field: &FieldDescriptor,
    raw: Option<&[u8]>,
) -> Result<()> {
    let raw = raw.unwrap_or(&[]);
    let fail = |record: &dyn Record, message: String| {
        MapperError::codec(record.type_name(), field.name(), raw, message)
    };

    let value = match field.kind() {
        FieldKind::Int32
        | FieldKind::Uint32
        | FieldKind::Int64
        | FieldKind::Uint64
        | FieldKind::Float
        | FieldKind::Double
        | FieldKind::Bool
        | FieldKind::Enum => {
            let text = std::str::from_utf8(raw).map_err(|e| fail(record, e.to_string()))?;
            if text.is_empty() {
                Value::zero(field.kind())
            } else {
                parse_scalar(field.kind(), text).map_err(|message| fail(record, message))?
            }
        }
        FieldKind::String => match std::str::from_utf8(raw) {
            Ok(text) => Value::String(text.to_string()),
            Err(e) => return Err(fail(record, e.to_string())),
        },
        FieldKind::Bytes => {
            if raw.is_empty() {
                record.clear(field);
                return Ok(());
            }
            Value::Bytes(unescape_bytes(raw).map_err(|e| fail(record, e.to_string()))?)
        }
        FieldKind::Message(desc) => {
            if raw.is_empty() {
                record.clear(field);
                return Ok(());
            }
            let decoded = unescape_bytes(raw)
                .and_then(|bytes| DynamicRecord::decode(Arc::clone(desc), &bytes))
                .map_err(|e| fail(record, e.to_string()))?;
            Value::Message(decoded)
        }
        FieldKind::List(elem) => {
            if raw.is_empty() {
                record.clear(field);
                return Ok(());
            }
            let items = unescape_bytes(raw)
                .and_then(|bytes| wire::decode_list(elem, &bytes))
                .map_err(|e| fail(record, e.to_string()))?;
            Value::List(items)
        }
        FieldKind::Map(key, val) => {
            if raw.is_empty() {
                record.clear(field);
                return Ok(());
            }
            let entries = unescape_bytes(raw)
                .and_then(|bytes| wire::decode_map(key, val, &bytes))
                .map_err(|e| fail(record, e.to_string()))?;
            Value::Map(entries)
        }
        FieldKind::Timestamp => {
            let text = std::str::from_utf8(raw).map_err(|e| fail(record, e.to_string()))?;
            if text.is_empty() {
                record.clear(field);
                return Ok(());
            }
            let ts = parse_timestamp(text)
                .ok_or_else(|| fail(record, "expected YYYY-MM-DD HH:MM:SS".to_string()))?;
            Value::Timestamp(ts)
        }
    };
    record.set(field, value)
}

fn parse_scalar(kind: &FieldKind, text: &str) -> std::result::Result<Value, String> {
    let value = match kind {
        FieldKind::Int32 => Value::Int32(text.parse().map_err(|e| format!("{}", e))?),
        FieldKind::Uint32 => Value::Uint32(text.parse().map_err(|e| format!("{}", e))?),
        FieldKind::Int64 => Value::Int64(text.parse().map_err(|e| format!("{}", e))?),
        FieldKind::Uint64 => Value::Uint64(text.parse().map_err(|e| format!("{}", e))?),
        FieldKind::Enum => Value::Enum(text.parse().map_err(|e| format!("{}", e))?),
        FieldKind::Float => Value::Float(text.parse().map_err(|e| format!("{}", e))?),
        FieldKind::Double => Value::Double(text.parse().map_err(|e| format!("{}", e))?),
        FieldKind::Bool => match text {
            "1" => Value::Bool(true),
            "0" => Value::Bool(false),
            t if t.eq_ignore_ascii_case("true") => Value::Bool(true),
            t if t.eq_ignore_ascii_case("false") => Value::Bool(false),
            _ => return Err("expected 1, 0, true or false".to_string()),
        },
        other => return Err(format!("{} is not a scalar kind", other)),
    };
    Ok(value)
}

fn qualified(record: &dyn Record, field: &FieldDescriptor) -> String {
    format!("{}.{}", record.type_name(), field.name())
}
