//! Protobuf wire encoding of records, lists and maps.
//!
//! Records encode each present field under its field number. Lists and maps
//! stored in a single column are encoded as a synthetic container: list
//! elements repeat field 1, map entries repeat field 1 as length-delimited
//! `{1: key, 2: value}` pairs. Timestamps use the `google.protobuf.Timestamp`
//! layout (`seconds = 1`, `nanos = 2`).

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::{Buf, BufMut};
use chrono::{DateTime, Utc};
use prost::encoding::{decode_key, decode_varint, encode_key, encode_varint, WireType};

use crate::core::descriptor::FieldKind;
use crate::core::record::{DynamicRecord, MapKey, Record, Value};
use crate::error::{MapperError, Result};

const CONTAINER_TAG: u32 = 1;
const ENTRY_KEY_TAG: u32 = 1;
const ENTRY_VALUE_TAG: u32 = 2;

/// Encode every present field of `record` into `buf`.
pub fn encode_fields(record: &dyn Record, buf: &mut Vec<u8>) -> Result<()> {
    let descriptor = Arc::clone(record.descriptor());
    for field in descriptor.fields() {
        let Some(value) = record.get(field) else {
            continue;
        };
        match (field.kind(), value) {
            (FieldKind::List(elem), Value::List(items)) => {
                encode_repeated(field.number(), elem, items, buf)?;
            }
            (FieldKind::Map(key, val), Value::Map(entries)) => {
                encode_entries(field.number(), key, val, entries, buf)?;
            }
            (kind, value) => encode_value(field.number(), kind, value, buf)?,
        }
    }
    Ok(())
}

/// Encode list elements as a container with field 1 repeated.
pub fn encode_list(elem: &FieldKind, items: &[Value]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_repeated(CONTAINER_TAG, elem, items, &mut buf)?;
    Ok(buf)
}

/// Encode map entries as a container with field 1 repeated.
pub fn encode_map(
    key: &FieldKind,
    value: &FieldKind,
    entries: &BTreeMap<MapKey, Value>,
) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_entries(CONTAINER_TAG, key, value, entries, &mut buf)?;
    Ok(buf)
}

fn encode_repeated(tag: u32, elem: &FieldKind, items: &[Value], buf: &mut Vec<u8>) -> Result<()> {
    for item in items {
        encode_value(tag, elem, item, buf)?;
    }
    Ok(())
}

fn encode_entries(
    tag: u32,
    key: &FieldKind,
    value: &FieldKind,
    entries: &BTreeMap<MapKey, Value>,
    buf: &mut Vec<u8>,
) -> Result<()> {
    let mut entry = Vec::new();
    for (k, v) in entries {
        entry.clear();
        encode_value(ENTRY_KEY_TAG, key, &k.clone().into_value(), &mut entry)?;
        encode_value(ENTRY_VALUE_TAG, value, v, &mut entry)?;
        put_length_delimited(tag, &entry, buf);
    }
    Ok(())
}

/// Encode a single non-repeated value under `tag`.
pub fn encode_value(tag: u32, kind: &FieldKind, value: &Value, buf: &mut Vec<u8>) -> Result<()> {
    match (kind, value) {
        (FieldKind::Int32, Value::Int32(v)) | (FieldKind::Enum, Value::Enum(v)) => {
            encode_key(tag, WireType::Varint, buf);
            encode_varint(i64::from(*v) as u64, buf);
        }
        (FieldKind::Uint32, Value::Uint32(v)) => {
            encode_key(tag, WireType::Varint, buf);
            encode_varint(u64::from(*v), buf);
        }
        (FieldKind::Int64, Value::Int64(v)) => {
            encode_key(tag, WireType::Varint, buf);
            encode_varint(*v as u64, buf);
        }
        (FieldKind::Uint64, Value::Uint64(v)) => {
            encode_key(tag, WireType::Varint, buf);
            encode_varint(*v, buf);
        }
        (FieldKind::Bool, Value::Bool(v)) => {
            encode_key(tag, WireType::Varint, buf);
            encode_varint(u64::from(*v), buf);
        }
        (FieldKind::Float, Value::Float(v)) => {
            encode_key(tag, WireType::ThirtyTwoBit, buf);
            buf.put_f32_le(*v);
        }
        (FieldKind::Double, Value::Double(v)) => {
            encode_key(tag, WireType::SixtyFourBit, buf);
            buf.put_f64_le(*v);
        }
        (FieldKind::String, Value::String(s)) => put_length_delimited(tag, s.as_bytes(), buf),
        (FieldKind::Bytes, Value::Bytes(b)) => put_length_delimited(tag, b, buf),
        (FieldKind::Message(_), Value::Message(record)) => {
            let inner = record.encode()?;
            put_length_delimited(tag, &inner, buf);
        }
        (FieldKind::Timestamp, Value::Timestamp(ts)) => {
            put_length_delimited(tag, &encode_timestamp(ts), buf);
        }
        (FieldKind::List(_) | FieldKind::Map(_, _), _) => {
            return Err(MapperError::Config(format!(
                "{} cannot be nested inside another repeated value",
                kind
            )));
        }
        (kind, other) => {
            return Err(MapperError::mismatch(
                format!("#{}", tag),
                kind.to_string(),
                other.kind_name(),
            ))
        }
    }
    Ok(())
}

fn put_length_delimited(tag: u32, payload: &[u8], buf: &mut Vec<u8>) {
    encode_key(tag, WireType::LengthDelimited, buf);
    encode_varint(payload.len() as u64, buf);
    buf.put_slice(payload);
}

fn encode_timestamp(ts: &DateTime<Utc>) -> Vec<u8> {
    let mut inner = Vec::new();
    let seconds = ts.timestamp();
    let nanos = ts.timestamp_subsec_nanos();
    if seconds != 0 {
        encode_key(1, WireType::Varint, &mut inner);
        encode_varint(seconds as u64, &mut inner);
    }
    if nanos != 0 {
        encode_key(2, WireType::Varint, &mut inner);
        encode_varint(u64::from(nanos), &mut inner);
    }
    inner
}

/// Decode `buf` and merge its fields into `record`.
///
/// Repeated fields append to what the record already holds; unknown field
/// numbers are skipped.
pub fn merge_fields(record: &mut dyn Record, buf: &[u8]) -> Result<()> {
    let descriptor = Arc::clone(record.descriptor());
    let mut lists: BTreeMap<usize, Vec<Value>> = BTreeMap::new();
    let mut maps: BTreeMap<usize, BTreeMap<MapKey, Value>> = BTreeMap::new();

    let mut buf = buf;
    while buf.has_remaining() {
        let (tag, wire_type) = decode_key(&mut buf).map_err(malformed)?;
        let Some(field) = descriptor.field_by_number(tag) else {
            skip_value(wire_type, &mut buf)?;
            continue;
        };

        match field.kind() {
            FieldKind::List(elem) => {
                let items = lists.entry(field.ordinal()).or_insert_with(|| {
                    match record.get(field) {
                        Some(Value::List(existing)) => existing.clone(),
                        _ => Vec::new(),
                    }
                });
                decode_repeated(elem, wire_type, &mut buf, items)?;
            }
            FieldKind::Map(key, val) => {
                let entries = maps.entry(field.ordinal()).or_insert_with(|| {
                    match record.get(field) {
                        Some(Value::Map(existing)) => existing.clone(),
                        _ => BTreeMap::new(),
                    }
                });
                expect_wire_type(wire_type, WireType::LengthDelimited)?;
                let entry = take_length_delimited(&mut buf)?;
                let (k, v) = decode_entry(key, val, entry)?;
                entries.insert(k, v);
            }
            kind => {
                let value = decode_value(kind, wire_type, &mut buf)?;
                record.set(field, value)?;
            }
        }
    }

    for (ordinal, items) in lists {
        record.set(&descriptor.fields()[ordinal], Value::List(items))?;
    }
    for (ordinal, entries) in maps {
        record.set(&descriptor.fields()[ordinal], Value::Map(entries))?;
    }
    Ok(())
}

/// Decode a list container produced by [`encode_list`].
pub fn decode_list(elem: &FieldKind, buf: &[u8]) -> Result<Vec<Value>> {
    let mut items = Vec::new();
    let mut buf = buf;
    while buf.has_remaining() {
        let (tag, wire_type) = decode_key(&mut buf).map_err(malformed)?;
        if tag == CONTAINER_TAG {
            decode_repeated(elem, wire_type, &mut buf, &mut items)?;
        } else {
            skip_value(wire_type, &mut buf)?;
        }
    }
    Ok(items)
}

/// Decode a map container produced by [`encode_map`].
pub fn decode_map(
    key: &FieldKind,
    value: &FieldKind,
    buf: &[u8],
) -> Result<BTreeMap<MapKey, Value>> {
    let mut entries = BTreeMap::new();
    let mut buf = buf;
    while buf.has_remaining() {
        let (tag, wire_type) = decode_key(&mut buf).map_err(malformed)?;
        if tag == CONTAINER_TAG {
            expect_wire_type(wire_type, WireType::LengthDelimited)?;
            let entry = take_length_delimited(&mut buf)?;
            let (k, v) = decode_entry(key, value, entry)?;
            entries.insert(k, v);
        } else {
            skip_value(wire_type, &mut buf)?;
        }
    }
    Ok(entries)
}

/// Decode one occurrence of a repeated field, accepting packed encoding for
/// numeric elements.
fn decode_repeated(
    elem: &FieldKind,
    wire_type: WireType,
    buf: &mut &[u8],
    items: &mut Vec<Value>,
) -> Result<()> {
    let natural = natural_wire_type(elem);
    if wire_type == WireType::LengthDelimited && natural != WireType::LengthDelimited {
        let mut packed = take_length_delimited(buf)?;
        while packed.has_remaining() {
            items.push(decode_value(elem, natural, &mut packed)?);
        }
    } else {
        items.push(decode_value(elem, wire_type, buf)?);
    }
    Ok(())
}

fn decode_entry(key: &FieldKind, value: &FieldKind, entry: &[u8]) -> Result<(MapKey, Value)> {
    let mut k = None;
    let mut v = None;
    let mut buf = entry;
    while buf.has_remaining() {
        let (tag, wire_type) = decode_key(&mut buf).map_err(malformed)?;
        match tag {
            ENTRY_KEY_TAG => k = Some(decode_value(key, wire_type, &mut buf)?),
            ENTRY_VALUE_TAG => v = Some(decode_value(value, wire_type, &mut buf)?),
            _ => skip_value(wire_type, &mut buf)?,
        }
    }
    let k = MapKey::from_value(k.unwrap_or_else(|| Value::zero(key)))
        .ok_or_else(|| MapperError::MalformedPayload(format!("{} cannot key a map", key)))?;
    Ok((k, v.unwrap_or_else(|| Value::zero(value))))
}

/// Decode a single non-repeated value of `kind`.
pub fn decode_value(kind: &FieldKind, wire_type: WireType, buf: &mut &[u8]) -> Result<Value> {
    let value = match kind {
        FieldKind::Int32 => Value::Int32(take_varint(wire_type, buf)? as i32),
        FieldKind::Enum => Value::Enum(take_varint(wire_type, buf)? as i32),
        FieldKind::Uint32 => Value::Uint32(take_varint(wire_type, buf)? as u32),
        FieldKind::Int64 => Value::Int64(take_varint(wire_type, buf)? as i64),
        FieldKind::Uint64 => Value::Uint64(take_varint(wire_type, buf)?),
        FieldKind::Bool => Value::Bool(take_varint(wire_type, buf)? != 0),
        FieldKind::Float => {
            expect_wire_type(wire_type, WireType::ThirtyTwoBit)?;
            ensure_remaining(buf, 4)?;
            Value::Float(buf.get_f32_le())
        }
        FieldKind::Double => {
            expect_wire_type(wire_type, WireType::SixtyFourBit)?;
            ensure_remaining(buf, 8)?;
            Value::Double(buf.get_f64_le())
        }
        FieldKind::String => {
            expect_wire_type(wire_type, WireType::LengthDelimited)?;
            let raw = take_length_delimited(buf)?;
            let s = std::str::from_utf8(raw)
                .map_err(|e| MapperError::MalformedPayload(format!("invalid UTF-8: {}", e)))?;
            Value::String(s.to_string())
        }
        FieldKind::Bytes => {
            expect_wire_type(wire_type, WireType::LengthDelimited)?;
            Value::Bytes(take_length_delimited(buf)?.to_vec())
        }
        FieldKind::Message(desc) => {
            expect_wire_type(wire_type, WireType::LengthDelimited)?;
            let raw = take_length_delimited(buf)?;
            Value::Message(DynamicRecord::decode(Arc::clone(desc), raw)?)
        }
        FieldKind::Timestamp => {
            expect_wire_type(wire_type, WireType::LengthDelimited)?;
            let raw = take_length_delimited(buf)?;
            Value::Timestamp(decode_timestamp(raw)?)
        }
        FieldKind::List(_) | FieldKind::Map(_, _) => {
            return Err(MapperError::MalformedPayload(format!(
                "{} cannot be nested inside another repeated value",
                kind
            )))
        }
    };
    Ok(value)
}

fn decode_timestamp(raw: &[u8]) -> Result<DateTime<Utc>> {
    let mut seconds: i64 = 0;
    let mut nanos: i64 = 0;
    let mut buf = raw;
    while buf.has_remaining() {
        let (tag, wire_type) = decode_key(&mut buf).map_err(malformed)?;
        match tag {
            1 => seconds = take_varint(wire_type, &mut buf)? as i64,
            2 => nanos = i64::from(take_varint(wire_type, &mut buf)? as i32),
            _ => skip_value(wire_type, &mut buf)?,
        }
    }
    u32::try_from(nanos)
        .ok()
        .and_then(|nanos| DateTime::<Utc>::from_timestamp(seconds, nanos))
        .ok_or_else(|| {
            MapperError::MalformedPayload(format!(
                "timestamp out of range: {}s {}ns",
                seconds, nanos
            ))
        })
}

fn natural_wire_type(kind: &FieldKind) -> WireType {
    match kind {
        FieldKind::Int32
        | FieldKind::Uint32
        | FieldKind::Int64
        | FieldKind::Uint64
        | FieldKind::Bool
        | FieldKind::Enum => WireType::Varint,
        FieldKind::Float => WireType::ThirtyTwoBit,
        FieldKind::Double => WireType::SixtyFourBit,
        FieldKind::String
        | FieldKind::Bytes
        | FieldKind::Timestamp
        | FieldKind::Message(_)
        | FieldKind::List(_)
        | FieldKind::Map(_, _) => WireType::LengthDelimited,
    }
}

fn take_varint(wire_type: WireType, buf: &mut &[u8]) -> Result<u64> {
    expect_wire_type(wire_type, WireType::Varint)?;
    decode_varint(buf).map_err(malformed)
}

fn take_length_delimited<'a>(buf: &mut &'a [u8]) -> Result<&'a [u8]> {
    let len = decode_varint(buf).map_err(malformed)?;
    let len = usize::try_from(len)
        .ok()
        .filter(|len| *len <= buf.len())
        .ok_or_else(|| {
            MapperError::MalformedPayload(format!(
                "length {} exceeds remaining {} bytes",
                len,
                buf.len()
            ))
        })?;
    let remaining: &'a [u8] = buf;
    let (head, tail) = remaining.split_at(len);
    *buf = tail;
    Ok(head)
}

fn skip_value(wire_type: WireType, buf: &mut &[u8]) -> Result<()> {
    match wire_type {
        WireType::Varint => {
            decode_varint(buf).map_err(malformed)?;
        }
        WireType::SixtyFourBit => {
            ensure_remaining(buf, 8)?;
            buf.advance(8);
        }
        WireType::ThirtyTwoBit => {
            ensure_remaining(buf, 4)?;
            buf.advance(4);
        }
        WireType::LengthDelimited => {
            take_length_delimited(buf)?;
        }
        WireType::StartGroup | WireType::EndGroup => {
            return Err(MapperError::MalformedPayload(
                "group encoding is not supported".to_string(),
            ))
        }
    }
    Ok(())
}

fn expect_wire_type(actual: WireType, expected: WireType) -> Result<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(MapperError::MalformedPayload(format!(
            "expected wire type {:?}, got {:?}",
            expected, actual
        )))
    }
}

fn ensure_remaining(buf: &[u8], needed: usize) -> Result<()> {
    if buf.len() < needed {
        return Err(MapperError::MalformedPayload(format!(
            "need {} bytes, {} remaining",
            needed,
            buf.len()
        )));
    }
    Ok(())
}

fn malformed(err: prost::DecodeError) -> MapperError {
    MapperError::MalformedPayload(err.to_string())
}
