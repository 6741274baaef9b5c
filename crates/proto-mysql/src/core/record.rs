//! Runtime values and the `Record` trait.
//!
//! [`Record`] is the reflective surface the mapper needs from a message
//! instance: descriptor access, per-field get/set/has/clear, and the binary
//! encoding. [`DynamicRecord`] implements it for any descriptor. Presence is
//! implicit: a field holding its zero value is unset.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::descriptor::{FieldDescriptor, FieldKind, MessageDescriptor};
use crate::codec::wire;
use crate::error::{MapperError, Result};

/// A field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int32(i32),
    Uint32(u32),
    Int64(i64),
    Uint64(u64),
    Float(f32),
    Double(f64),
    Bool(bool),
    String(String),
    Bytes(Vec<u8>),
    Enum(i32),
    Timestamp(DateTime<Utc>),
    Message(DynamicRecord),
    List(Vec<Value>),
    Map(BTreeMap<MapKey, Value>),
}

impl Value {
    /// The zero value of a kind.
    pub fn zero(kind: &FieldKind) -> Value {
        match kind {
            FieldKind::Int32 => Value::Int32(0),
            FieldKind::Uint32 => Value::Uint32(0),
            FieldKind::Int64 => Value::Int64(0),
            FieldKind::Uint64 => Value::Uint64(0),
            FieldKind::Float => Value::Float(0.0),
            FieldKind::Double => Value::Double(0.0),
            FieldKind::Bool => Value::Bool(false),
            FieldKind::String => Value::String(String::new()),
            FieldKind::Bytes => Value::Bytes(Vec::new()),
            FieldKind::Enum => Value::Enum(0),
            FieldKind::Timestamp => Value::Timestamp(DateTime::<Utc>::default()),
            FieldKind::Message(desc) => Value::Message(DynamicRecord::new(Arc::clone(desc))),
            FieldKind::List(_) => Value::List(Vec::new()),
            FieldKind::Map(_, _) => Value::Map(BTreeMap::new()),
        }
    }

    /// Whether this is its kind's zero value. Zero values are never stored:
    /// setting one clears the field. `-0.0` is not zero.
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Int32(v) | Value::Enum(v) => *v == 0,
            Value::Uint32(v) => *v == 0,
            Value::Int64(v) => *v == 0,
            Value::Uint64(v) => *v == 0,
            Value::Float(v) => v.to_bits() == 0,
            Value::Double(v) => v.to_bits() == 0,
            Value::Bool(v) => !*v,
            Value::String(v) => v.is_empty(),
            Value::Bytes(v) => v.is_empty(),
            Value::Timestamp(ts) => ts.timestamp() == 0 && ts.timestamp_subsec_nanos() == 0,
            Value::Message(record) => record.is_empty(),
            Value::List(items) => items.is_empty(),
            Value::Map(entries) => entries.is_empty(),
        }
    }

    /// Short name of the value's variant, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Int32(_) => "int32",
            Value::Uint32(_) => "uint32",
            Value::Int64(_) => "int64",
            Value::Uint64(_) => "uint64",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Bool(_) => "bool",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Enum(_) => "enum",
            Value::Timestamp(_) => "timestamp",
            Value::Message(_) => "message",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    /// Whether this value can be stored in a field of `kind`.
    pub fn matches(&self, kind: &FieldKind) -> bool {
        match (kind, self) {
            (FieldKind::Int32, Value::Int32(_))
            | (FieldKind::Uint32, Value::Uint32(_))
            | (FieldKind::Int64, Value::Int64(_))
            | (FieldKind::Uint64, Value::Uint64(_))
            | (FieldKind::Float, Value::Float(_))
            | (FieldKind::Double, Value::Double(_))
            | (FieldKind::Bool, Value::Bool(_))
            | (FieldKind::String, Value::String(_))
            | (FieldKind::Bytes, Value::Bytes(_))
            | (FieldKind::Enum, Value::Enum(_))
            | (FieldKind::Timestamp, Value::Timestamp(_)) => true,
            (FieldKind::Message(desc), Value::Message(record)) => {
                record.descriptor().full_name() == desc.full_name()
            }
            (FieldKind::List(elem), Value::List(items)) => items.iter().all(|v| v.matches(elem)),
            (FieldKind::Map(key, value), Value::Map(entries)) => entries
                .iter()
                .all(|(k, v)| k.matches(key) && v.matches(value)),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_message(&self) -> Option<&DynamicRecord> {
        match self {
            Value::Message(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Value::$variant(v)
            }
        })*
    };
}

value_from! {
    i32 => Int32,
    u32 => Uint32,
    i64 => Int64,
    u64 => Uint64,
    f32 => Float,
    f64 => Double,
    bool => Bool,
    String => String,
    Vec<u8> => Bytes,
    DateTime<Utc> => Timestamp,
    DynamicRecord => Message,
    Vec<Value> => List,
    BTreeMap<MapKey, Value> => Map,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

/// A map key. Only integer, bool and string kinds may key a map.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MapKey {
    Int32(i32),
    Uint32(u32),
    Int64(i64),
    Uint64(u64),
    Bool(bool),
    String(String),
}

impl MapKey {
    pub fn matches(&self, kind: &FieldKind) -> bool {
        matches!(
            (kind, self),
            (FieldKind::Int32, MapKey::Int32(_))
                | (FieldKind::Uint32, MapKey::Uint32(_))
                | (FieldKind::Int64, MapKey::Int64(_))
                | (FieldKind::Uint64, MapKey::Uint64(_))
                | (FieldKind::Bool, MapKey::Bool(_))
                | (FieldKind::String, MapKey::String(_))
        )
    }

    pub fn into_value(self) -> Value {
        match self {
            MapKey::Int32(v) => Value::Int32(v),
            MapKey::Uint32(v) => Value::Uint32(v),
            MapKey::Int64(v) => Value::Int64(v),
            MapKey::Uint64(v) => Value::Uint64(v),
            MapKey::Bool(v) => Value::Bool(v),
            MapKey::String(v) => Value::String(v),
        }
    }

    pub fn from_value(value: Value) -> Option<MapKey> {
        match value {
            Value::Int32(v) => Some(MapKey::Int32(v)),
            Value::Uint32(v) => Some(MapKey::Uint32(v)),
            Value::Int64(v) => Some(MapKey::Int64(v)),
            Value::Uint64(v) => Some(MapKey::Uint64(v)),
            Value::Bool(v) => Some(MapKey::Bool(v)),
            Value::String(v) => Some(MapKey::String(v)),
            _ => None,
        }
    }
}

impl From<&str> for MapKey {
    fn from(v: &str) -> Self {
        MapKey::String(v.to_string())
    }
}

impl fmt::Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapKey::Int32(v) => write!(f, "{}", v),
            MapKey::Uint32(v) => write!(f, "{}", v),
            MapKey::Int64(v) => write!(f, "{}", v),
            MapKey::Uint64(v) => write!(f, "{}", v),
            MapKey::Bool(v) => write!(f, "{}", v),
            MapKey::String(v) => f.write_str(v),
        }
    }
}

/// Reflective access to a message instance.
///
/// Field arguments are descriptors taken from [`Record::descriptor`]; a
/// descriptor from another type is treated as an unknown field.
pub trait Record: Send + Sync {
    fn descriptor(&self) -> &Arc<MessageDescriptor>;

    /// Whether the field holds a non-zero value.
    fn has(&self, field: &FieldDescriptor) -> bool;

    /// The field's value, or `None` when unset.
    fn get(&self, field: &FieldDescriptor) -> Option<&Value>;

    /// Store a value, checking it against the field's kind.
    fn set(&mut self, field: &FieldDescriptor, value: Value) -> Result<()>;

    fn clear(&mut self, field: &FieldDescriptor);

    /// Self-describing binary encoding of every present field.
    fn encode(&self) -> Result<Vec<u8>>;

    /// Decode `buf` and merge its fields into this record.
    fn merge(&mut self, buf: &[u8]) -> Result<()>;

    /// Fully qualified type name.
    fn type_name(&self) -> &str {
        self.descriptor().full_name()
    }
}

/// A record backed by a descriptor and one optional slot per field.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicRecord {
    descriptor: Arc<MessageDescriptor>,
    values: Vec<Option<Value>>,
}

impl DynamicRecord {
    /// An empty record: every field unset.
    pub fn new(descriptor: Arc<MessageDescriptor>) -> Self {
        let values = vec![None; descriptor.fields().len()];
        Self { descriptor, values }
    }

    /// Set a field by name, builder style.
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Result<Self> {
        self.set_by_name(name, value)?;
        Ok(self)
    }

    pub fn set_by_name(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let field = self.lookup(name)?.clone();
        self.set(&field, value.into())
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        let field = self.descriptor.field(name)?;
        self.get(field)
    }

    pub fn has_by_name(&self, name: &str) -> bool {
        self.descriptor.field(name).is_some_and(|f| self.has(f))
    }

    pub fn clear_by_name(&mut self, name: &str) -> Result<()> {
        let field = self.lookup(name)?.clone();
        self.clear(&field);
        Ok(())
    }

    /// Whether every field is unset.
    pub fn is_empty(&self) -> bool {
        self.values.iter().all(Option::is_none)
    }

    /// Decode a record of type `descriptor` from its binary encoding.
    pub fn decode(descriptor: Arc<MessageDescriptor>, buf: &[u8]) -> Result<Self> {
        let mut record = Self::new(descriptor);
        record.merge(buf)?;
        Ok(record)
    }

    fn lookup(&self, name: &str) -> Result<&FieldDescriptor> {
        self.descriptor
            .field(name)
            .ok_or_else(|| MapperError::FieldNotFound {
                owner: self.descriptor.full_name().to_string(),
                field: name.to_string(),
            })
    }

    /// Slot index for a field, if it belongs to this record's type.
    fn slot(&self, field: &FieldDescriptor) -> Option<usize> {
        let own = self.descriptor.fields().get(field.ordinal())?;
        (own.name() == field.name()).then_some(field.ordinal())
    }
}

impl Record for DynamicRecord {
    fn descriptor(&self) -> &Arc<MessageDescriptor> {
        &self.descriptor
    }

    fn has(&self, field: &FieldDescriptor) -> bool {
        self.get(field).is_some()
    }

    fn get(&self, field: &FieldDescriptor) -> Option<&Value> {
        let slot = self.slot(field)?;
        self.values[slot].as_ref()
    }

    fn set(&mut self, field: &FieldDescriptor, value: Value) -> Result<()> {
        let slot = self.slot(field).ok_or_else(|| MapperError::FieldNotFound {
            owner: self.descriptor.full_name().to_string(),
            field: field.name().to_string(),
        })?;
        let own = &self.descriptor.fields()[slot];
        if !value.matches(own.kind()) {
            return Err(MapperError::mismatch(
                format!("{}.{}", self.descriptor.full_name(), own.name()),
                own.kind().to_string(),
                value.kind_name(),
            ));
        }
        self.values[slot] = (!value.is_zero()).then_some(value);
        Ok(())
    }

    fn clear(&mut self, field: &FieldDescriptor) {
        if let Some(slot) = self.slot(field) {
            self.values[slot] = None;
        }
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        wire::encode_fields(self, &mut buf)?;
        Ok(buf)
    }

    fn merge(&mut self, buf: &[u8]) -> Result<()> {
        wire::merge_fields(self, buf)
    }
}
