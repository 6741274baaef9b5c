//! Message and field descriptors.
//!
//! A [`MessageDescriptor`] names a message type and lists its fields in
//! declaration order. Descriptors are immutable once built and shared as
//! `Arc<MessageDescriptor>`; nested message kinds hold the descriptor of the
//! nested type directly.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{MapperError, Result};

/// Largest field number allowed by the wire format.
pub const MAX_FIELD_NUMBER: u32 = (1 << 29) - 1;

/// The abstract category of a field's value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Int32,
    Uint32,
    Int64,
    Uint64,
    Float,
    Double,
    Bool,
    String,
    Bytes,
    Enum,
    Timestamp,
    Message(Arc<MessageDescriptor>),
    List(Box<FieldKind>),
    Map(Box<FieldKind>, Box<FieldKind>),
}

impl FieldKind {
    /// The payload-free tag of this kind.
    pub fn tag(&self) -> KindTag {
        match self {
            FieldKind::Int32 => KindTag::Int32,
            FieldKind::Uint32 => KindTag::Uint32,
            FieldKind::Int64 => KindTag::Int64,
            FieldKind::Uint64 => KindTag::Uint64,
            FieldKind::Float => KindTag::Float,
            FieldKind::Double => KindTag::Double,
            FieldKind::Bool => KindTag::Bool,
            FieldKind::String => KindTag::String,
            FieldKind::Bytes => KindTag::Bytes,
            FieldKind::Enum => KindTag::Enum,
            FieldKind::Timestamp => KindTag::Timestamp,
            FieldKind::Message(_) => KindTag::Message,
            FieldKind::List(_) => KindTag::List,
            FieldKind::Map(_, _) => KindTag::Map,
        }
    }

    /// Integer kinds usable as auto-increment columns.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            FieldKind::Int32 | FieldKind::Uint32 | FieldKind::Int64 | FieldKind::Uint64
        )
    }

    /// Kinds allowed as map keys.
    pub fn is_map_key(&self) -> bool {
        self.is_integer() || matches!(self, FieldKind::Bool | FieldKind::String)
    }

    /// Kinds allowed as list elements and map values.
    pub fn is_element(&self) -> bool {
        !matches!(self, FieldKind::List(_) | FieldKind::Map(_, _))
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Message(desc) => write!(f, "message {}", desc.full_name()),
            FieldKind::List(elem) => write!(f, "list<{}>", elem),
            FieldKind::Map(key, value) => write!(f, "map<{}, {}>", key, value),
            other => write!(f, "{}", other.tag()),
        }
    }
}

/// Field kind without its nested payload, used as the type map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KindTag {
    Int32,
    Uint32,
    Int64,
    Uint64,
    Float,
    Double,
    Bool,
    String,
    Bytes,
    Enum,
    Timestamp,
    Message,
    List,
    Map,
}

impl KindTag {
    /// Every tag, in declaration order.
    pub const ALL: [KindTag; 14] = [
        KindTag::Int32,
        KindTag::Uint32,
        KindTag::Int64,
        KindTag::Uint64,
        KindTag::Float,
        KindTag::Double,
        KindTag::Bool,
        KindTag::String,
        KindTag::Bytes,
        KindTag::Enum,
        KindTag::Timestamp,
        KindTag::Message,
        KindTag::List,
        KindTag::Map,
    ];

    /// Lowercase name used in configuration files.
    pub fn name(self) -> &'static str {
        match self {
            KindTag::Int32 => "int32",
            KindTag::Uint32 => "uint32",
            KindTag::Int64 => "int64",
            KindTag::Uint64 => "uint64",
            KindTag::Float => "float",
            KindTag::Double => "double",
            KindTag::Bool => "bool",
            KindTag::String => "string",
            KindTag::Bytes => "bytes",
            KindTag::Enum => "enum",
            KindTag::Timestamp => "timestamp",
            KindTag::Message => "message",
            KindTag::List => "list",
            KindTag::Map => "map",
        }
    }

    /// The full kind for tags that carry no payload.
    pub fn scalar_kind(self) -> Option<FieldKind> {
        match self {
            KindTag::Int32 => Some(FieldKind::Int32),
            KindTag::Uint32 => Some(FieldKind::Uint32),
            KindTag::Int64 => Some(FieldKind::Int64),
            KindTag::Uint64 => Some(FieldKind::Uint64),
            KindTag::Float => Some(FieldKind::Float),
            KindTag::Double => Some(FieldKind::Double),
            KindTag::Bool => Some(FieldKind::Bool),
            KindTag::String => Some(FieldKind::String),
            KindTag::Bytes => Some(FieldKind::Bytes),
            KindTag::Enum => Some(FieldKind::Enum),
            KindTag::Timestamp => Some(FieldKind::Timestamp),
            KindTag::Message | KindTag::List | KindTag::Map => None,
        }
    }
}

impl fmt::Display for KindTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for KindTag {
    type Err = MapperError;

    fn from_str(s: &str) -> Result<Self> {
        KindTag::ALL
            .iter()
            .copied()
            .find(|tag| tag.name() == s)
            .ok_or_else(|| MapperError::UnknownKind {
                kind: s.to_string(),
                context: "expected one of int32, uint32, int64, uint64, float, double, \
                          bool, string, bytes, enum, timestamp, message, list, map"
                    .to_string(),
            })
    }
}

/// Metadata for one named, typed field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    name: String,
    ordinal: usize,
    number: u32,
    kind: FieldKind,
}

impl FieldDescriptor {
    /// Field name as declared.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Zero-based declaration index.
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Wire tag used by the binary encoding.
    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn is_list(&self) -> bool {
        matches!(self.kind, FieldKind::List(_))
    }

    pub fn is_map(&self) -> bool {
        matches!(self.kind, FieldKind::Map(_, _))
    }

    /// Descriptor of the nested message for message fields, list-of-message
    /// fields and map-of-message fields.
    pub fn message_type(&self) -> Option<&Arc<MessageDescriptor>> {
        match &self.kind {
            FieldKind::Message(desc) => Some(desc),
            FieldKind::List(elem) | FieldKind::Map(_, elem) => match elem.as_ref() {
                FieldKind::Message(desc) => Some(desc),
                _ => None,
            },
            _ => None,
        }
    }
}

/// A message type: fully qualified name plus fields in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageDescriptor {
    full_name: String,
    fields: Vec<FieldDescriptor>,
}

impl MessageDescriptor {
    /// Start building a descriptor for `full_name` (e.g. `shop.Order`).
    pub fn builder(full_name: impl Into<String>) -> MessageDescriptorBuilder {
        MessageDescriptorBuilder {
            full_name: full_name.into(),
            fields: Vec::new(),
        }
    }

    /// Fully qualified type name.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Last segment of the fully qualified name.
    pub fn name(&self) -> &str {
        self.full_name
            .rsplit('.')
            .next()
            .unwrap_or(self.full_name.as_str())
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_by_number(&self, number: u32) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.number == number)
    }

    /// Fields of list kind, in declaration order.
    pub fn list_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.is_list())
    }
}

/// Builder for [`MessageDescriptor`].
#[derive(Debug, Clone)]
pub struct MessageDescriptorBuilder {
    full_name: String,
    fields: Vec<(String, Option<u32>, FieldKind)>,
}

impl MessageDescriptorBuilder {
    /// Add a field numbered after its position (ordinal + 1).
    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push((name.into(), None, kind));
        self
    }

    /// Add a field with an explicit wire number.
    pub fn numbered_field(mut self, name: impl Into<String>, number: u32, kind: FieldKind) -> Self {
        self.fields.push((name.into(), Some(number), kind));
        self
    }

    pub fn build(self) -> Result<Arc<MessageDescriptor>> {
        let full_name = self.full_name;
        if full_name.is_empty() || full_name.starts_with('.') || full_name.ends_with('.') {
            return Err(MapperError::Config(format!(
                "invalid message type name '{}'",
                full_name
            )));
        }
        if self.fields.is_empty() {
            return Err(MapperError::Config(format!(
                "message {} declares no fields",
                full_name
            )));
        }

        let mut names = HashSet::new();
        let mut numbers = HashSet::new();
        let mut fields = Vec::with_capacity(self.fields.len());

        for (ordinal, (name, number, kind)) in self.fields.into_iter().enumerate() {
            let number = match number {
                Some(n) => n,
                None => u32::try_from(ordinal + 1).map_err(|_| {
                    MapperError::Config(format!("message {} has too many fields", full_name))
                })?,
            };

            if name.is_empty() {
                return Err(MapperError::Config(format!(
                    "message {} has a field with an empty name",
                    full_name
                )));
            }
            if !names.insert(name.clone()) {
                return Err(MapperError::Config(format!(
                    "message {} declares field '{}' twice",
                    full_name, name
                )));
            }
            if number == 0 || number > MAX_FIELD_NUMBER {
                return Err(MapperError::Config(format!(
                    "field {}.{} has out-of-range number {}",
                    full_name, name, number
                )));
            }
            if !numbers.insert(number) {
                return Err(MapperError::Config(format!(
                    "message {} reuses field number {} for '{}'",
                    full_name, number, name
                )));
            }
            validate_kind(&full_name, &name, &kind)?;

            fields.push(FieldDescriptor {
                name,
                ordinal,
                number,
                kind,
            });
        }

        Ok(Arc::new(MessageDescriptor { full_name, fields }))
    }
}

fn validate_kind(message: &str, field: &str, kind: &FieldKind) -> Result<()> {
    match kind {
        FieldKind::List(elem) if !elem.is_element() => Err(MapperError::Config(format!(
            "field {}.{}: list elements cannot be {}",
            message, field, elem
        ))),
        FieldKind::Map(key, _) if !key.is_map_key() => Err(MapperError::Config(format!(
            "field {}.{}: map keys cannot be {}",
            message, field, key
        ))),
        FieldKind::Map(_, value) if !value.is_element() => Err(MapperError::Config(format!(
            "field {}.{}: map values cannot be {}",
            message, field, value
        ))),
        _ => Ok(()),
    }
}
