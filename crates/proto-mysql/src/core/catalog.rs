//! Descriptor catalog loaded from YAML.
//!
//! The [`DescriptorCatalog`] holds message descriptors defined in a document
//! instead of in code, together with optional per-message table options.
//! Message fields refer to other messages by fully qualified name; references
//! are resolved when the catalog is built, in any declaration order.
//!
//! # Format
//!
//! ```yaml
//! messages:
//!   - name: shop.Item
//!     fields:
//!       - { name: sku, kind: string }
//!       - { name: qty, kind: int32 }
//!   - name: shop.Order
//!     fields:
//!       - { name: id, kind: uint64 }
//!       - { name: items, kind: list, element: shop.Item }
//!       - { name: attrs, kind: map, key: string, value: int64 }
//!       - { name: placed, kind: timestamp, number: 9 }
//!     table:
//!       primary_key: [id]
//!       auto_increment: id
//! ```
//!
//! `element` and `value` name either a scalar kind or a message type.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::descriptor::{FieldKind, KindTag, MessageDescriptor};
use crate::error::{MapperError, Result};
use crate::schema::TableOptions;

/// Top-level catalog document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub messages: Vec<MessageDef>,
}

/// One message definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDef {
    /// Fully qualified type name.
    pub name: String,

    pub fields: Vec<FieldDef>,

    /// Table options; messages without them are not mapped to a table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<TableOptions>,
}

/// One field definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,

    /// Kind name (`int32`, ..., `message`, `list`, `map`).
    pub kind: String,

    /// Explicit wire number (default: position + 1).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<u32>,

    /// Message type for `kind: message`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Element kind or message type for `kind: list`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<String>,

    /// Key kind for `kind: map`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// Value kind or message type for `kind: map`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Resolved descriptors keyed by fully qualified name.
#[derive(Debug, Clone, Default)]
pub struct DescriptorCatalog {
    descriptors: BTreeMap<String, Arc<MessageDescriptor>>,
    tables: BTreeMap<String, TableOptions>,
}

impl DescriptorCatalog {
    /// Load a catalog from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse a catalog from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let file: CatalogFile = serde_yaml::from_str(yaml)?;
        Self::from_file(file)
    }

    /// Resolve every message definition of `file`.
    pub fn from_file(file: CatalogFile) -> Result<Self> {
        let mut defs = HashMap::with_capacity(file.messages.len());
        for def in &file.messages {
            if defs.insert(def.name.as_str(), def).is_some() {
                return Err(MapperError::Config(format!(
                    "message {} is defined twice",
                    def.name
                )));
            }
        }

        let mut resolver = Resolver {
            defs: &defs,
            resolved: HashMap::new(),
            visiting: Vec::new(),
        };
        let mut catalog = DescriptorCatalog::default();
        for def in &file.messages {
            let descriptor = resolver.resolve(&def.name)?;
            catalog.descriptors.insert(def.name.clone(), descriptor);
            if let Some(options) = &def.table {
                catalog.tables.insert(def.name.clone(), options.clone());
            }
        }
        Ok(catalog)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<MessageDescriptor>> {
        self.descriptors.get(name)
    }

    /// Like [`get`](Self::get), but a missing message is a configuration error.
    pub fn require(&self, name: &str) -> Result<Arc<MessageDescriptor>> {
        self.get(name)
            .cloned()
            .ok_or_else(|| MapperError::Config(format!("message {} is not in the catalog", name)))
    }

    /// Table options declared for `name`.
    pub fn table_options(&self, name: &str) -> Option<&TableOptions> {
        self.tables.get(name)
    }

    /// Messages that declare a table, sorted by name.
    pub fn tables(&self) -> impl Iterator<Item = (&Arc<MessageDescriptor>, &TableOptions)> {
        self.tables
            .iter()
            .filter_map(|(name, options)| self.descriptors.get(name).map(|d| (d, options)))
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

struct Resolver<'a> {
    defs: &'a HashMap<&'a str, &'a MessageDef>,
    resolved: HashMap<String, Arc<MessageDescriptor>>,
    visiting: Vec<String>,
}

impl Resolver<'_> {
    fn resolve(&mut self, name: &str) -> Result<Arc<MessageDescriptor>> {
        if let Some(done) = self.resolved.get(name) {
            return Ok(Arc::clone(done));
        }
        if self.visiting.iter().any(|v| v == name) {
            return Err(MapperError::Config(format!(
                "recursive message types are not supported: {} -> {}",
                self.visiting.join(" -> "),
                name
            )));
        }
        let def = *self.defs.get(name).ok_or_else(|| MapperError::UnknownKind {
            kind: name.to_string(),
            context: "no message with this name in the catalog".to_string(),
        })?;

        self.visiting.push(name.to_string());
        let mut builder = MessageDescriptor::builder(def.name.clone());
        for field in &def.fields {
            let kind = self.field_kind(&def.name, field)?;
            builder = match field.number {
                Some(number) => builder.numbered_field(field.name.clone(), number, kind),
                None => builder.field(field.name.clone(), kind),
            };
        }
        self.visiting.pop();

        let descriptor = builder.build()?;
        self.resolved
            .insert(name.to_string(), Arc::clone(&descriptor));
        Ok(descriptor)
    }

    fn field_kind(&mut self, message: &str, field: &FieldDef) -> Result<FieldKind> {
        let tag: KindTag = field.kind.parse().map_err(|_| MapperError::UnknownKind {
            kind: field.kind.clone(),
            context: format!("field {}.{}", message, field.name),
        })?;

        match tag {
            KindTag::Message => {
                let target = required(message, field, "message", &field.message)?;
                Ok(FieldKind::Message(self.resolve(target)?))
            }
            KindTag::List => {
                let element = required(message, field, "element", &field.element)?;
                Ok(FieldKind::List(Box::new(self.element_kind(element)?)))
            }
            KindTag::Map => {
                let key = required(message, field, "key", &field.key)?;
                let value = required(message, field, "value", &field.value)?;
                let key = key
                    .parse::<KindTag>()
                    .ok()
                    .and_then(KindTag::scalar_kind)
                    .ok_or_else(|| MapperError::UnknownKind {
                        kind: key.to_string(),
                        context: format!("map key of {}.{}", message, field.name),
                    })?;
                Ok(FieldKind::Map(
                    Box::new(key),
                    Box::new(self.element_kind(value)?),
                ))
            }
            scalar => scalar.scalar_kind().ok_or_else(|| MapperError::UnknownKind {
                kind: field.kind.clone(),
                context: format!("field {}.{}", message, field.name),
            }),
        }
    }

    /// A scalar kind name or a message type name.
    fn element_kind(&mut self, name: &str) -> Result<FieldKind> {
        match name.parse::<KindTag>().ok().and_then(KindTag::scalar_kind) {
            Some(kind) => Ok(kind),
            None => Ok(FieldKind::Message(self.resolve(name)?)),
        }
    }
}

fn required<'f>(
    message: &str,
    field: &FieldDef,
    attribute: &str,
    value: &'f Option<String>,
) -> Result<&'f str> {
    value.as_deref().ok_or_else(|| {
        MapperError::Config(format!(
            "field {}.{} of kind {} needs '{}'",
            message, field.name, field.kind, attribute
        ))
    })
}
