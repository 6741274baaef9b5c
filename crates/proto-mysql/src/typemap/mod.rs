//! Type mapping from field kinds to MySQL column types.

use std::collections::{BTreeMap, HashMap};

use crate::core::descriptor::{FieldDescriptor, KindTag};
use crate::error::{MapperError, Result};
use crate::schema::TableSchema;

/// Column type of one kind: base SQL type plus nullability and default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnType {
    /// SQL base type (e.g. `bigint unsigned`).
    pub base: String,

    /// Whether the column is declared `NOT NULL`.
    pub not_null: bool,

    /// Default literal, if any.
    pub default: Option<String>,
}

impl ColumnType {
    /// Nullable column without a default.
    pub fn nullable(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            not_null: false,
            default: None,
        }
    }

    /// `NOT NULL` column without a default.
    pub fn not_null(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            not_null: true,
            default: None,
        }
    }

    /// `NOT NULL DEFAULT <default>` column.
    pub fn not_null_default(base: impl Into<String>, default: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            not_null: true,
            default: Some(default.into()),
        }
    }
}

/// Kind → column type table.
///
/// Built once and shared read-only by every registered table.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeMap {
    entries: HashMap<KindTag, ColumnType>,
}

impl TypeMap {
    /// A map with no entries; registration fails for any kind not added.
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// The standard MySQL mapping.
    pub fn mysql_default() -> Self {
        Self::empty()
            .with(KindTag::Int32, ColumnType::not_null_default("int", "0"))
            .with(KindTag::Uint32, ColumnType::not_null_default("int unsigned", "0"))
            .with(KindTag::Int64, ColumnType::not_null_default("bigint", "0"))
            .with(KindTag::Uint64, ColumnType::not_null_default("bigint unsigned", "0"))
            .with(KindTag::Float, ColumnType::not_null_default("float", "0"))
            .with(KindTag::Double, ColumnType::not_null_default("double", "0"))
            .with(KindTag::Bool, ColumnType::not_null_default("tinyint(1)", "0"))
            .with(KindTag::Enum, ColumnType::not_null_default("int", "0"))
            .with(KindTag::String, ColumnType::nullable("MEDIUMTEXT"))
            .with(KindTag::Bytes, ColumnType::nullable("MEDIUMBLOB"))
            .with(KindTag::Message, ColumnType::nullable("MEDIUMBLOB"))
            .with(KindTag::List, ColumnType::nullable("MEDIUMBLOB"))
            .with(KindTag::Map, ColumnType::nullable("MEDIUMBLOB"))
            .with(KindTag::Timestamp, ColumnType::not_null("DATETIME"))
    }

    /// Set the column type of a kind.
    pub fn with(mut self, tag: KindTag, column: ColumnType) -> Self {
        self.entries.insert(tag, column);
        self
    }

    /// Replace base types from a `kind name → base type` table, keeping each
    /// kind's nullability and default.
    pub fn with_overrides(mut self, overrides: &BTreeMap<String, String>) -> Result<Self> {
        for (kind, base) in overrides {
            let tag: KindTag = kind.parse()?;
            let base = base.trim();
            if base.is_empty() {
                return Err(MapperError::Config(format!(
                    "type override for {} is empty",
                    kind
                )));
            }
            match self.entries.get_mut(&tag) {
                Some(column) => column.base = base.to_string(),
                None => {
                    self.entries.insert(tag, ColumnType::nullable(base));
                }
            }
        }
        Ok(self)
    }

    pub fn get(&self, tag: KindTag) -> Option<&ColumnType> {
        self.entries.get(&tag)
    }

    fn require(&self, tag: KindTag, schema: &TableSchema, field: &str) -> Result<&ColumnType> {
        self.get(tag).ok_or_else(|| MapperError::UnknownKind {
            kind: tag.to_string(),
            context: format!(
                "type map has no column type for field {} of table {}",
                field, schema.table_name
            ),
        })
    }

    /// Check that every field of `schema` has a column type.
    pub fn check_covers(&self, schema: &TableSchema) -> Result<()> {
        for field in schema.fields() {
            self.require(field.kind().tag(), schema, field.name())?;
        }
        Ok(())
    }

    /// Base SQL type of `field`: the table's override if any, else the
    /// kind's entry.
    pub fn base_type(&self, schema: &TableSchema, field: &FieldDescriptor) -> Result<String> {
        let column = self.require(field.kind().tag(), schema, field.name())?;
        Ok(schema
            .column_types
            .get(field.name())
            .cloned()
            .unwrap_or_else(|| column.base.clone()))
    }

    /// Full column definition of `field` in `schema`, e.g.
    /// `bigint unsigned NOT NULL AUTO_INCREMENT`.
    pub fn column_definition(&self, schema: &TableSchema, field: &FieldDescriptor) -> Result<String> {
        let column = self.require(field.kind().tag(), schema, field.name())?;
        let base = self.base_type(schema, field)?;
        let nullable = schema.is_nullable(field.name());
        let auto_increment = schema.is_auto_increment(field.name());

        let mut definition = base;
        if column.not_null && !nullable {
            definition.push_str(" NOT NULL");
        }
        if let Some(default) = &column.default {
            if !nullable && !auto_increment {
                definition.push_str(" DEFAULT ");
                definition.push_str(default);
            }
        }
        if auto_increment {
            definition.push_str(" AUTO_INCREMENT");
        }
        Ok(definition)
    }
}

impl Default for TypeMap {
    fn default() -> Self {
        Self::mysql_default()
    }
}
