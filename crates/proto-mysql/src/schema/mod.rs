//! Table schemas derived from message descriptors.
//!
//! - [`TableOptions`]: what the caller configures per type
//! - [`TableSchema`]: options validated against a descriptor
//! - [`builder`]: CREATE TABLE generation
//! - [`sync`]: live schema reconciliation
//! - [`columns`]: the per-table live column cache

pub mod builder;
pub mod columns;
pub mod compat;
pub mod sync;

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::descriptor::{FieldDescriptor, FieldKind, MessageDescriptor};
use crate::core::identifier::validate_identifier;
use crate::error::{MapperError, Result};

pub use builder::create_table_sql;
pub use columns::{ColumnCache, ColumnSnapshot};
pub use sync::{sync_table, SyncOutcome};

/// Per-type table configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableOptions {
    /// Table name (default: the type's full name with `.` replaced by `_`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,

    /// Primary key field names, in key order.
    pub primary_key: Vec<String>,

    /// Secondary index column groups.
    pub indexes: Vec<Vec<String>>,

    /// Unique key column group.
    pub unique_key: Vec<String>,

    /// Auto-increment field name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_increment: Option<String>,

    /// First auto-increment value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_increment_start: Option<u64>,

    /// Fields stored as nullable columns.
    pub nullable: Vec<String>,

    /// Per-field column type overrides (field → SQL base type).
    pub column_types: BTreeMap<String, String>,
}

impl TableOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table_name(mut self, name: impl Into<String>) -> Self {
        self.table_name = Some(name.into());
        self
    }

    pub fn with_primary_key<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_index<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.indexes.push(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_unique_key<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unique_key = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_auto_increment(mut self, field: impl Into<String>) -> Self {
        self.auto_increment = Some(field.into());
        self
    }

    pub fn with_auto_increment_start(mut self, start: u64) -> Self {
        self.auto_increment_start = Some(start);
        self
    }

    pub fn with_nullable<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.nullable.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn with_column_type(mut self, field: impl Into<String>, sql_type: impl Into<String>) -> Self {
        self.column_types.insert(field.into(), sql_type.into());
        self
    }
}

/// Default table name for a fully qualified type name.
pub fn default_table_name(full_name: &str) -> String {
    full_name.replace('.', "_")
}

/// A message type bound to a table, with options validated.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    pub table_name: String,
    pub descriptor: Arc<MessageDescriptor>,
    pub primary_key: Vec<String>,
    pub indexes: Vec<Vec<String>>,
    pub unique_key: Vec<String>,
    pub auto_increment: Option<String>,
    pub auto_increment_start: Option<u64>,
    pub nullable: BTreeSet<String>,
    pub column_types: BTreeMap<String, String>,
}

impl TableSchema {
    /// Validate `options` against `descriptor`.
    pub fn new(descriptor: Arc<MessageDescriptor>, options: TableOptions) -> Result<Self> {
        let table_name = options
            .table_name
            .unwrap_or_else(|| default_table_name(descriptor.full_name()));
        validate_identifier(&table_name)?;
        for field in descriptor.fields() {
            validate_identifier(field.name())?;
        }

        let schema = TableSchema {
            table_name,
            descriptor,
            primary_key: options.primary_key,
            indexes: options.indexes,
            unique_key: options.unique_key,
            auto_increment: options.auto_increment,
            auto_increment_start: options.auto_increment_start,
            nullable: options.nullable.into_iter().collect(),
            column_types: options.column_types,
        };
        schema.validate()?;
        Ok(schema)
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for key in &self.primary_key {
            let field = self.require(key)?;
            if !seen.insert(key.as_str()) {
                return Err(MapperError::Config(format!(
                    "table {}: primary key repeats field '{}'",
                    self.table_name, key
                )));
            }
            if field.is_list() || field.is_map() {
                return Err(MapperError::Config(format!(
                    "table {}: repeated field '{}' cannot be part of the primary key",
                    self.table_name, key
                )));
            }
            if self.nullable.contains(key) {
                return Err(MapperError::Config(format!(
                    "table {}: primary key field '{}' cannot be nullable",
                    self.table_name, key
                )));
            }
        }

        for group in &self.indexes {
            if group.is_empty() {
                return Err(MapperError::Config(format!(
                    "table {}: index with no columns",
                    self.table_name
                )));
            }
            for name in group {
                self.require(name)?;
            }
        }
        for name in &self.unique_key {
            self.require(name)?;
        }
        for name in &self.nullable {
            self.require(name)?;
        }
        for (name, sql_type) in &self.column_types {
            self.require(name)?;
            if sql_type.trim().is_empty() {
                return Err(MapperError::Config(format!(
                    "table {}: empty column type override for '{}'",
                    self.table_name, name
                )));
            }
        }

        if let Some(name) = &self.auto_increment {
            let field = self.require(name)?;
            if !field.kind().is_integer() {
                return Err(MapperError::Config(format!(
                    "table {}: auto-increment field '{}' must be an integer, not {}",
                    self.table_name,
                    name,
                    field.kind()
                )));
            }
        } else if self.auto_increment_start.is_some() {
            return Err(MapperError::Config(format!(
                "table {}: auto_increment_start without an auto-increment field",
                self.table_name
            )));
        }

        Ok(())
    }

    fn require(&self, name: &str) -> Result<&FieldDescriptor> {
        self.descriptor
            .field(name)
            .ok_or_else(|| MapperError::FieldNotFound {
                owner: format!("table {}", self.table_name),
                field: name.to_string(),
            })
    }

    /// Fully qualified name of the mapped type.
    pub fn type_name(&self) -> &str {
        self.descriptor.full_name()
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        self.descriptor.fields()
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.descriptor.field(name)
    }

    pub fn is_nullable(&self, name: &str) -> bool {
        self.nullable.contains(name)
    }

    pub fn is_auto_increment(&self, name: &str) -> bool {
        self.auto_increment.as_deref() == Some(name)
    }

    pub fn is_primary_key(&self, name: &str) -> bool {
        self.primary_key.iter().any(|k| k == name)
    }

    /// Descriptors of the primary key fields, in key order.
    pub fn key_fields(&self) -> Vec<&FieldDescriptor> {
        self.primary_key
            .iter()
            .filter_map(|name| self.descriptor.field(name))
            .collect()
    }

    /// Whether an unset value of `field` should be stored as NULL.
    pub fn binds_null_when_unset(&self, field: &FieldDescriptor) -> bool {
        matches!(field.kind(), FieldKind::Timestamp) && self.is_nullable(field.name())
    }
}
