//! A registered table with its SQL fragments precomputed.

use std::collections::HashMap;

use crate::config::MappingConfig;
use crate::core::descriptor::FieldDescriptor;
use crate::core::identifier::escape_name;
use crate::core::record::Record;
use crate::error::{MapperError, Result};
use crate::schema::{create_table_sql, ColumnCache, TableSchema};
use crate::typemap::TypeMap;

/// One declared column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    /// Field name, unquoted.
    pub name: String,
    /// Field name as it appears in SQL.
    pub quoted: String,
    /// SQL base type (e.g. `MEDIUMTEXT`).
    pub base: String,
    /// Full column definition (e.g. `int NOT NULL DEFAULT 0`).
    pub definition: String,
}

/// A table schema compiled for statement generation.
#[derive(Debug)]
pub struct CompiledTable {
    schema: TableSchema,
    quoted_name: String,
    columns: Vec<ColumnDef>,
    field_index: HashMap<String, usize>,
    field_list: String,
    row_placeholders: String,
    insert_sql: String,
    replace_sql: String,
    select_sql: String,
    create_sql: String,
    batch_insert_max: usize,
    live_columns: ColumnCache,
}

impl CompiledTable {
    pub fn compile(schema: TableSchema, type_map: &TypeMap, mapping: &MappingConfig) -> Result<Self> {
        type_map.check_covers(&schema)?;

        let quoted_name = escape_name(&schema.table_name)?;
        let mut columns = Vec::with_capacity(schema.fields().len());
        let mut field_index = HashMap::with_capacity(schema.fields().len());
        for (i, field) in schema.fields().iter().enumerate() {
            columns.push(ColumnDef {
                name: field.name().to_string(),
                quoted: escape_name(field.name())?,
                base: type_map.base_type(&schema, field)?,
                definition: type_map.column_definition(&schema, field)?,
            });
            field_index.insert(field.name().to_string(), i);
        }

        let field_list = columns
            .iter()
            .map(|c| c.quoted.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let row_placeholders = format!("({})", vec!["?"; columns.len()].join(", "));
        let insert_sql = format!(
            "INSERT INTO {} ({}) VALUES {}",
            quoted_name, field_list, row_placeholders
        );
        let replace_sql = format!(
            "REPLACE INTO {} ({}) VALUES {}",
            quoted_name, field_list, row_placeholders
        );
        let select_sql = format!("SELECT {} FROM {}", field_list, quoted_name);
        let create_sql = create_table_sql(&schema, type_map, mapping)?;

        Ok(Self {
            schema,
            quoted_name,
            columns,
            field_index,
            field_list,
            row_placeholders,
            insert_sql,
            replace_sql,
            select_sql,
            create_sql,
            batch_insert_max: mapping.batch_insert_max,
            live_columns: ColumnCache::new(),
        })
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Table name, unquoted.
    pub fn name(&self) -> &str {
        &self.schema.table_name
    }

    pub fn quoted_name(&self) -> &str {
        &self.quoted_name
    }

    /// Fully qualified name of the mapped type.
    pub fn type_name(&self) -> &str {
        self.schema.type_name()
    }

    /// Declared columns in field order.
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.field_index.get(name).map(|&i| &self.columns[i])
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Result<&FieldDescriptor> {
        self.field_index
            .get(name)
            .map(|&i| &self.schema.fields()[i])
            .ok_or_else(|| MapperError::FieldNotFound {
                owner: format!("table {}", self.name()),
                field: name.to_string(),
            })
    }

    /// Comma-separated quoted column list in field order.
    pub fn field_list(&self) -> &str {
        &self.field_list
    }

    /// `(?, ?, ...)` with one placeholder per column.
    pub fn row_placeholders(&self) -> &str {
        &self.row_placeholders
    }

    pub fn insert_sql(&self) -> &str {
        &self.insert_sql
    }

    pub fn replace_sql(&self) -> &str {
        &self.replace_sql
    }

    pub fn select_sql(&self) -> &str {
        &self.select_sql
    }

    pub fn create_table_sql(&self) -> &str {
        &self.create_sql
    }

    pub fn batch_insert_max(&self) -> usize {
        self.batch_insert_max
    }

    /// The live column cache.
    pub fn live_columns(&self) -> &ColumnCache {
        &self.live_columns
    }

    /// Fail unless `record` is of this table's type.
    pub fn ensure_owns(&self, record: &dyn Record) -> Result<()> {
        if record.type_name() == self.type_name() {
            Ok(())
        } else {
            Err(MapperError::Config(format!(
                "record of type {} used with table {} of type {}",
                record.type_name(),
                self.name(),
                self.type_name()
            )))
        }
    }
}
