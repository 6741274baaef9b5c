//! CREATE TABLE generation.

use super::TableSchema;
use crate::config::MappingConfig;
use crate::core::identifier::escape_name;
use crate::error::Result;
use crate::typemap::TypeMap;

/// Build the CREATE TABLE statement for `schema`.
///
/// The output depends only on its inputs, so repeated calls on an unchanged
/// schema produce identical text.
pub fn create_table_sql(
    schema: &TableSchema,
    type_map: &TypeMap,
    mapping: &MappingConfig,
) -> Result<String> {
    let table = &schema.table_name;
    let mut lines = Vec::with_capacity(schema.fields().len() + schema.indexes.len() + 2);

    for field in schema.fields() {
        lines.push(format!(
            "  {} {}",
            escape_name(field.name())?,
            type_map.column_definition(schema, field)?
        ));
    }

    if !schema.primary_key.is_empty() {
        lines.push(format!("  PRIMARY KEY ({})", column_list(&schema.primary_key)?));
    }

    for (n, group) in schema.indexes.iter().enumerate() {
        lines.push(format!(
            "  INDEX {} ({})",
            escape_name(&format!("idx_{}_{}", table, n))?,
            column_list(group)?
        ));
    }

    if !schema.unique_key.is_empty() {
        lines.push(format!(
            "  UNIQUE KEY {} ({})",
            escape_name(&format!("uk_{}", table))?,
            column_list(&schema.unique_key)?
        ));
    }

    let mut sql = format!(
        "CREATE TABLE IF NOT EXISTS {} (\n{}\n) ENGINE={} DEFAULT CHARSET={} COLLATE={} COMMENT='{}'",
        escape_name(table)?,
        lines.join(",\n"),
        mapping.engine,
        mapping.charset,
        mapping.collation,
        escape_comment(table)
    );

    if let (Some(_), Some(start)) = (&schema.auto_increment, schema.auto_increment_start) {
        sql.push_str(&format!(" AUTO_INCREMENT={}", start));
    }

    Ok(sql)
}

/// `ADD COLUMN` clause for one field.
pub fn add_column_clause(column: &str, definition: &str) -> Result<String> {
    Ok(format!("ADD COLUMN {} {}", escape_name(column)?, definition))
}

/// `MODIFY COLUMN` clause for one field.
pub fn modify_column_clause(column: &str, definition: &str) -> Result<String> {
    Ok(format!("MODIFY COLUMN {} {}", escape_name(column)?, definition))
}

/// Text safe inside a single-quoted table comment. Newlines become spaces.
fn escape_comment(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' | '\r' => out.push(' '),
            other => out.push(other),
        }
    }
    out
}

fn column_list(names: &[String]) -> Result<String> {
    let escaped = names
        .iter()
        .map(|n| escape_name(n))
        .collect::<Result<Vec<_>>>()?;
    Ok(escaped.join(", "))
}
