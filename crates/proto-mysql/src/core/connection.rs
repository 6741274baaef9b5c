//! The database collaborator.

use std::collections::BTreeMap;

use super::value::{ResultSet, SqlValue};
use crate::error::{MapperError, Result};

/// Catalog query listing a table's columns and their full SQL types.
pub const COLUMNS_QUERY: &str = "SELECT COLUMN_NAME, COLUMN_TYPE FROM INFORMATION_SCHEMA.COLUMNS \
     WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? ORDER BY ORDINAL_POSITION";

/// A synchronous connection to a MySQL-compatible database.
///
/// Implementations own pooling and thread safety; every method may be called
/// concurrently from several threads.
pub trait Connection: Send + Sync {
    /// Name of the database (schema) tables are created in.
    fn database(&self) -> &str;

    /// Execute a statement with positional arguments, returning affected rows.
    fn execute(&self, sql: &str, args: &[SqlValue<'_>]) -> Result<u64>;

    /// Run a query with positional arguments.
    fn query(&self, sql: &str, args: &[SqlValue<'_>]) -> Result<ResultSet>;

    /// Live columns of `schema.table` as name → full column type
    /// (e.g. `int unsigned`). Empty when the table does not exist.
    fn table_columns(&self, schema: &str, table: &str) -> Result<BTreeMap<String, String>> {
        let rs = self.query(COLUMNS_QUERY, &[SqlValue::from(schema), SqlValue::from(table)])?;

        let mut columns = BTreeMap::new();
        for index in 0..rs.len() {
            let (Some(name), Some(sql_type)) = (rs.text(index, 0), rs.text(index, 1)) else {
                return Err(MapperError::Database(format!(
                    "unexpected catalog row for {}.{}",
                    schema, table
                )));
            };
            columns.insert(name.to_string(), sql_type.to_string());
        }
        Ok(columns)
    }
}
