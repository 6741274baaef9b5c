//! Live schema reconciliation.
//!
//! Brings a table in line with its type's declared fields: creates it when
//! absent, otherwise adds missing columns and widens incompatible ones in a
//! single `ALTER TABLE`. Columns the type does not declare are left alone.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use super::builder::{add_column_clause, modify_column_clause};
use super::columns::ColumnSnapshot;
use super::compat::is_type_compatible;
use crate::core::connection::{Connection, COLUMNS_QUERY};
use crate::core::identifier::is_reserved_word;
use crate::error::{MapperError, Result};
use crate::registry::CompiledTable;

/// What [`sync_table`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The table did not exist and was created.
    Created,
    /// One `ALTER TABLE` was issued with these clauses.
    Altered { clauses: Vec<String> },
    /// Live columns already match.
    Unchanged,
}

impl SyncOutcome {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, SyncOutcome::Unchanged)
    }
}

/// Reconcile the live table with `table`'s declared fields.
///
/// Holds the table's migration lock throughout, so concurrent calls for the
/// same table run one after another. The live column cache is invalidated
/// after every successful CREATE or ALTER.
pub fn sync_table(conn: &dyn Connection, table: &CompiledTable) -> Result<SyncOutcome> {
    let cache = table.live_columns();
    let guard = cache.lock();
    let name = table.name();

    let live = cache
        .load_or_fetch_locked(&guard, || conn.table_columns(conn.database(), name))
        .map_err(|e| MapperError::schema(name, COLUMNS_QUERY, e))?;

    for column in table.columns() {
        if is_reserved_word(&column.name) {
            warn!(
                "Field '{}' of table {} is a MySQL reserved word; it will be quoted",
                column.name, name
            );
        }
    }

    if live.columns.is_empty() {
        let sql = table.create_table_sql();
        debug!("{}", sql);
        conn.execute(sql, &[])
            .map_err(|e| MapperError::schema(name, sql, e))?;
        cache.invalidate(&guard);
        info!("Created table {}", name);
        return Ok(SyncOutcome::Created);
    }

    let clauses = alter_clauses(table, &live)?;
    if clauses.is_empty() {
        debug!("Table {} is up to date", name);
        return Ok(SyncOutcome::Unchanged);
    }

    let sql = format!("ALTER TABLE {} {}", table.quoted_name(), clauses.join(", "));
    debug!("{}", sql);
    conn.execute(&sql, &[])
        .map_err(|e| MapperError::schema(name, sql.as_str(), e))?;
    cache.invalidate(&guard);
    info!("Altered table {}: {}", name, clauses.join(", "));

    Ok(SyncOutcome::Altered { clauses })
}

/// `ADD COLUMN` / `MODIFY COLUMN` clauses that bring `live` in line with
/// `table`, in field order.
///
/// Live column names match declared names case-insensitively.
pub fn alter_clauses(table: &CompiledTable, live: &ColumnSnapshot) -> Result<Vec<String>> {
    let live_by_name: HashMap<String, &str> = live
        .columns
        .iter()
        .map(|(n, t)| (n.to_ascii_lowercase(), t.as_str()))
        .collect();

    let mut clauses = Vec::new();
    for column in table.columns() {
        match live_by_name.get(&column.name.to_ascii_lowercase()) {
            None => clauses.push(add_column_clause(&column.name, &column.definition)?),
            Some(live_type) if !is_type_compatible(live_type, &column.base) => {
                debug!(
                    "Column {}.{} is {}, need {}",
                    table.name(),
                    column.name,
                    live_type,
                    column.base
                );
                clauses.push(modify_column_clause(&column.name, &column.definition)?);
            }
            Some(_) => {}
        }
    }

    let declared: HashSet<String> = table
        .columns()
        .iter()
        .map(|c| c.name.to_ascii_lowercase())
        .collect();
    for name in live.columns.keys() {
        if !declared.contains(&name.to_ascii_lowercase()) {
            debug!(
                "Column {}.{} is not declared by {}; leaving it",
                table.name(),
                name,
                table.type_name()
            );
        }
    }

    Ok(clauses)
}
