//! Parameterized statement generation.
//!
//! Every builder returns the statement text together with its positional
//! arguments. Placeholders (`?`) correspond one to one, left to right, to
//! the arguments; record values never appear in the SQL text.

use tracing::warn;

use crate::codec::serialize_field;
use crate::core::descriptor::FieldDescriptor;
use crate::core::identifier::escape_name;
use crate::core::record::Record;
use crate::core::value::SqlValue;
use crate::error::{MapperError, Result};
use crate::registry::CompiledTable;

/// A statement and its positional arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlWithArgs {
    pub sql: String,
    pub args: Vec<SqlValue<'static>>,
}

impl SqlWithArgs {
    pub fn new(sql: impl Into<String>, args: Vec<SqlValue<'static>>) -> Self {
        Self {
            sql: sql.into(),
            args,
        }
    }

    /// Number of `?` placeholders outside quoted strings and identifiers.
    pub fn placeholder_count(&self) -> usize {
        let mut count = 0;
        let mut quote: Option<char> = None;
        for c in self.sql.chars() {
            match (quote, c) {
                (None, '\'' | '"' | '`') => quote = Some(c),
                (None, '?') => count += 1,
                (Some(q), c) if c == q => quote = None,
                _ => {}
            }
        }
        count
    }
}

/// Caller-supplied WHERE condition with its own arguments.
///
/// The clause is appended verbatim, so it should use `?` placeholders for
/// any values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    pub clause: String,
    pub args: Vec<SqlValue<'static>>,
}

impl Predicate {
    pub fn new(clause: impl Into<String>, args: Vec<SqlValue<'static>>) -> Self {
        Self {
            clause: clause.into(),
            args,
        }
    }

    /// `column = ?` bound to `value`.
    pub fn eq(column: &str, value: impl Into<SqlValue<'static>>) -> Result<Self> {
        Ok(Self {
            clause: format!("{} = ?", escape_name(column)?),
            args: vec![value.into()],
        })
    }

    /// Both conditions.
    pub fn and(mut self, other: Predicate) -> Self {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return self;
        }
        self.clause = format!("({}) AND ({})", self.clause, other.clause);
        self.args.extend(other.args);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clause.trim().is_empty()
    }
}

impl CompiledTable {
    /// Argument for one field. Unset nullable timestamps bind NULL.
    fn bind(&self, record: &dyn Record, field: &FieldDescriptor) -> Result<SqlValue<'static>> {
        if !record.has(field) && self.schema().binds_null_when_unset(field) {
            return Ok(SqlValue::Null);
        }
        serialize_field(record, field)
    }

    fn bind_all(&self, record: &dyn Record, args: &mut Vec<SqlValue<'static>>) -> Result<()> {
        self.ensure_owns(record)?;
        for field in self.schema().fields() {
            args.push(self.bind(record, field)?);
        }
        Ok(())
    }

    /// `c = ?` assignments for the fields present on `record`.
    fn assignments(
        &self,
        record: &dyn Record,
        skip_keys: bool,
        args: &mut Vec<SqlValue<'static>>,
    ) -> Result<Vec<String>> {
        let mut set = Vec::new();
        for (field, column) in self.schema().fields().iter().zip(self.columns()) {
            if !record.has(field) || (skip_keys && self.schema().is_primary_key(field.name())) {
                continue;
            }
            set.push(format!("{} = ?", column.quoted));
            args.push(self.bind(record, field)?);
        }
        Ok(set)
    }

    /// `k1 = ? AND k2 = ?` over every key component of `record`.
    fn key_condition(&self, record: &dyn Record, args: &mut Vec<SqlValue<'static>>) -> Result<String> {
        let keys = self.schema().key_fields();
        if keys.is_empty() {
            return Err(MapperError::NoPrimaryKey(self.name().to_string()));
        }
        let mut conditions = Vec::with_capacity(keys.len());
        for field in keys {
            if !record.has(field) {
                return Err(MapperError::MissingKeyComponent {
                    table: self.name().to_string(),
                    field: field.name().to_string(),
                });
            }
            conditions.push(format!("{} = ?", escape_name(field.name())?));
            args.push(self.bind(record, field)?);
        }
        Ok(conditions.join(" AND "))
    }

    fn require_predicate(&self, predicate: &Predicate, operation: &str) -> Result<()> {
        if predicate.is_empty() {
            return Err(MapperError::Config(format!(
                "{} on table {} requires a non-empty predicate",
                operation,
                self.name()
            )));
        }
        Ok(())
    }

    /// `INSERT INTO t (all) VALUES (?, ...)`.
    pub fn insert(&self, record: &dyn Record) -> Result<SqlWithArgs> {
        let mut args = Vec::with_capacity(self.columns().len());
        self.bind_all(record, &mut args)?;
        Ok(SqlWithArgs::new(self.insert_sql(), args))
    }

    /// Insert, updating the fields present on `record` when the key exists.
    ///
    /// With no field present this is a plain insert.
    pub fn upsert(&self, record: &dyn Record) -> Result<SqlWithArgs> {
        let mut stmt = self.insert(record)?;
        let set = self.assignments(record, false, &mut stmt.args)?;
        if set.is_empty() {
            warn!(
                "Upsert into {} has no fields set; issuing a plain insert",
                self.name()
            );
            return Ok(stmt);
        }
        stmt.sql = format!("{} ON DUPLICATE KEY UPDATE {}", stmt.sql, set.join(", "));
        Ok(stmt)
    }

    /// Insert, leaving an existing row with the same key untouched.
    pub fn insert_or_keep(&self, record: &dyn Record) -> Result<SqlWithArgs> {
        let key = self
            .schema()
            .primary_key
            .first()
            .ok_or_else(|| MapperError::NoPrimaryKey(self.name().to_string()))?;
        let key = escape_name(key)?;
        let mut stmt = self.insert(record)?;
        stmt.sql = format!("{} ON DUPLICATE KEY UPDATE {} = {}", stmt.sql, key, key);
        Ok(stmt)
    }

    /// `REPLACE INTO t (all) VALUES (?, ...)`.
    pub fn replace(&self, record: &dyn Record) -> Result<SqlWithArgs> {
        let mut args = Vec::with_capacity(self.columns().len());
        self.bind_all(record, &mut args)?;
        Ok(SqlWithArgs::new(self.replace_sql(), args))
    }

    /// Update the present non-key fields of the row matching `record`'s key.
    pub fn update_by_primary_key(&self, record: &dyn Record) -> Result<SqlWithArgs> {
        self.ensure_owns(record)?;
        let mut args = Vec::new();
        let set = self.assignments(record, true, &mut args)?;
        if set.is_empty() {
            return Err(MapperError::NothingToUpdate(self.name().to_string()));
        }
        let condition = self.key_condition(record, &mut args)?;
        Ok(SqlWithArgs::new(
            format!(
                "UPDATE {} SET {} WHERE {}",
                self.quoted_name(),
                set.join(", "),
                condition
            ),
            args,
        ))
    }

    /// Update the present fields of every row matching `predicate`.
    pub fn update_where(&self, record: &dyn Record, predicate: &Predicate) -> Result<SqlWithArgs> {
        self.ensure_owns(record)?;
        self.require_predicate(predicate, "update")?;
        let mut args = Vec::new();
        let set = self.assignments(record, false, &mut args)?;
        if set.is_empty() {
            return Err(MapperError::NothingToUpdate(self.name().to_string()));
        }
        args.extend(predicate.args.iter().cloned());
        Ok(SqlWithArgs::new(
            format!(
                "UPDATE {} SET {} WHERE {}",
                self.quoted_name(),
                set.join(", "),
                predicate.clause
            ),
            args,
        ))
    }

    /// Delete the row matching `record`'s key.
    pub fn delete_by_primary_key(&self, record: &dyn Record) -> Result<SqlWithArgs> {
        self.ensure_owns(record)?;
        let mut args = Vec::new();
        let condition = self.key_condition(record, &mut args)?;
        Ok(SqlWithArgs::new(
            format!("DELETE FROM {} WHERE {}", self.quoted_name(), condition),
            args,
        ))
    }

    /// Delete every row matching `predicate`.
    pub fn delete_where(&self, predicate: &Predicate) -> Result<SqlWithArgs> {
        self.require_predicate(predicate, "delete")?;
        Ok(SqlWithArgs::new(
            format!("DELETE FROM {} WHERE {}", self.quoted_name(), predicate.clause),
            predicate.args.clone(),
        ))
    }

    pub fn select_all(&self) -> SqlWithArgs {
        SqlWithArgs::new(self.select_sql(), Vec::new())
    }

    /// Select by the first primary key component.
    pub fn select_by_primary_key(&self, key: SqlValue<'_>) -> Result<SqlWithArgs> {
        let first = self
            .schema()
            .primary_key
            .first()
            .ok_or_else(|| MapperError::NoPrimaryKey(self.name().to_string()))?;
        Ok(SqlWithArgs::new(
            format!("{} WHERE {} = ?", self.select_sql(), escape_name(first)?),
            vec![key.into_owned()],
        ))
    }

    /// Select rows whose `field` equals `value`.
    pub fn select_by_field(&self, field: &str, value: SqlValue<'_>) -> Result<SqlWithArgs> {
        self.field(field)?;
        Ok(SqlWithArgs::new(
            format!("{} WHERE {} = ?", self.select_sql(), escape_name(field)?),
            vec![value.into_owned()],
        ))
    }

    /// Select rows matching `predicate`; an empty predicate selects all.
    pub fn select_where(&self, predicate: &Predicate) -> SqlWithArgs {
        if predicate.is_empty() {
            return self.select_all();
        }
        SqlWithArgs::new(
            format!("{} WHERE {}", self.select_sql(), predicate.clause),
            predicate.args.clone(),
        )
    }

    /// One multi-row INSERT for `records`.
    ///
    /// Rejects an empty batch and a batch above the configured maximum.
    pub fn batch_insert<R: Record>(&self, records: &[R]) -> Result<SqlWithArgs> {
        if records.is_empty() {
            return Err(MapperError::EmptyBatch(self.name().to_string()));
        }
        if records.len() > self.batch_insert_max() {
            return Err(MapperError::BatchSizeExceeded {
                table: self.name().to_string(),
                size: records.len(),
                max: self.batch_insert_max(),
            });
        }

        let mut args = Vec::with_capacity(records.len() * self.columns().len());
        for record in records {
            self.bind_all(record, &mut args)?;
        }
        let rows = vec![self.row_placeholders(); records.len()].join(", ");
        Ok(SqlWithArgs::new(
            format!(
                "INSERT INTO {} ({}) VALUES {}",
                self.quoted_name(),
                self.field_list(),
                rows
            ),
            args,
        ))
    }

    /// `TRUNCATE TABLE t`.
    pub fn truncate(&self) -> SqlWithArgs {
        SqlWithArgs::new(format!("TRUNCATE TABLE {}", self.quoted_name()), Vec::new())
    }
}
