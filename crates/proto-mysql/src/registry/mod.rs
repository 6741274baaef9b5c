//! The table registry: registered types and the CRUD surface.
//!
//! A [`Registry`] owns a connection and one [`CompiledTable`] per registered
//! message type, keyed by fully qualified type name. Lookups are lock-free;
//! registration publishes a new table map and replaces any previous entry
//! for the same type wholesale.

mod compiled;

pub use compiled::{ColumnDef, CompiledTable};

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::codec::deserialize_row;
use crate::config::{Config, MappingConfig};
use crate::core::catalog::DescriptorCatalog;
use crate::core::connection::{Connection, COLUMNS_QUERY};
use crate::core::descriptor::{FieldDescriptor, FieldKind, MessageDescriptor};
use crate::core::record::{DynamicRecord, Record, Value};
use crate::core::value::{ResultSet, SqlValue};
use crate::error::{MapperError, Result};
use crate::schema::{sync_table, ColumnSnapshot, SyncOutcome, TableOptions, TableSchema};
use crate::statement::{Predicate, SqlWithArgs};
use crate::typemap::TypeMap;

type TableMap = HashMap<String, Arc<CompiledTable>>;

/// One destination of [`Registry::find_multi`] and the predicate selecting
/// its row.
pub struct MultiQuery<'a> {
    pub dest: &'a mut dyn Record,
    pub predicate: Predicate,
}

impl<'a> MultiQuery<'a> {
    pub fn new(dest: &'a mut dyn Record, predicate: Predicate) -> Self {
        Self { dest, predicate }
    }
}

/// Registered tables plus the connection they are stored through.
pub struct Registry {
    conn: Arc<dyn Connection>,
    type_map: Arc<TypeMap>,
    mapping: MappingConfig,
    tables: ArcSwap<TableMap>,
    register_lock: Mutex<()>,
}

impl Registry {
    pub fn new(conn: Arc<dyn Connection>, type_map: Arc<TypeMap>, mapping: MappingConfig) -> Self {
        Self {
            conn,
            type_map,
            mapping,
            tables: ArcSwap::from_pointee(HashMap::new()),
            register_lock: Mutex::new(()),
        }
    }

    /// Registry with the standard type map and default mapping settings.
    pub fn with_defaults(conn: Arc<dyn Connection>) -> Self {
        Self::new(
            conn,
            Arc::new(TypeMap::mysql_default()),
            MappingConfig::default(),
        )
    }

    /// Registry using the mapping section of `config`, with its type
    /// overrides applied to the standard type map.
    pub fn from_config(conn: Arc<dyn Connection>, config: &Config) -> Result<Self> {
        let type_map = TypeMap::mysql_default().with_overrides(&config.mapping.type_overrides)?;
        Ok(Self::new(conn, Arc::new(type_map), config.mapping.clone()))
    }

    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.conn
    }

    pub fn type_map(&self) -> &TypeMap {
        &self.type_map
    }

    pub fn mapping(&self) -> &MappingConfig {
        &self.mapping
    }

    // ===== Registration =====

    /// Register a message type, replacing any previous registration of the
    /// same type.
    pub fn register(
        &self,
        descriptor: Arc<MessageDescriptor>,
        options: TableOptions,
    ) -> Result<Arc<CompiledTable>> {
        let schema = TableSchema::new(descriptor, options)?;
        let table = Arc::new(CompiledTable::compile(
            schema,
            &self.type_map,
            &self.mapping,
        )?);

        let _guard = self.register_lock.lock();
        let current = self.tables.load();
        if let Some(other) = current
            .values()
            .find(|t| t.name() == table.name() && t.type_name() != table.type_name())
        {
            return Err(MapperError::Config(format!(
                "types {} and {} both map to table {}",
                other.type_name(),
                table.type_name(),
                table.name()
            )));
        }

        let mut next: TableMap = (**current).clone();
        let replaced = next
            .insert(table.type_name().to_string(), Arc::clone(&table))
            .is_some();
        self.tables.store(Arc::new(next));

        info!(
            "{} {} as table {} ({} columns)",
            if replaced { "Re-registered" } else { "Registered" },
            table.type_name(),
            table.name(),
            table.columns().len()
        );
        Ok(table)
    }

    /// Register every catalog message that declares table options.
    pub fn register_catalog(&self, catalog: &DescriptorCatalog) -> Result<usize> {
        let mut count = 0;
        for (descriptor, options) in catalog.tables() {
            self.register(Arc::clone(descriptor), options.clone())?;
            count += 1;
        }
        Ok(count)
    }

    /// The compiled table of a registered type.
    pub fn table(&self, type_name: &str) -> Result<Arc<CompiledTable>> {
        self.tables
            .load()
            .get(type_name)
            .cloned()
            .ok_or_else(|| MapperError::TableNotRegistered(type_name.to_string()))
    }

    /// Every registered table, ordered by type name.
    pub fn tables(&self) -> Vec<Arc<CompiledTable>> {
        let mut tables: Vec<_> = self.tables.load().values().cloned().collect();
        tables.sort_by(|a, b| a.type_name().cmp(b.type_name()));
        tables
    }

    pub fn create_table_sql(&self, type_name: &str) -> Result<String> {
        Ok(self.table(type_name)?.create_table_sql().to_string())
    }

    // ===== Schema =====

    /// Create or alter the table of one type.
    pub fn sync_schema(&self, type_name: &str) -> Result<SyncOutcome> {
        let table = self.table(type_name)?;
        sync_table(self.conn.as_ref(), &table)
    }

    /// Synchronize every registered table, stopping at the first failure.
    pub fn sync_all(&self) -> Result<Vec<(String, SyncOutcome)>> {
        let mut outcomes = Vec::new();
        for table in self.tables() {
            let outcome = sync_table(self.conn.as_ref(), &table)?;
            outcomes.push((table.type_name().to_string(), outcome));
        }
        Ok(outcomes)
    }

    /// Live columns of a type's table, from the cache when populated.
    pub fn live_columns(&self, type_name: &str) -> Result<Arc<ColumnSnapshot>> {
        let table = self.table(type_name)?;
        table
            .live_columns()
            .load_or_fetch(|| self.conn.table_columns(self.conn.database(), table.name()))
            .map_err(|e| MapperError::schema(table.name(), COLUMNS_QUERY, e))
    }

    /// Whether a type's table exists in the database.
    pub fn table_exists(&self, type_name: &str) -> Result<bool> {
        Ok(!self.live_columns(type_name)?.columns.is_empty())
    }

    // ===== Writes =====

    /// Insert or replace a record (`REPLACE INTO`).
    pub fn save(&self, record: &dyn Record) -> Result<u64> {
        let table = self.table(record.type_name())?;
        self.execute(&table, table.replace(record)?)
    }

    pub fn insert(&self, record: &dyn Record) -> Result<u64> {
        let table = self.table(record.type_name())?;
        self.execute(&table, table.insert(record)?)
    }

    /// Insert, or update the record's present fields on a key collision.
    pub fn upsert(&self, record: &dyn Record) -> Result<u64> {
        let table = self.table(record.type_name())?;
        self.execute(&table, table.upsert(record)?)
    }

    /// Insert unless a row with the same key exists.
    pub fn insert_or_keep(&self, record: &dyn Record) -> Result<u64> {
        let table = self.table(record.type_name())?;
        self.execute(&table, table.insert_or_keep(record)?)
    }

    /// Update the row with the record's primary key.
    pub fn update(&self, record: &dyn Record) -> Result<u64> {
        let table = self.table(record.type_name())?;
        self.execute(&table, table.update_by_primary_key(record)?)
    }

    pub fn update_where(&self, record: &dyn Record, predicate: &Predicate) -> Result<u64> {
        let table = self.table(record.type_name())?;
        self.execute(&table, table.update_where(record, predicate)?)
    }

    /// Delete the row with the record's primary key.
    pub fn delete(&self, record: &dyn Record) -> Result<u64> {
        let table = self.table(record.type_name())?;
        self.execute(&table, table.delete_by_primary_key(record)?)
    }

    pub fn delete_where(&self, type_name: &str, predicate: &Predicate) -> Result<u64> {
        let table = self.table(type_name)?;
        self.execute(&table, table.delete_where(predicate)?)
    }

    /// Insert `records` in chunks of at most `batch_insert_max` rows, one
    /// statement per chunk. Every chunk is built before the first executes,
    /// so a record of another type or an unencodable value writes nothing.
    /// Chunks already written stay written if a later one fails to execute.
    pub fn batch_insert<R: Record>(&self, records: &[R]) -> Result<u64> {
        let first = records
            .first()
            .ok_or_else(|| MapperError::EmptyBatch("(no records)".to_string()))?;
        let table = self.table(first.type_name())?;

        let statements = records
            .chunks(table.batch_insert_max())
            .map(|chunk| table.batch_insert(chunk))
            .collect::<Result<Vec<_>>>()?;
        let mut total = 0;
        for stmt in statements {
            total += self.execute(&table, stmt)?;
        }
        debug!(
            "Batch inserted {} records into {} ({} rows affected)",
            records.len(),
            table.name(),
            total
        );
        Ok(total)
    }

    pub fn truncate(&self, type_name: &str) -> Result<u64> {
        let table = self.table(type_name)?;
        self.execute(&table, table.truncate())
    }

    // ===== Reads =====

    /// Load the row whose first primary key component equals `key`.
    pub fn find_one(&self, dest: &mut dyn Record, key: SqlValue<'_>) -> Result<()> {
        let table = self.table(dest.type_name())?;
        let stmt = table.select_by_primary_key(key)?;
        self.fill_one(&table, stmt, dest)
    }

    /// Load the single row whose `field` equals `value`.
    pub fn find_one_by_field(
        &self,
        dest: &mut dyn Record,
        field: &str,
        value: SqlValue<'_>,
    ) -> Result<()> {
        let table = self.table(dest.type_name())?;
        let stmt = table.select_by_field(field, value)?;
        self.fill_one(&table, stmt, dest)
    }

    /// Load the single row matching `predicate`.
    pub fn find_one_where(&self, dest: &mut dyn Record, predicate: &Predicate) -> Result<()> {
        let table = self.table(dest.type_name())?;
        let stmt = table.select_where(predicate);
        self.fill_one(&table, stmt, dest)
    }

    /// Load one row per query, each into its own destination, in order.
    ///
    /// Every destination's type must be registered before anything runs.
    /// Each query must match exactly one row; the first that does not fails
    /// the call and leaves later destinations untouched.
    pub fn find_multi(&self, queries: &mut [MultiQuery<'_>]) -> Result<()> {
        if queries.is_empty() {
            return Err(MapperError::Config(
                "find_multi requires at least one query".to_string(),
            ));
        }
        let tables = queries
            .iter()
            .map(|q| self.table(q.dest.type_name()))
            .collect::<Result<Vec<_>>>()?;

        for (query, table) in queries.iter_mut().zip(&tables) {
            let stmt = table.select_where(&query.predicate);
            self.fill_one(table, stmt, &mut *query.dest)?;
        }
        debug!("Filled {} records by predicate", tables.len());
        Ok(())
    }

    /// Load every row of the container element's table into `dest`'s
    /// container field. Returns the number of rows read.
    pub fn find_all(&self, dest: &mut dyn Record) -> Result<usize> {
        self.find_all_where(dest, &Predicate::default())
    }

    /// Load the rows matching `predicate` into `dest`'s container field.
    pub fn find_all_where(&self, dest: &mut dyn Record, predicate: &Predicate) -> Result<usize> {
        let (container, element) = container_field(dest)?;
        let table = self.table(element.full_name())?;
        let stmt = table.select_where(predicate);
        self.fill_container(&table, stmt, dest, &container, &element)
    }

    /// Load the rows whose `field` equals `value` into `dest`'s container
    /// field.
    pub fn find_all_by_field(
        &self,
        dest: &mut dyn Record,
        field: &str,
        value: SqlValue<'_>,
    ) -> Result<usize> {
        let (container, element) = container_field(dest)?;
        let table = self.table(element.full_name())?;
        let stmt = table.select_by_field(field, value)?;
        self.fill_container(&table, stmt, dest, &container, &element)
    }

    // ===== Execution =====

    fn execute(&self, table: &CompiledTable, stmt: SqlWithArgs) -> Result<u64> {
        debug!("{} [{} args]", stmt.sql, stmt.args.len());
        self.conn
            .execute(&stmt.sql, &stmt.args)
            .map_err(|e| MapperError::execution(table.name(), stmt.sql, e))
    }

    fn query(&self, table: &CompiledTable, stmt: SqlWithArgs) -> Result<ResultSet> {
        debug!("{} [{} args]", stmt.sql, stmt.args.len());
        self.conn
            .query(&stmt.sql, &stmt.args)
            .map_err(|e| MapperError::execution(table.name(), stmt.sql, e))
    }

    fn fill_one(&self, table: &CompiledTable, stmt: SqlWithArgs, dest: &mut dyn Record) -> Result<()> {
        let rs = self.query(table, stmt)?;
        match rs.rows.as_slice() {
            [] => Err(MapperError::NotFound(table.name().to_string())),
            [row] => deserialize_row(row, dest),
            _ => Err(MapperError::MultipleFound(table.name().to_string())),
        }
    }

    /// Decode every row into a fresh element and store the list in `dest`.
    /// On a decode failure the elements decoded so far are kept.
    fn fill_container(
        &self,
        table: &CompiledTable,
        stmt: SqlWithArgs,
        dest: &mut dyn Record,
        container: &FieldDescriptor,
        element: &Arc<MessageDescriptor>,
    ) -> Result<usize> {
        dest.clear(container);
        let rs = self.query(table, stmt)?;

        let mut items = Vec::with_capacity(rs.len());
        let mut failure = None;
        for row in &rs.rows {
            let mut item = DynamicRecord::new(Arc::clone(element));
            if let Err(e) = deserialize_row(row, &mut item) {
                failure = Some(e);
                break;
            }
            items.push(Value::Message(item));
        }

        let count = items.len();
        dest.set(container, Value::List(items))?;
        match failure {
            Some(e) => Err(e),
            None => Ok(count),
        }
    }
}

/// The single repeated field of `dest` and its message element type.
fn container_field(dest: &dyn Record) -> Result<(FieldDescriptor, Arc<MessageDescriptor>)> {
    let descriptor = dest.descriptor();
    let lists: Vec<&FieldDescriptor> = descriptor.list_fields().collect();
    let field = match lists.as_slice() {
        [] => return Err(MapperError::NoContainerField(descriptor.full_name().to_string())),
        [field] => *field,
        many => {
            return Err(MapperError::MultipleContainerFields {
                message: descriptor.full_name().to_string(),
                fields: many
                    .iter()
                    .map(|f| f.name())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
        }
    };
    match field.kind() {
        FieldKind::List(element) => match element.as_ref() {
            FieldKind::Message(element) => Ok((field.clone(), Arc::clone(element))),
            _ => Err(MapperError::NoContainerField(descriptor.full_name().to_string())),
        },
        _ => Err(MapperError::NoContainerField(descriptor.full_name().to_string())),
    }
}
