//! In-memory [`Connection`] for integration tests.
//!
//! Understands exactly the statement shapes the crate generates: CREATE and
//! ALTER maintain a column catalog; INSERT/REPLACE/UPDATE/DELETE/SELECT with
//! `col = ?` conditions operate on stored rows. Every call is recorded.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use proto_mysql::core::connection::COLUMNS_QUERY;
use proto_mysql::{Connection, MapperError, ResultSet, SqlValue};

type Row = BTreeMap<String, Option<Vec<u8>>>;

/// One recorded call.
#[derive(Debug, Clone)]
pub struct Executed {
    pub sql: String,
    pub args: usize,
}

impl Executed {
    /// Number of value groups in an INSERT/REPLACE statement.
    pub fn value_rows(&self) -> usize {
        match self.sql.split_once(" VALUES ") {
            Some((_, values)) => values.matches("(?").count(),
            None => 0,
        }
    }
}

#[derive(Debug, Default)]
struct Table {
    columns: Vec<(String, String)>,
    primary_key: Vec<String>,
    auto_increment: Option<String>,
    next_id: u64,
    rows: Vec<Row>,
}

#[derive(Debug, Default)]
struct State {
    tables: BTreeMap<String, Table>,
    executed: Vec<Executed>,
    fail_prefix: Option<String>,
}

pub struct MemoryConnection {
    database: String,
    state: Mutex<State>,
}

impl MemoryConnection {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            database: "testdb".to_string(),
            state: Mutex::new(State::default()),
        })
    }

    /// Pre-create a table with the given live columns (name, type).
    pub fn with_table(&self, table: &str, columns: &[(&str, &str)], primary_key: &[&str]) {
        let mut state = self.state.lock();
        state.tables.insert(
            table.to_string(),
            Table {
                columns: columns
                    .iter()
                    .map(|(n, t)| (n.to_string(), t.to_string()))
                    .collect(),
                primary_key: primary_key.iter().map(|k| k.to_string()).collect(),
                ..Table::default()
            },
        );
    }

    /// Fail every statement starting with `prefix`.
    pub fn fail_on(&self, prefix: &str) {
        self.state.lock().fail_prefix = Some(prefix.to_string());
    }

    pub fn executed(&self) -> Vec<Executed> {
        self.state.lock().executed.clone()
    }

    /// Recorded statements starting with `prefix`.
    pub fn statements(&self, prefix: &str) -> Vec<Executed> {
        self.executed()
            .into_iter()
            .filter(|e| e.sql.starts_with(prefix))
            .collect()
    }

    pub fn clear_log(&self) {
        self.state.lock().executed.clear();
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.state
            .lock()
            .tables
            .get(table)
            .map_or(0, |t| t.rows.len())
    }

    pub fn live_columns(&self, table: &str) -> Vec<(String, String)> {
        self.state
            .lock()
            .tables
            .get(table)
            .map(|t| t.columns.clone())
            .unwrap_or_default()
    }

    /// Stored raw value of one column of the first row matching `key = value`.
    pub fn raw_value(&self, table: &str, key: &str, value: &str, column: &str) -> Option<Vec<u8>> {
        let state = self.state.lock();
        state
            .tables
            .get(table)?
            .rows
            .iter()
            .find(|r| r.get(key).cloned().flatten().as_deref() == Some(value.as_bytes()))?
            .get(column)
            .cloned()
            .flatten()
    }

    fn record_call(&self, state: &mut State, sql: &str, args: usize) -> proto_mysql::Result<()> {
        state.executed.push(Executed {
            sql: sql.to_string(),
            args,
        });
        match &state.fail_prefix {
            Some(prefix) if sql.starts_with(prefix.as_str()) => {
                Err(MapperError::Database(format!("injected failure for {}", prefix)))
            }
            _ => Ok(()),
        }
    }
}

impl Connection for MemoryConnection {
    fn database(&self) -> &str {
        &self.database
    }

    fn execute(&self, sql: &str, args: &[SqlValue<'_>]) -> proto_mysql::Result<u64> {
        let mut state = self.state.lock();
        self.record_call(&mut state, sql, args.len())?;
        let args: Vec<Option<Vec<u8>>> = args.iter().map(|a| a.to_row_bytes()).collect();

        if let Some(rest) = sql.strip_prefix("CREATE TABLE IF NOT EXISTS ") {
            create_table(&mut state, rest)
        } else if let Some(rest) = sql.strip_prefix("ALTER TABLE ") {
            alter_table(&mut state, rest)
        } else if let Some(rest) = sql.strip_prefix("INSERT INTO ") {
            insert(&mut state, rest, &args, false)
        } else if let Some(rest) = sql.strip_prefix("REPLACE INTO ") {
            insert(&mut state, rest, &args, true)
        } else if let Some(rest) = sql.strip_prefix("UPDATE ") {
            update(&mut state, rest, &args)
        } else if let Some(rest) = sql.strip_prefix("DELETE FROM ") {
            delete(&mut state, rest, &args)
        } else if let Some(rest) = sql.strip_prefix("TRUNCATE TABLE ") {
            let table = table_mut(&mut state, &ident(rest))?;
            table.rows.clear();
            Ok(0)
        } else {
            Err(unsupported(sql))
        }
    }

    fn query(&self, sql: &str, args: &[SqlValue<'_>]) -> proto_mysql::Result<ResultSet> {
        let mut state = self.state.lock();
        self.record_call(&mut state, sql, args.len())?;
        let args: Vec<Option<Vec<u8>>> = args.iter().map(|a| a.to_row_bytes()).collect();

        let rest = sql.strip_prefix("SELECT ").ok_or_else(|| unsupported(sql))?;
        let (columns, rest) = rest.split_once(" FROM ").ok_or_else(|| unsupported(sql))?;
        let columns: Vec<String> = columns.split(", ").map(ident).collect();
        let (table_name, condition) = match rest.split_once(" WHERE ") {
            Some((t, c)) => (t, Some(c)),
            None => (rest, None),
        };
        let table = state
            .tables
            .get(&ident(table_name))
            .ok_or_else(|| MapperError::Database(format!("no table {}", table_name)))?;
        let filter = match condition {
            Some(c) => parse_conditions(c, &args)?,
            None => Vec::new(),
        };

        let rows = table
            .rows
            .iter()
            .filter(|row| matches_all(row, &filter))
            .map(|row| {
                columns
                    .iter()
                    .map(|c| row.get(c).cloned().flatten())
                    .collect()
            })
            .collect();
        Ok(ResultSet::new(columns, rows))
    }

    fn table_columns(
        &self,
        _schema: &str,
        table: &str,
    ) -> proto_mysql::Result<BTreeMap<String, String>> {
        let mut state = self.state.lock();
        self.record_call(&mut state, COLUMNS_QUERY, 2)?;
        Ok(state
            .tables
            .get(table)
            .map(|t| t.columns.iter().cloned().collect())
            .unwrap_or_default())
    }
}

fn unsupported(sql: &str) -> MapperError {
    MapperError::Database(format!("unsupported statement: {}", sql))
}

fn ident(name: &str) -> String {
    name.trim().trim_matches('`').replace("``", "`")
}

fn table_mut<'a>(state: &'a mut State, name: &str) -> proto_mysql::Result<&'a mut Table> {
    state
        .tables
        .get_mut(name)
        .ok_or_else(|| MapperError::Database(format!("Table '{}' doesn't exist", name)))
}

/// Live column type from a column definition: the base type, lowercased.
fn live_type(definition: &str) -> String {
    let mut base = definition;
    for marker in [" NOT NULL", " DEFAULT", " AUTO_INCREMENT"] {
        if let Some(i) = base.find(marker) {
            base = &base[..i];
        }
    }
    base.trim().to_ascii_lowercase()
}

fn create_table(state: &mut State, rest: &str) -> proto_mysql::Result<u64> {
    let mut lines = rest.lines();
    let header = lines.next().unwrap_or_default();
    let name = ident(header.trim_end_matches(" ("));
    if state.tables.contains_key(&name) {
        return Ok(0);
    }

    let mut table = Table::default();
    for line in lines {
        let line = line.trim().trim_end_matches(',');
        if line.starts_with(')') {
            break;
        }
        if let Some(keys) = line.strip_prefix("PRIMARY KEY (") {
            table.primary_key = keys.trim_end_matches(')').split(", ").map(ident).collect();
        } else if line.starts_with("INDEX ") || line.starts_with("UNIQUE KEY ") {
            continue;
        } else if let Some((column, definition)) = line.split_once(' ') {
            let column = ident(column);
            if definition.contains("AUTO_INCREMENT") {
                table.auto_increment = Some(column.clone());
            }
            table.columns.push((column, live_type(definition)));
        }
    }
    state.tables.insert(name, table);
    Ok(0)
}

fn alter_table(state: &mut State, rest: &str) -> proto_mysql::Result<u64> {
    let (name, clauses) = rest
        .split_once(' ')
        .ok_or_else(|| unsupported(rest))?;
    let table = table_mut(state, &ident(name))?;

    let mut merged: Vec<String> = Vec::new();
    for piece in clauses.split(", ") {
        if piece.starts_with("ADD COLUMN ") || piece.starts_with("MODIFY COLUMN ") {
            merged.push(piece.to_string());
        } else if let Some(last) = merged.last_mut() {
            last.push_str(", ");
            last.push_str(piece);
        }
    }

    for clause in merged {
        if let Some(def) = clause.strip_prefix("ADD COLUMN ") {
            let (column, definition) = def.split_once(' ').ok_or_else(|| unsupported(def))?;
            table.columns.push((ident(column), live_type(definition)));
        } else if let Some(def) = clause.strip_prefix("MODIFY COLUMN ") {
            let (column, definition) = def.split_once(' ').ok_or_else(|| unsupported(def))?;
            let column = ident(column);
            let entry = table
                .columns
                .iter_mut()
                .find(|(c, _)| *c == column)
                .ok_or_else(|| MapperError::Database(format!("Unknown column '{}'", column)))?;
            entry.1 = live_type(definition);
        }
    }
    Ok(0)
}

fn key_of(table: &Table, row: &Row) -> Option<Vec<Option<Vec<u8>>>> {
    if table.primary_key.is_empty() {
        return None;
    }
    Some(
        table
            .primary_key
            .iter()
            .map(|k| row.get(k).cloned().flatten())
            .collect(),
    )
}

fn insert(
    state: &mut State,
    rest: &str,
    args: &[Option<Vec<u8>>],
    replace: bool,
) -> proto_mysql::Result<u64> {
    let (name, rest) = rest.split_once(" (").ok_or_else(|| unsupported(rest))?;
    let (columns, rest) = rest.split_once(") VALUES ").ok_or_else(|| unsupported(rest))?;
    let columns: Vec<String> = columns.split(", ").map(ident).collect();
    let on_duplicate = rest
        .split_once(" ON DUPLICATE KEY UPDATE ")
        .map(|(_, assignments)| assignments.to_string());
    let rows = rest.matches("(?").count();
    let table = table_mut(state, &ident(name))?;

    let value_args = rows * columns.len();
    let (values, update_args) = args.split_at(value_args.min(args.len()));
    let mut affected = 0;
    for chunk in values.chunks(columns.len()) {
        let mut row: Row = columns.iter().cloned().zip(chunk.iter().cloned()).collect();

        if let Some(auto) = &table.auto_increment {
            let current = row.get(auto).cloned().flatten();
            match current.as_deref() {
                None | Some(b"0") | Some(b"") => {
                    table.next_id += 1;
                    row.insert(auto.clone(), Some(table.next_id.to_string().into_bytes()));
                }
                Some(explicit) => {
                    if let Some(id) = std::str::from_utf8(explicit)
                        .ok()
                        .and_then(|s| s.parse::<u64>().ok())
                    {
                        table.next_id = table.next_id.max(id);
                    }
                }
            }
        }

        let existing = {
            let current: &Table = table;
            key_of(current, &row).and_then(|k| {
                current
                    .rows
                    .iter()
                    .position(|r| key_of(current, r).as_ref() == Some(&k))
            })
        };

        match (existing, replace, &on_duplicate) {
            (None, _, _) => {
                table.rows.push(row);
                affected += 1;
            }
            (Some(i), true, _) => {
                table.rows[i] = row;
                affected += 2;
            }
            (Some(i), false, Some(assignments)) => {
                let mut args = update_args.iter();
                for assignment in assignments.split(", ") {
                    let (column, value) = assignment
                        .split_once(" = ")
                        .ok_or_else(|| unsupported(assignments))?;
                    if value == "?" {
                        let value = args.next().cloned().flatten();
                        table.rows[i].insert(ident(column), value);
                    }
                }
                affected += 2;
            }
            (Some(_), false, None) => {
                return Err(MapperError::Database(format!(
                    "Duplicate entry for key 'PRIMARY' in {}",
                    name
                )));
            }
        }
    }
    Ok(affected)
}

type Condition = (String, Option<Vec<u8>>);

fn parse_conditions(clause: &str, args: &[Option<Vec<u8>>]) -> proto_mysql::Result<Vec<Condition>> {
    let mut args = args.iter();
    let mut conditions = Vec::new();
    for part in clause.split(" AND ") {
        let part = part.trim().trim_start_matches('(').trim_end_matches(')');
        let (column, value) = part
            .split_once(" = ")
            .ok_or_else(|| MapperError::Database(format!("unsupported condition: {}", part)))?;
        if value.trim() != "?" {
            return Err(MapperError::Database(format!("unsupported condition: {}", part)));
        }
        conditions.push((ident(column), args.next().cloned().flatten()));
    }
    Ok(conditions)
}

fn matches_all(row: &Row, conditions: &[Condition]) -> bool {
    conditions
        .iter()
        .all(|(column, value)| row.get(column).cloned().flatten() == *value)
}

fn update(state: &mut State, rest: &str, args: &[Option<Vec<u8>>]) -> proto_mysql::Result<u64> {
    let (name, rest) = rest.split_once(" SET ").ok_or_else(|| unsupported(rest))?;
    let (assignments, condition) = rest.split_once(" WHERE ").ok_or_else(|| unsupported(rest))?;
    let columns: Vec<String> = assignments
        .split(", ")
        .map(|a| ident(a.trim_end_matches(" = ?")))
        .collect();
    let (values, condition_args) = args.split_at(columns.len());
    let filter = parse_conditions(condition, condition_args)?;
    let table = table_mut(state, &ident(name))?;

    let mut affected = 0;
    for row in table.rows.iter_mut().filter(|r| matches_all(r, &filter)) {
        for (column, value) in columns.iter().zip(values) {
            row.insert(column.clone(), value.clone());
        }
        affected += 1;
    }
    Ok(affected)
}

fn delete(state: &mut State, rest: &str, args: &[Option<Vec<u8>>]) -> proto_mysql::Result<u64> {
    let (name, condition) = rest.split_once(" WHERE ").ok_or_else(|| unsupported(rest))?;
    let filter = parse_conditions(condition, args)?;
    let table = table_mut(state, &ident(name))?;
    let before = table.rows.len();
    table.rows.retain(|r| !matches_all(r, &filter));
    Ok((before - table.rows.len()) as u64)
}
