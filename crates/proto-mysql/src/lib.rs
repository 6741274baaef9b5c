//! # proto-mysql
//!
//! Store protobuf-style message types in MySQL tables.
//!
//! Each registered message type maps to one table with one column per
//! field. This library provides:
//!
//! - **Schema generation** of `CREATE TABLE` statements from descriptors
//! - **Schema synchronization** that adds and widens columns on live tables
//! - **Parameterized CRUD** statements (insert, upsert, replace, update,
//!   delete, select, batch insert)
//! - **A field codec** that turns field values into column values and back,
//!   with nested messages, lists and maps stored as escaped binary blobs
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use proto_mysql::{
//!     Config, Connection, DynamicRecord, FieldKind, MessageDescriptor, Registry, SqlValue,
//!     TableOptions,
//! };
//!
//! fn store(conn: Arc<dyn Connection>) -> proto_mysql::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let registry = Registry::from_config(conn, &config)?;
//!
//!     let user = MessageDescriptor::builder("app.User")
//!         .field("id", FieldKind::Uint64)
//!         .field("name", FieldKind::String)
//!         .build()?;
//!     registry.register(
//!         user.clone(),
//!         TableOptions::new().with_primary_key(["id"]).with_auto_increment("id"),
//!     )?;
//!     registry.sync_schema("app.User")?;
//!
//!     let record = DynamicRecord::new(user.clone())
//!         .with("id", 1u64)?
//!         .with("name", "Ada")?;
//!     registry.save(&record)?;
//!
//!     let mut found = DynamicRecord::new(user);
//!     registry.find_one(&mut found, SqlValue::from(1u64))?;
//!     Ok(())
//! }
//! ```
//!
//! With the `mysql` feature, `MysqlConnection::new(&config.database)`
//! provides the connection.

pub mod codec;
pub mod config;
pub mod core;
pub mod drivers;
pub mod error;
pub mod registry;
pub mod schema;
pub mod statement;
pub mod typemap;

// Re-exports for convenient access
pub use crate::config::{Config, DatabaseConfig, MappingConfig};
pub use crate::core::{
    Connection, DescriptorCatalog, DynamicRecord, FieldDescriptor, FieldKind, KindTag, MapKey,
    MessageDescriptor, Record, ResultSet, SqlValue, Value,
};
#[cfg(feature = "mysql")]
pub use crate::drivers::MysqlConnection;
pub use crate::error::{MapperError, Result};
pub use crate::registry::{CompiledTable, MultiQuery, Registry};
pub use crate::schema::{SyncOutcome, TableOptions, TableSchema};
pub use crate::statement::{Predicate, SqlWithArgs};
pub use crate::typemap::{ColumnType, TypeMap};
