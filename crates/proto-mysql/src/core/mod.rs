//! Core abstractions shared by every component.
//!
//! - [`descriptor`]: message and field descriptors, field kinds
//! - [`record`]: runtime values, the `Record` trait and `DynamicRecord`
//! - [`catalog`]: descriptors loaded from YAML documents
//! - [`value`]: statement arguments and raw result rows
//! - [`connection`]: the `Connection` trait implemented by drivers
//! - [`identifier`]: identifier validation and quoting
//!
//! # Architecture
//!
//! The mapper only talks to message instances through [`Record`] and to the
//! database through [`Connection`]. Both are traits so that generated
//! message types and alternative drivers can plug in, and so that the
//! engine can be tested against in-memory implementations.

pub mod catalog;
pub mod connection;
pub mod descriptor;
pub mod identifier;
pub mod record;
pub mod value;

pub use catalog::DescriptorCatalog;
pub use connection::{Connection, COLUMNS_QUERY};
pub use descriptor::{FieldDescriptor, FieldKind, KindTag, MessageDescriptor};
pub use record::{DynamicRecord, MapKey, Record, Value};
pub use value::{RawRow, ResultSet, SqlValue};
