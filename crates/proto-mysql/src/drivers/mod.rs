//! Database driver implementations.
//!
//! - [`mysql`]: MySQL/MariaDB over the `mysql` crate (feature `mysql`)
//!
//! Each driver implements [`Connection`](crate::core::Connection). Code that
//! only builds statements or schemas needs no driver at all.

#[cfg(feature = "mysql")]
pub mod mysql;

#[cfg(feature = "mysql")]
pub use self::mysql::MysqlConnection;
