//! MySQL/MariaDB driver.
//!
//! [`MysqlConnection`] implements [`Connection`](crate::core::Connection)
//! over the synchronous `mysql` crate's connection pool.
//!
//! # Feature Flag
//!
//! This module is only available when the `mysql` feature is enabled:
//!
//! ```toml
//! [dependencies]
//! proto-mysql = { version = "0.1", features = ["mysql"] }
//! ```
//!
//! # Supported Versions
//!
//! - MySQL 5.7+, 8.0+
//! - MariaDB 10.2+

mod connection;
mod value;

pub use connection::MysqlConnection;
pub use value::{to_mysql_value, value_bytes};
