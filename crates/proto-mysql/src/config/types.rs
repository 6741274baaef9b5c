//! Configuration type definitions.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database connection configuration (MySQL).
    pub database: DatabaseConfig,

    /// Mapping behavior configuration.
    #[serde(default)]
    pub mapping: MappingConfig,
}

/// Database (MySQL) connection configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database host.
    pub host: String,

    /// Database port (default: 3306).
    #[serde(default = "default_mysql_port")]
    pub port: u16,

    /// Username.
    pub user: String,

    /// Password.
    #[serde(default)]
    pub password: String,

    /// Database (schema) name.
    pub database: String,

    /// SSL mode (default: "prefer").
    #[serde(default = "default_prefer")]
    pub ssl_mode: String,

    /// Maximum pooled connections (default: 10).
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("database", &self.database)
            .field("ssl_mode", &self.ssl_mode)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

/// Mapping behavior configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingConfig {
    /// Largest number of rows in one batch insert statement (default: 1000).
    #[serde(default = "default_batch_insert_max")]
    pub batch_insert_max: usize,

    /// Storage engine for created tables (default: "InnoDB").
    #[serde(default = "default_engine")]
    pub engine: String,

    /// Default character set for created tables (default: "utf8mb4").
    #[serde(default = "default_charset")]
    pub charset: String,

    /// Default collation for created tables (default: "utf8mb4_unicode_ci").
    #[serde(default = "default_collation")]
    pub collation: String,

    /// Base type overrides keyed by kind name (e.g. `string: LONGTEXT`).
    #[serde(default)]
    pub type_overrides: BTreeMap<String, String>,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            batch_insert_max: default_batch_insert_max(),
            engine: default_engine(),
            charset: default_charset(),
            collation: default_collation(),
            type_overrides: BTreeMap::new(),
        }
    }
}

/// Flat JSON connection settings keyed `Net`, `Addr`, `User`, `Passwd` and
/// `DBName`.
#[derive(Clone, Deserialize)]
pub struct DriverJsonConfig {
    #[serde(rename = "Net", default = "default_tcp")]
    pub net: String,

    /// `host:port`, or just `host`.
    #[serde(rename = "Addr")]
    pub addr: String,

    #[serde(rename = "User")]
    pub user: String,

    #[serde(rename = "Passwd", default)]
    pub passwd: String,

    #[serde(rename = "DBName")]
    pub db_name: String,
}

fn default_mysql_port() -> u16 {
    3306
}

fn default_prefer() -> String {
    "prefer".to_string()
}

fn default_max_connections() -> usize {
    10
}

fn default_batch_insert_max() -> usize {
    1000
}

fn default_engine() -> String {
    "InnoDB".to_string()
}

fn default_charset() -> String {
    "utf8mb4".to_string()
}

fn default_collation() -> String {
    "utf8mb4_unicode_ci".to_string()
}

fn default_tcp() -> String {
    "tcp".to_string()
}
