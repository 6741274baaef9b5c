//! Pooled MySQL connection.

use mysql::prelude::*;
use mysql::{Opts, OptsBuilder, Params, Pool, PoolConstraints, PoolOpts, SslOpts};
use tracing::{info, warn};

use super::value::{row_bytes, to_mysql_params};
use crate::config::DatabaseConfig;
use crate::core::connection::Connection;
use crate::core::value::{ResultSet, SqlValue};
use crate::error::{MapperError, Result};

/// [`Connection`] over a `mysql` connection pool.
pub struct MysqlConnection {
    pool: Pool,
    database: String,
}

impl MysqlConnection {
    /// Create a pool from configuration and check it with `SELECT 1`.
    pub fn new(config: &DatabaseConfig) -> Result<Self> {
        let ssl_opts = match config.ssl_mode.to_lowercase().as_str() {
            "disable" => {
                warn!("MySQL TLS is disabled. Credentials will be transmitted in plaintext.");
                None
            }
            "prefer" | "require" => Some(SslOpts::default().with_danger_accept_invalid_certs(true)),
            "verify-ca" | "verify_ca" | "verify-full" | "verify_identity" => {
                Some(SslOpts::default())
            }
            _ => {
                warn!(
                    "Unknown ssl_mode '{}', defaulting to Preferred",
                    config.ssl_mode
                );
                Some(SslOpts::default().with_danger_accept_invalid_certs(true))
            }
        };

        let constraints = PoolConstraints::new(1, config.max_connections).ok_or_else(|| {
            MapperError::Config(format!(
                "invalid max_connections {}",
                config.max_connections
            ))
        })?;

        let builder = OptsBuilder::new()
            .ip_or_hostname(Some(config.host.as_str()))
            .tcp_port(config.port)
            .db_name(Some(config.database.as_str()))
            .user(Some(config.user.as_str()))
            .pass(Some(config.password.as_str()))
            .init(vec!["SET NAMES utf8mb4"])
            .ssl_opts(ssl_opts)
            .pool_opts(PoolOpts::default().with_constraints(constraints));

        let pool = Pool::new(Opts::from(builder))?;
        let connection = Self::from_pool(pool, config.database.clone());
        connection.test_connection()?;

        info!(
            "Connected to MySQL: {}:{}/{}",
            config.host, config.port, config.database
        );
        Ok(connection)
    }

    /// Wrap an existing pool whose connections default to `database`.
    pub fn from_pool(pool: Pool, database: impl Into<String>) -> Self {
        Self {
            pool,
            database: database.into(),
        }
    }

    /// A clone of the underlying pool.
    pub fn pool(&self) -> Pool {
        self.pool.clone()
    }

    pub fn test_connection(&self) -> Result<()> {
        let mut conn = self.pool.get_conn()?;
        conn.query_drop("SELECT 1")?;
        Ok(())
    }
}

impl Connection for MysqlConnection {
    fn database(&self) -> &str {
        &self.database
    }

    fn execute(&self, sql: &str, args: &[SqlValue<'_>]) -> Result<u64> {
        let mut conn = self.pool.get_conn()?;
        if args.is_empty() {
            // DDL goes over the text protocol.
            conn.query_drop(sql)?;
        } else {
            conn.exec_drop(sql, Params::Positional(to_mysql_params(args)))?;
        }
        Ok(conn.affected_rows())
    }

    fn query(&self, sql: &str, args: &[SqlValue<'_>]) -> Result<ResultSet> {
        let mut conn = self.pool.get_conn()?;
        let rows: Vec<mysql::Row> = if args.is_empty() {
            conn.query(sql)?
        } else {
            conn.exec(sql, Params::Positional(to_mysql_params(args)))?
        };

        let columns = rows
            .first()
            .map(|row| {
                row.columns_ref()
                    .iter()
                    .map(|c| c.name_str().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        let rows = rows.iter().map(row_bytes).collect();
        Ok(ResultSet::new(columns, rows))
    }
}
