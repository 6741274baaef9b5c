//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use std::path::Path;

use crate::error::{MapperError, Result};

impl Config {
    /// Load configuration from a file: JSON when the extension is `.json`,
    /// YAML otherwise.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json(&content)
        } else {
            Self::from_yaml(&content)
        }
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a JSON string.
    ///
    /// Accepts either the nested `{"database": ..., "mapping": ...}` layout
    /// or flat connection settings keyed `Net`/`Addr`/`User`/`Passwd`/`DBName`.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let config = if value.get("database").is_some() {
            serde_json::from_value::<Config>(value)?
        } else {
            let flat: DriverJsonConfig = serde_json::from_value(value)?;
            Config {
                database: DatabaseConfig::try_from(flat)?,
                mapping: MappingConfig::default(),
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

impl TryFrom<DriverJsonConfig> for DatabaseConfig {
    type Error = MapperError;

    fn try_from(flat: DriverJsonConfig) -> Result<Self> {
        if !flat.net.eq_ignore_ascii_case("tcp") {
            return Err(MapperError::Config(format!(
                "Net must be 'tcp', got '{}'",
                flat.net
            )));
        }

        let (host, port) = match flat.addr.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse::<u16>().map_err(|_| {
                    MapperError::Config(format!("invalid port in Addr '{}'", flat.addr))
                })?;
                (host.to_string(), port)
            }
            None => (flat.addr.clone(), 3306),
        };

        Ok(DatabaseConfig {
            host,
            port,
            user: flat.user,
            password: flat.passwd,
            database: flat.db_name,
            ssl_mode: "prefer".to_string(),
            max_connections: 10,
        })
    }
}
