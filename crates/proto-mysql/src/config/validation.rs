//! Configuration validation.

use super::Config;
use crate::core::descriptor::KindTag;
use crate::error::{MapperError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    // Database validation
    if config.database.host.is_empty() {
        return Err(MapperError::Config("database.host is required".into()));
    }
    if config.database.database.is_empty() {
        return Err(MapperError::Config("database.database is required".into()));
    }
    if config.database.user.is_empty() {
        return Err(MapperError::Config("database.user is required".into()));
    }
    if config.database.max_connections == 0 {
        return Err(MapperError::Config(
            "database.max_connections must be at least 1".into(),
        ));
    }

    // Mapping validation
    if config.mapping.batch_insert_max == 0 {
        return Err(MapperError::Config(
            "mapping.batch_insert_max must be at least 1".into(),
        ));
    }
    for (key, value) in [
        ("mapping.engine", &config.mapping.engine),
        ("mapping.charset", &config.mapping.charset),
        ("mapping.collation", &config.mapping.collation),
    ] {
        if !is_plain_name(value) {
            return Err(MapperError::Config(format!(
                "{} must be a plain name, got '{}'",
                key, value
            )));
        }
    }
    for kind in config.mapping.type_overrides.keys() {
        kind.parse::<KindTag>().map_err(|_| {
            MapperError::Config(format!(
                "mapping.type_overrides: unknown kind '{}'",
                kind
            ))
        })?;
    }

    Ok(())
}

fn is_plain_name(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}
