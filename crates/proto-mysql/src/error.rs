//! Error types for the mapping library.

use thiserror::Error;

/// Main error type for mapping operations.
#[derive(Error, Debug)]
pub enum MapperError {
    /// Configuration error (invalid YAML, bad table options, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A field kind name that the type system does not know.
    #[error("Unknown field kind '{kind}' ({context})")]
    UnknownKind { kind: String, context: String },

    /// Table has no primary key (required for key-based statements)
    #[error("Table {0} has no primary key configured")]
    NoPrimaryKey(String),

    /// Record does not carry a value for one of the key fields.
    #[error("Record for table {table} is missing primary key component '{field}'")]
    MissingKeyComponent { table: String, field: String },

    /// Field name not declared by a message type or table.
    #[error("Field '{field}' not found in {owner}")]
    FieldNotFound { owner: String, field: String },

    /// Value does not match the declared kind of a field.
    #[error("Type mismatch for field '{field}': expected {expected}, got {actual}")]
    TypeMismatch {
        field: String,
        expected: String,
        actual: String,
    },

    /// Destination message for a multi-row read has no list field.
    #[error("Message {0} has no repeated field to receive rows")]
    NoContainerField(String),

    /// Destination message for a multi-row read has more than one list field.
    #[error("Message {message} has multiple repeated fields ({fields}); exactly one is required")]
    MultipleContainerFields { message: String, fields: String },

    /// Batch larger than the configured maximum.
    #[error("Batch of {size} rows for table {table} exceeds the maximum of {max}")]
    BatchSizeExceeded {
        table: String,
        size: usize,
        max: usize,
    },

    /// Batch insert called without records.
    #[error("Batch insert into table {0} has no records")]
    EmptyBatch(String),

    /// Update statement would have an empty SET clause.
    #[error("Nothing to update in table {0}: no non-key fields are set")]
    NothingToUpdate(String),

    /// Message type not registered with the registry.
    #[error("No table registered for message type {0}")]
    TableNotRegistered(String),

    /// A stored column value could not be decoded.
    #[error("Failed to decode field '{field}' of {record}: {message} (value: {value})")]
    Codec {
        record: String,
        field: String,
        value: String,
        message: String,
    },

    /// Binary payload is not valid wire encoding.
    #[error("Malformed binary payload: {0}")]
    MalformedPayload(String),

    /// DDL or catalog query failed
    #[error("Schema change failed for table {table}: {source}\n  SQL: {sql}")]
    Schema {
        table: String,
        sql: String,
        source: Box<MapperError>,
    },

    /// DML statement failed
    #[error("Statement failed for table {table}: {source}\n  SQL: {sql}")]
    Execution {
        table: String,
        sql: String,
        source: Box<MapperError>,
    },

    /// Error reported by a connection implementation.
    #[error("Database error: {0}")]
    Database(String),

    /// MySQL driver error
    #[cfg(feature = "mysql")]
    #[error("MySQL error: {0}")]
    Mysql(#[from] mysql::Error),

    /// Single-row read matched no rows.
    #[error("No rows found in table {0}")]
    NotFound(String),

    /// Single-row read matched more than one row.
    #[error("Multiple rows found in table {0}")]
    MultipleFound(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Longest raw value echoed back in a codec error.
const MAX_VALUE_PREVIEW: usize = 64;

impl MapperError {
    /// Create a Schema error wrapping the failure of `sql`.
    pub fn schema(table: impl Into<String>, sql: impl Into<String>, source: MapperError) -> Self {
        MapperError::Schema {
            table: table.into(),
            sql: sql.into(),
            source: Box::new(source),
        }
    }

    /// Create an Execution error wrapping the failure of `sql`.
    pub fn execution(
        table: impl Into<String>,
        sql: impl Into<String>,
        source: MapperError,
    ) -> Self {
        MapperError::Execution {
            table: table.into(),
            sql: sql.into(),
            source: Box::new(source),
        }
    }

    /// Create a Codec error, truncating the raw value for display.
    pub fn codec(
        record: impl Into<String>,
        field: impl Into<String>,
        raw: &[u8],
        message: impl Into<String>,
    ) -> Self {
        let mut value = String::from_utf8_lossy(raw).into_owned();
        if value.chars().count() > MAX_VALUE_PREVIEW {
            value = value.chars().take(MAX_VALUE_PREVIEW).collect();
            value.push_str("...");
        }
        MapperError::Codec {
            record: record.into(),
            field: field.into(),
            value,
            message: message.into(),
        }
    }

    /// Create a TypeMismatch error.
    pub fn mismatch(
        field: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        MapperError::TypeMismatch {
            field: field.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// True for errors caused by the caller's configuration or usage rather
    /// than by the database or stored data.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            MapperError::Config(_)
                | MapperError::UnknownKind { .. }
                | MapperError::NoPrimaryKey(_)
                | MapperError::MissingKeyComponent { .. }
                | MapperError::FieldNotFound { .. }
                | MapperError::TypeMismatch { .. }
                | MapperError::NoContainerField(_)
                | MapperError::MultipleContainerFields { .. }
                | MapperError::BatchSizeExceeded { .. }
                | MapperError::EmptyBatch(_)
                | MapperError::NothingToUpdate(_)
                | MapperError::TableNotRegistered(_)
        )
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for mapping operations.
pub type Result<T> = std::result::Result<T, MapperError>;
