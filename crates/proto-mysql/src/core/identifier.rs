//! Identifier validation and quoting for generated SQL.
//!
//! # Security
//!
//! SQL identifiers (table names, column names, index names) cannot be passed
//! as parameters in prepared statements - only data values can be
//! parameterized. Every identifier that ends up in generated SQL goes through
//! [`escape_name`] or [`quote_mysql`]:
//!
//! 1. Validate the identifier (non-empty, no NUL byte, at most 64 bytes)
//! 2. Leave plain names (`[A-Za-z0-9_$]`, not a reserved word) as they are
//! 3. Otherwise wrap in backticks, doubling embedded backticks

use crate::error::{MapperError, Result};

/// Maximum identifier length accepted by MySQL.
pub const MAX_IDENTIFIER_LENGTH: usize = 64;

/// Reserved words that cannot be used as bare identifiers.
const RESERVED_WORDS: &[&str] = &[
    "ACCESSIBLE", "ADD", "ALL", "ALTER", "ANALYZE", "AND", "AS", "ASC", "ASENSITIVE",
    "AUTO_INCREMENT", "BETWEEN", "BIGINT", "BINARY", "BLOB", "BOOL", "BOTH", "BY", "CALL",
    "CASE", "CHANGE", "CHAR", "CHARACTER", "CHECK", "COLLATE", "COLUMN", "CONDITION",
    "CONSTRAINT", "CONTINUE", "CREATE", "CROSS", "CURRENT_DATE", "CURRENT_TIME",
    "CURRENT_TIMESTAMP", "CURRENT_USER", "CURSOR", "DATABASE", "DATETIME", "DECIMAL", "DECLARE",
    "DEFAULT", "DELETE", "DENSE_RANK", "DESC", "DESCRIBE", "DISTINCT", "DIV", "DOUBLE", "DROP",
    "DUAL", "EACH", "ELSE", "ELSEIF", "EXISTS", "EXIT", "EXPLAIN", "FALSE", "FETCH", "FLOAT",
    "FOR", "FOREIGN", "FROM", "FULLTEXT", "GENERATED", "GRANT", "GROUP", "GROUPS", "HAVING",
    "IF", "IGNORE", "IN", "INDEX", "INNER", "INSERT", "INT", "INTEGER", "INTERVAL", "INTO",
    "IS", "ITERATE", "JOIN", "KEY", "KEYS", "KILL", "LATERAL", "LEADING", "LEAVE", "LEFT",
    "LIKE", "LIMIT", "LINES", "LOAD", "LOCK", "LONGBLOB", "LONGTEXT", "LOOP", "MATCH",
    "MEDIUMBLOB", "MEDIUMINT", "MEDIUMTEXT", "MOD", "MODIFY", "NATURAL", "NOT", "NULL",
    "NUMERIC", "OF", "ON", "OPTIMIZE", "OPTION", "OR", "ORDER", "OUT", "OUTER", "OUTFILE",
    "OVER", "PRIMARY", "PURGE", "RANGE", "RANK", "READ", "REAL", "RECURSIVE", "REFERENCES",
    "RELEASE", "RENAME", "REPEAT", "REPLACE", "REQUIRE", "RETURN", "REVOKE", "RIGHT", "ROW",
    "ROWS", "ROW_NUMBER", "SCHEMA", "SELECT", "SEPARATOR", "SET", "SHOW", "SIGNAL", "SMALLINT",
    "SPATIAL", "STORED", "STRAIGHT_JOIN", "SYSTEM", "TABLE", "TEXT", "THEN", "TIMESTAMP",
    "TINYBLOB", "TINYINT", "TINYTEXT", "TO", "TRAILING", "TRIGGER", "TRUE", "UNION", "UNIQUE",
    "UNSIGNED", "UPDATE", "USAGE", "USE", "USING", "VALUES", "VARBINARY", "VARCHAR", "VIRTUAL",
    "WHEN", "WHERE", "WHILE", "WINDOW", "WITH", "WRITE", "XOR", "ZEROFILL",
];

/// Validate an identifier for security issues.
///
/// Rejects:
/// - Empty identifiers
/// - Identifiers containing null bytes (injection vector)
/// - Identifiers exceeding maximum length
///
/// # Errors
///
/// Returns `MapperError::Config` for invalid identifiers with a descriptive message.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(MapperError::Config("Identifier cannot be empty".to_string()));
    }

    if name.contains('\0') {
        return Err(MapperError::Config(format!(
            "SECURITY: Identifier contains null byte (possible injection attempt): {:?}",
            name
        )));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(MapperError::Config(format!(
            "SECURITY: Identifier exceeds maximum length of {} bytes (got {} bytes): {:?}",
            MAX_IDENTIFIER_LENGTH,
            name.len(),
            name
        )));
    }

    Ok(())
}

/// Whether `name` is a MySQL reserved word (case-insensitive).
pub fn is_reserved_word(name: &str) -> bool {
    RESERVED_WORDS
        .iter()
        .any(|word| word.eq_ignore_ascii_case(name))
}

/// Whether `name` must be backtick-quoted to be used as an identifier.
pub fn needs_quoting(name: &str) -> bool {
    is_reserved_word(name)
        || !name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'$')
        || name.bytes().all(|b| b.is_ascii_digit())
}

/// Quote a MySQL identifier using backticks.
///
/// Escapes backticks by doubling them and wraps in backticks.
/// Validates the identifier before quoting.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(quote_mysql("users")?, "`users`");
/// assert_eq!(quote_mysql("table`name")?, "`table``name`");
/// ```
pub fn quote_mysql(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("`{}`", name.replace('`', "``")))
}

/// Render an identifier for generated SQL: bare when safe, quoted otherwise.
///
/// # Examples
///
/// ```
/// use proto_mysql::core::identifier::escape_name;
///
/// assert_eq!(escape_name("user_id").unwrap(), "user_id");
/// assert_eq!(escape_name("order").unwrap(), "`order`");
/// assert_eq!(escape_name("unit price").unwrap(), "`unit price`");
/// ```
pub fn escape_name(name: &str) -> Result<String> {
    validate_identifier(name)?;
    if needs_quoting(name) {
        quote_mysql(name)
    } else {
        Ok(name.to_string())
    }
}
