//! Statement arguments and raw result rows.
//!
//! [`SqlValue`] is what the statement builder binds to `?` placeholders.
//! Rows come back as raw column bytes ([`RawRow`]) and are decoded by the
//! field codec, so connections never need to know about message types.

use std::borrow::Cow;

/// Positional statement argument.
///
/// Uses `Cow` for string and byte data so callers can bind borrowed values
/// without copying. Statements produced by the builder own their arguments
/// (`SqlValue<'static>`).
///
/// # Example
///
/// ```rust
/// use std::borrow::Cow;
/// use proto_mysql::core::SqlValue;
///
/// let borrowed: SqlValue<'_> = SqlValue::Text(Cow::Borrowed("hello"));
/// let owned: SqlValue<'static> = borrowed.into_owned();
/// assert_eq!(owned, SqlValue::from("hello".to_string()));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue<'a> {
    /// SQL NULL.
    Null,

    Bool(bool),

    I64(i64),

    U64(u64),

    F32(f32),

    F64(f64),

    /// Text data.
    Text(Cow<'a, str>),

    /// Binary data.
    Bytes(Cow<'a, [u8]>),
}

impl<'a> SqlValue<'a> {
    /// Convert to a fully owned value with `'static` lifetime.
    #[must_use]
    pub fn into_owned(self) -> SqlValue<'static> {
        match self {
            SqlValue::Null => SqlValue::Null,
            SqlValue::Bool(v) => SqlValue::Bool(v),
            SqlValue::I64(v) => SqlValue::I64(v),
            SqlValue::U64(v) => SqlValue::U64(v),
            SqlValue::F32(v) => SqlValue::F32(v),
            SqlValue::F64(v) => SqlValue::F64(v),
            SqlValue::Text(s) => SqlValue::Text(Cow::Owned(s.into_owned())),
            SqlValue::Bytes(b) => SqlValue::Bytes(Cow::Owned(b.into_owned())),
        }
    }

    /// Check if this value is NULL.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Create a Text value from an owned String.
    #[inline]
    pub fn text_owned(s: String) -> SqlValue<'static> {
        SqlValue::Text(Cow::Owned(s))
    }

    /// Create a Bytes value from an owned Vec.
    #[inline]
    pub fn bytes_owned(b: Vec<u8>) -> SqlValue<'static> {
        SqlValue::Bytes(Cow::Owned(b))
    }

    /// The value as MySQL returns it in a text result row: decimal digits for
    /// numbers, `1`/`0` for booleans, raw bytes otherwise. `None` for NULL.
    pub fn to_row_bytes(&self) -> Option<Vec<u8>> {
        match self {
            SqlValue::Null => None,
            SqlValue::Bool(v) => Some(if *v { b"1".to_vec() } else { b"0".to_vec() }),
            SqlValue::I64(v) => Some(v.to_string().into_bytes()),
            SqlValue::U64(v) => Some(v.to_string().into_bytes()),
            SqlValue::F32(v) => Some(v.to_string().into_bytes()),
            SqlValue::F64(v) => Some(v.to_string().into_bytes()),
            SqlValue::Text(s) => Some(s.as_bytes().to_vec()),
            SqlValue::Bytes(b) => Some(b.to_vec()),
        }
    }
}

impl From<bool> for SqlValue<'_> {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<i32> for SqlValue<'_> {
    fn from(v: i32) -> Self {
        SqlValue::I64(i64::from(v))
    }
}

impl From<i64> for SqlValue<'_> {
    fn from(v: i64) -> Self {
        SqlValue::I64(v)
    }
}

impl From<u32> for SqlValue<'_> {
    fn from(v: u32) -> Self {
        SqlValue::U64(u64::from(v))
    }
}

impl From<u64> for SqlValue<'_> {
    fn from(v: u64) -> Self {
        SqlValue::U64(v)
    }
}

impl From<f64> for SqlValue<'_> {
    fn from(v: f64) -> Self {
        SqlValue::F64(v)
    }
}

impl<'a> From<&'a str> for SqlValue<'a> {
    fn from(v: &'a str) -> Self {
        SqlValue::Text(Cow::Borrowed(v))
    }
}

impl From<String> for SqlValue<'_> {
    fn from(v: String) -> Self {
        SqlValue::Text(Cow::Owned(v))
    }
}

impl<'a> From<&'a [u8]> for SqlValue<'a> {
    fn from(v: &'a [u8]) -> Self {
        SqlValue::Bytes(Cow::Borrowed(v))
    }
}

impl From<Vec<u8>> for SqlValue<'_> {
    fn from(v: Vec<u8>) -> Self {
        SqlValue::Bytes(Cow::Owned(v))
    }
}

impl<'a, T> From<Option<T>> for SqlValue<'a>
where
    T: Into<SqlValue<'a>>,
{
    fn from(v: Option<T>) -> Self {
        v.map_or(SqlValue::Null, Into::into)
    }
}

/// One result row: raw column values in select-list order, `None` for NULL.
pub type RawRow = Vec<Option<Vec<u8>>>;

/// Rows returned by a query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    /// Column names in select-list order.
    pub columns: Vec<String>,

    pub rows: Vec<RawRow>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<RawRow>) -> Self {
        Self { columns, rows }
    }

    /// Number of rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column value as UTF-8 text, if present and valid.
    pub fn text(&self, row: usize, column: usize) -> Option<&str> {
        let raw = self.rows.get(row)?.get(column)?.as_deref()?;
        std::str::from_utf8(raw).ok()
    }
}
