//! Structural compatibility of MySQL column types.
//!
//! Live `COLUMN_TYPE` strings and target base types are parsed into a
//! [`ColumnFamily`]. Two types are compatible when they are in the same
//! family and the live column is at least as permissive as the target.

/// A parsed MySQL column type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnFamily {
    /// `tinyint`/`bool` (1) → `bigint` (5).
    Integer { rank: u8, unsigned: bool },
    /// `float` (1), `double`/`real` (2).
    Float { rank: u8 },
    Decimal { precision: u32, scale: u32 },
    /// Character types; `length` is the maximum length.
    Text { length: u64 },
    /// Binary types; `length` is the maximum length.
    Blob { length: u64 },
    /// `date` (0), `timestamp` (1), `datetime` (2), with fractional seconds.
    /// `timestamp` covers only 1970 to 2038, so it cannot hold a `datetime`.
    DateTime { rank: u8, fsp: u32 },
    /// Anything else, compared by normalized text.
    Other(String),
}

const TINY: u64 = 255;
const REGULAR: u64 = 65_535;
const MEDIUM: u64 = 16_777_215;
const LONG: u64 = 4_294_967_295;

impl ColumnFamily {
    /// Parse a column type such as `int(11) unsigned` or `varchar(191)`.
    pub fn parse(sql_type: &str) -> Self {
        let normalized = sql_type.trim().to_ascii_lowercase();
        let name_end = normalized
            .find(|c: char| c == '(' || c.is_whitespace())
            .unwrap_or(normalized.len());
        let name = &normalized[..name_end];
        let rest = &normalized[name_end..];

        let args: Vec<u64> = match (rest.find('('), rest.find(')')) {
            (Some(open), Some(close)) if open < close => rest[open + 1..close]
                .split(',')
                .filter_map(|a| a.trim().parse().ok())
                .collect(),
            _ => Vec::new(),
        };
        let arg = |i: usize, default: u64| args.get(i).copied().unwrap_or(default);
        let unsigned = rest.split_whitespace().any(|w| w == "unsigned");

        match name {
            "tinyint" | "bool" | "boolean" => ColumnFamily::Integer { rank: 1, unsigned },
            "smallint" => ColumnFamily::Integer { rank: 2, unsigned },
            "mediumint" => ColumnFamily::Integer { rank: 3, unsigned },
            "int" | "integer" => ColumnFamily::Integer { rank: 4, unsigned },
            "bigint" => ColumnFamily::Integer { rank: 5, unsigned },

            "float" if arg(0, 0) > 24 => ColumnFamily::Float { rank: 2 },
            "float" => ColumnFamily::Float { rank: 1 },
            "double" | "real" => ColumnFamily::Float { rank: 2 },

            "decimal" | "numeric" | "dec" | "fixed" => ColumnFamily::Decimal {
                precision: arg(0, 10) as u32,
                scale: arg(1, 0) as u32,
            },

            "char" => ColumnFamily::Text { length: arg(0, 1) },
            "varchar" => ColumnFamily::Text { length: arg(0, 1) },
            "tinytext" => ColumnFamily::Text { length: TINY },
            "text" => ColumnFamily::Text { length: REGULAR },
            "mediumtext" => ColumnFamily::Text { length: MEDIUM },
            "longtext" => ColumnFamily::Text { length: LONG },

            "binary" => ColumnFamily::Blob { length: arg(0, 1) },
            "varbinary" => ColumnFamily::Blob { length: arg(0, 1) },
            "tinyblob" => ColumnFamily::Blob { length: TINY },
            "blob" => ColumnFamily::Blob { length: REGULAR },
            "mediumblob" => ColumnFamily::Blob { length: MEDIUM },
            "longblob" => ColumnFamily::Blob { length: LONG },

            "date" => ColumnFamily::DateTime { rank: 0, fsp: 0 },
            "timestamp" => ColumnFamily::DateTime {
                rank: 1,
                fsp: arg(0, 0) as u32,
            },
            "datetime" => ColumnFamily::DateTime {
                rank: 2,
                fsp: arg(0, 0) as u32,
            },

            _ => ColumnFamily::Other(normalized.split_whitespace().collect::<Vec<_>>().join(" ")),
        }
    }

    /// Whether a column of this type can hold every value of `target`.
    pub fn holds(&self, target: &ColumnFamily) -> bool {
        use ColumnFamily::*;
        match (self, target) {
            (
                Integer { rank, unsigned },
                Integer {
                    rank: want,
                    unsigned: want_unsigned,
                },
            ) => match (unsigned, want_unsigned) {
                (false, true) => rank > want,
                (true, false) => false,
                _ => rank >= want,
            },
            (Float { rank }, Float { rank: want }) => rank >= want,
            (
                Decimal { precision, scale },
                Decimal {
                    precision: want_precision,
                    scale: want_scale,
                },
            ) => {
                scale >= want_scale
                    && precision.saturating_sub(*scale) >= want_precision.saturating_sub(*want_scale)
            }
            (Text { length }, Text { length: want }) => length >= want,
            (Blob { length }, Blob { length: want }) => length >= want,
            (DateTime { rank, fsp }, DateTime { rank: want, fsp: want_fsp }) => {
                rank >= want && fsp >= want_fsp
            }
            (Other(live), Other(want)) => live == want,
            _ => false,
        }
    }
}

/// Whether the live column type `live` can stand in for `target`.
pub fn is_type_compatible(live: &str, target: &str) -> bool {
    ColumnFamily::parse(live).holds(&ColumnFamily::parse(target))
}
