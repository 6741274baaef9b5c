//! Conversions between driver values and [`SqlValue`] / raw row bytes.

use mysql::{Row, Value};

use crate::core::value::{RawRow, SqlValue};

/// Statement argument as a driver value.
pub fn to_mysql_value(value: &SqlValue<'_>) -> Value {
    match value {
        SqlValue::Null => Value::NULL,
        SqlValue::Bool(b) => Value::Int(i64::from(*b)),
        SqlValue::I64(v) => Value::Int(*v),
        SqlValue::U64(v) => Value::UInt(*v),
        SqlValue::F32(v) => Value::Float(*v),
        SqlValue::F64(v) => Value::Double(*v),
        SqlValue::Text(s) => Value::Bytes(s.as_bytes().to_vec()),
        SqlValue::Bytes(b) => Value::Bytes(b.to_vec()),
    }
}

pub fn to_mysql_params(args: &[SqlValue<'_>]) -> Vec<Value> {
    args.iter().map(to_mysql_value).collect()
}

/// Column value in the textual form the codec reads; `None` for NULL.
pub fn value_bytes(value: &Value) -> Option<Vec<u8>> {
    let text = match value {
        Value::NULL => return None,
        Value::Bytes(b) => return Some(b.clone()),
        Value::Int(v) => v.to_string(),
        Value::UInt(v) => v.to_string(),
        Value::Float(v) => v.to_string(),
        Value::Double(v) => v.to_string(),
        Value::Date(year, month, day, hour, minute, second, micros) => {
            let mut text = format!(
                "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                year, month, day, hour, minute, second
            );
            if *micros > 0 {
                text.push_str(&format!(".{:06}", micros));
            }
            text
        }
        Value::Time(negative, days, hours, minutes, seconds, micros) => {
            let hours = u64::from(*days) * 24 + u64::from(*hours);
            let mut text = format!(
                "{}{:02}:{:02}:{:02}",
                if *negative { "-" } else { "" },
                hours,
                minutes,
                seconds
            );
            if *micros > 0 {
                text.push_str(&format!(".{:06}", micros));
            }
            text
        }
    };
    Some(text.into_bytes())
}

/// Every column of `row` as raw bytes.
pub fn row_bytes(row: &Row) -> RawRow {
    (0..row.len())
        .map(|i| row.as_ref(i).and_then(value_bytes))
        .collect()
}
