//! libSQL row to JSON row conversion.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Number, Value};
use tether_core::Row;

use crate::error::DatabaseError;

/// Convert a libSQL value to JSON.
///
/// Integers and text map directly, reals become JSON numbers (NaN and
/// infinities become null), and blobs are base64-encoded strings.
#[must_use]
pub fn to_json(value: libsql::Value) -> Value {
    match value {
        libsql::Value::Null => Value::Null,
        libsql::Value::Integer(n) => Value::from(n),
        libsql::Value::Real(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        libsql::Value::Text(s) => Value::String(s),
        libsql::Value::Blob(bytes) => Value::String(STANDARD.encode(bytes)),
    }
}

/// Drain a result set into JSON rows keyed by column name, in order.
///
/// # Errors
///
/// Returns `DatabaseError` if a row cannot be read.
pub async fn collect_rows(mut rows: libsql::Rows) -> Result<Vec<Row>, DatabaseError> {
    let columns: Vec<String> = (0..rows.column_count())
        .map(|idx| {
            rows.column_name(idx)
                .map_or_else(|| format!("column{idx}"), ToString::to_string)
        })
        .collect();

    let mut out = Vec::new();
    while let Some(row) = rows.next().await? {
        let mut record = Row::new();
        for (idx, name) in (0..).zip(&columns) {
            record.insert(name.clone(), to_json(row.get_value(idx)?));
        }
        out.push(record);
    }
    Ok(out)
}
