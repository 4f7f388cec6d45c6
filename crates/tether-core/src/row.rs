//! Result rows and typed field accessors.
//!
//! A check returns an ordered sequence of rows; each row maps a column name
//! to a JSON scalar. Engines disagree on how they surface integers and
//! booleans (`1`, `"1"`, `true`), so readers go through the accessors here
//! rather than matching on [`Value`] directly.

use serde_json::Value;

/// One result row: column name to scalar value, in column order.
pub type Row = serde_json::Map<String, Value>;

/// Read a column as an integer.
///
/// Accepts JSON integers, floats (truncated), booleans (`0`/`1`) and
/// numeric strings. Returns `None` for NULL, missing, or non-numeric values.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn int_field(row: &Row, key: &str) -> Option<i64> {
    match row.get(key)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::Bool(b) => Some(i64::from(*b)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Read a column as text. Returns `None` for NULL, missing, or non-string values.
#[must_use]
pub fn text_field<'a>(row: &'a Row, key: &str) -> Option<&'a str> {
    row.get(key)?.as_str()
}

/// Interpret a column as a flag.
///
/// Non-zero numbers, `true`, and the strings `"1"`, `"true"`, `"yes"`
/// (any case) are truthy. Everything else, including NULL, is false.
#[must_use]
pub fn is_truthy(row: &Row, key: &str) -> bool {
    match row.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(_)) => int_field(row, key).is_some_and(|n| n != 0),
        Some(Value::String(s)) => {
            let s = s.trim();
            s == "1" || s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("yes")
        }
        _ => false,
    }
}

/// Build a row from `(column, value)` pairs, preserving their order.
pub fn row_from<I, K>(pairs: I) -> Row
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}
