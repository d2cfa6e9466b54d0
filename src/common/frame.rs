use ahash::AHashSet;
use polars::prelude::{Column, DataFrame, DataType};
use serde_json::{json, Map, Value};

use crate::error::{Error, Result};

/// Flatten a nested JSON object into dotted-path keys, so that
/// `{"attributes": {"location_longitude": 1.0}}` becomes
/// `{"attributes.location_longitude": 1.0}`.
pub(crate) fn flatten_object(obj: &Map<String, Value>) -> Map<String, Value> {
    fn flatten_into(prefix: &str, value: &Value, out: &mut Map<String, Value>) {
        match value {
            Value::Object(inner) => {
                for (key, value) in inner {
                    flatten_into(&format!("{prefix}.{key}"), value, out);
                }
            }
            _ => { out.insert(prefix.to_string(), value.clone()); }
        }
    }

    let mut out = Map::new();
    for (key, value) in obj {
        flatten_into(key, value, &mut out);
    }
    out
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Kind { Bool, Int, Float, Text }

impl Kind {
    /// Widen the running column kind to also hold `value`.
    fn widen(current: Option<Kind>, value: &Value) -> Option<Kind> {
        let next = match value {
            Value::Null => return current,
            Value::Bool(_) => Kind::Bool,
            Value::Number(n) if n.is_i64() => Kind::Int,
            Value::Number(_) => Kind::Float,
            _ => Kind::Text,
        };
        Some(match (current, next) {
            (None, next) => next,
            (Some(a), b) if a == b => a,
            (Some(Kind::Int), Kind::Float) | (Some(Kind::Float), Kind::Int) => Kind::Float,
            _ => Kind::Text,
        })
    }
}

/// Build a DataFrame from flat JSON rows. Columns appear in first-seen order
/// across rows, and within a row in the map's (sorted) key order; keys
/// missing from a row become nulls.
pub(crate) fn rows_to_dataframe(rows: &[Map<String, Value>]) -> Result<DataFrame> {
    let mut names: Vec<&str> = Vec::new();
    let mut seen = AHashSet::new();
    for row in rows {
        for key in row.keys() {
            if seen.insert(key.as_str()) { names.push(key) }
        }
    }

    let columns = names.into_iter()
        .map(|name| {
            let values = rows.iter().map(|row| row.get(name).unwrap_or(&Value::Null));
            let kind = values.clone().fold(None, Kind::widen).unwrap_or(Kind::Text);
            match kind {
                Kind::Bool => Column::new(name.into(), values.map(Value::as_bool).collect::<Vec<_>>()),
                Kind::Int => Column::new(name.into(), values.map(Value::as_i64).collect::<Vec<_>>()),
                Kind::Float => Column::new(name.into(), values.map(Value::as_f64).collect::<Vec<_>>()),
                Kind::Text => Column::new(
                    name.into(),
                    values
                        .map(|v| match v {
                            Value::Null => None,
                            Value::String(s) => Some(s.clone()),
                            other => Some(other.to_string()),
                        })
                        .collect::<Vec<_>>(),
                ),
            }
        })
        .collect::<Vec<_>>();

    Ok(DataFrame::new(columns)?)
}

/// Column names of `df` as owned strings.
pub(crate) fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names().into_iter().map(|name| name.to_string()).collect()
}

/// Look up a column, failing with `MissingColumn` if absent.
pub(crate) fn require_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column> {
    df.column(name).map_err(|_| Error::missing_column(name, column_names(df)))
}

/// Read a single cell back as a JSON scalar.
pub(crate) fn cell_to_json(column: &Column, idx: usize) -> Result<Value> {
    Ok(match column.dtype() {
        DataType::String => column.str()?.get(idx).map_or(Value::Null, |s| json!(s)),
        DataType::Int64 => column.i64()?.get(idx).map_or(Value::Null, |v| json!(v)),
        DataType::Float64 => column.f64()?.get(idx).map_or(Value::Null, |v| json!(v)),
        DataType::Boolean => column.bool()?.get(idx).map_or(Value::Null, |v| json!(v)),
        _ => {
            let column = column.cast(&DataType::String)?;
            column.str()?.get(idx).map_or(Value::Null, |s| json!(s))
        }
    })
}

/// Read a column as text, one entry per row. Numbers are rendered the same
/// way they are rendered in the GeoJSON properties, so keys compare equal
/// across the two.
pub(crate) fn column_as_keys(column: &Column) -> Result<Vec<Option<String>>> {
    (0..column.len())
        .map(|idx| Ok(match cell_to_json(column, idx)? {
            Value::Null => None,
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        }))
        .collect()
}

/// Read a column as `f64` values; nulls and non-numeric text become `None`.
pub(crate) fn column_as_f64(column: &Column) -> Result<Vec<Option<f64>>> {
    let column = match column.dtype() {
        DataType::Float64 => column.clone(),
        _ => column.cast(&DataType::Float64)?,
    };
    Ok(column.f64()?.into_iter().collect())
}
