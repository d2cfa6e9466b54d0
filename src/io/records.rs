//! Record-oriented dataset reading (JSON array, JSON Lines, CSV).

use std::path::Path;

use polars::{frame::DataFrame, io::SerReader, prelude::CsvReader};
use serde_json::{Map, Value};

use crate::{common, error::{Error, Result}};

/// Read a record dataset from `path` into a DataFrame. Nested objects are
/// flattened into dotted-path columns.
///
/// `.csv` files go through the Polars CSV reader; everything else is parsed
/// as either a JSON array of objects or JSON Lines, decided by the first
/// non-whitespace byte.
pub(crate) fn read_records(path: &Path) -> Result<DataFrame> {
    let is_csv = path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

    if is_csv {
        let file = common::open_file(path)?;
        return CsvReader::new(file)
            .finish()
            .map_err(|e| Error::format(path, format!("failed to read CSV: {e}")));
    }

    let bytes = common::read_file(path)?;
    let rows = parse_json_records(&bytes).map_err(|reason| Error::format(path, reason))?;
    common::rows_to_dataframe(&rows)
}

/// Parse JSON array or JSON Lines bytes into flattened rows.
fn parse_json_records(bytes: &[u8]) -> std::result::Result<Vec<Map<String, Value>>, String> {
    let text = std::str::from_utf8(bytes).map_err(|e| format!("not UTF-8: {e}"))?;

    let values: Vec<Value> = match text.trim_start().as_bytes().first() {
        None => return Ok(Vec::new()),
        Some(b'[') => serde_json::from_str(text).map_err(|e| format!("invalid JSON array: {e}"))?,
        Some(b'{') => text.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| serde_json::from_str(line).map_err(|e| format!("invalid JSON on line {}: {e}", i + 1)))
            .collect::<std::result::Result<_, _>>()?,
        Some(_) => return Err("expected a JSON array of records or JSON Lines".to_string()),
    };

    values.iter()
        .enumerate()
        .map(|(i, value)| value.as_object()
            .map(common::flatten_object)
            .ok_or_else(|| format!("record {i} is not an object")))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use polars::prelude::DataType;

    use super::*;

    #[test]
    fn reads_json_array_with_nested_attributes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.json");
        fs::write(&path, r#"[
            {"id": "a", "values": 10, "attributes": {"location_longitude": 121.5, "location_latitude": 14.6}},
            {"id": "b", "values": 20.5, "attributes": {"location_longitude": 122.0, "location_latitude": 10.3}}
        ]"#).unwrap();

        let df = read_records(&path).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.column("attributes.location_longitude").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("values").unwrap().dtype(), &DataType::Float64);
    }

    #[test]
    fn reads_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.jsonl");
        fs::write(&path, "{\"x\": 1}\n\n{\"x\": 2}\n").unwrap();
        assert_eq!(read_records(&path).unwrap().height(), 2);
    }

    #[test]
    fn reads_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.csv");
        fs::write(&path, "lon,lat,values\n1.5,2.5,3\n").unwrap();
        let df = read_records(&path).unwrap();
        assert_eq!(df.height(), 1);
        assert_eq!(df.width(), 3);
    }

    #[test]
    fn rejects_non_record_json() {
        assert!(parse_json_records(b"42").is_err());
        assert!(parse_json_records(b"[1, 2]").is_err());
        assert!(parse_json_records(b"[{\"a\": 1}").is_err());
    }

    #[test]
    fn empty_file_has_no_records() {
        assert!(parse_json_records(b"  \n").unwrap().is_empty());
    }
}
