//! DataFrame export (CSV, JSON, JSON Lines), chosen by file extension.

use std::{io::BufWriter, path::Path};

use polars::{frame::DataFrame, io::SerWriter, prelude::{CsvWriter, JsonFormat, JsonWriter}};

use crate::{common, error::Result};

/// Writes a Polars DataFrame to `path`. `.csv` writes CSV, `.ndjson`/`.jsonl`
/// write JSON Lines, and anything else writes a JSON array of records.
pub(crate) fn write_frame(path: &Path, df: &DataFrame) -> Result<()> {
    let writer = BufWriter::new(common::create_file(path)?);
    let mut df = df.clone();

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default().to_ascii_lowercase();
    match ext.as_str() {
        "csv" => CsvWriter::new(writer).finish(&mut df)?,
        "ndjson" | "jsonl" => JsonWriter::new(writer).with_json_format(JsonFormat::JsonLines).finish(&mut df)?,
        _ => JsonWriter::new(writer).with_json_format(JsonFormat::Json).finish(&mut df)?,
    }
    Ok(())
}
