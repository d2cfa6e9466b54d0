use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the choropleth pipeline. Every variant is fatal: the
/// pipeline aborts on the first one.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot read {}: {source}", path.display())]
    UnreadableFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {}: {source}", path.display())]
    UnwritableFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("missing column {column:?} (available: {})", available.join(", "))]
    MissingColumn { column: String, available: Vec<String> },

    #[error("column {0:?} is reserved for the join output")]
    ReservedColumn(String),

    #[error("invalid coordinate in row {row}, column {column:?}: {reason}")]
    InvalidCoordinate { row: usize, column: String, reason: String },

    #[error("unrecognized file format for {}: {reason}", path.display())]
    FileFormat { path: PathBuf, reason: String },

    #[error("region table has {rows} attribute rows for {shapes} polygons")]
    RowCountMismatch { rows: usize, shapes: usize },

    #[error("CRS mismatch: points are {points}, regions are {regions}")]
    CrsMismatch { points: String, regions: String },

    #[error("key path {key_path:?} does not match the document: {reason}")]
    KeyPathMismatch { key_path: String, reason: String },

    #[error("invalid GeoJSON document: {0}")]
    InvalidDocument(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Frame(#[from] polars::error::PolarsError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub(crate) fn unreadable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::UnreadableFile { path: path.into(), source }
    }

    pub(crate) fn unwritable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::UnwritableFile { path: path.into(), source }
    }

    pub(crate) fn format(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::FileFormat { path: path.into(), reason: reason.into() }
    }

    pub(crate) fn missing_column<S: AsRef<str>>(column: &str, available: impl IntoIterator<Item = S>) -> Self {
        Self::MissingColumn {
            column: column.to_string(),
            available: available.into_iter().map(|s| s.as_ref().to_string()).collect(),
        }
    }
}
