use std::path::Path;

use geo::Point;
use polars::prelude::{DataFrame, IdxCa, IdxSize};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::{common, crs::Crs, error::{Error, Result}, io};

/// What to do with rows whose coordinates are missing, non-numeric,
/// non-finite, or outside the valid range of a geographic CRS.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidCoordinates {
    /// Fail with `InvalidCoordinate` on the first bad row.
    #[default]
    Reject,
    /// Drop bad rows and report how many were dropped.
    Drop,
}

/// Which columns hold the coordinates, and how to tag them.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct PointOptions {
    pub longitude: String,
    pub latitude: String,
    #[serde(default)]
    pub crs: Crs,
    #[serde(default)]
    pub invalid: InvalidCoordinates,
}

impl PointOptions {
    pub fn new(longitude: impl Into<String>, latitude: impl Into<String>) -> Self {
        Self {
            longitude: longitude.into(),
            latitude: latitude.into(),
            crs: Crs::default(),
            invalid: InvalidCoordinates::default(),
        }
    }

    pub fn with_crs(mut self, crs: Crs) -> Self { self.crs = crs; self }

    pub fn with_invalid(mut self, invalid: InvalidCoordinates) -> Self { self.invalid = invalid; self }
}

/// A geometric table of point observations: the source attributes plus one
/// point per row, all in the same CRS.
#[derive(Debug, Clone)]
pub struct PointTable {
    data: DataFrame,
    points: Vec<Point<f64>>,
    crs: Crs,
    dropped: usize,
}

/// Load a record dataset and build point geometries from two of its columns.
pub fn load_points(path: &Path, options: &PointOptions) -> Result<PointTable> {
    debug!("[points] loading {}", path.display());
    let table = PointTable::from_dataframe(io::read_records(path)?, options)?;
    info!("[points] loaded {} points from {} ({} dropped)", table.len(), path.display(), table.dropped());
    Ok(table)
}

impl PointTable {
    /// Build the point geometry column from `options.longitude` / `options.latitude`.
    pub fn from_dataframe(data: DataFrame, options: &PointOptions) -> Result<Self> {
        let lons = common::column_as_f64(common::require_column(&data, &options.longitude)?)?;
        let lats = common::column_as_f64(common::require_column(&data, &options.latitude)?)?;

        let mut points = Vec::with_capacity(lons.len());
        let mut keep: Vec<IdxSize> = Vec::with_capacity(lons.len());

        for (row, (lon, lat)) in lons.into_iter().zip(lats).enumerate() {
            let checked = check_coordinate(lon, -180.0..=180.0, &options.crs)
                .map_err(|reason| (&options.longitude, reason))
                .and_then(|x| check_coordinate(lat, -90.0..=90.0, &options.crs)
                    .map(|y| (x, y))
                    .map_err(|reason| (&options.latitude, reason)));

            match (checked, options.invalid) {
                (Ok((x, y)), _) => {
                    points.push(Point::new(x, y));
                    keep.push(row as IdxSize);
                }
                (Err((column, reason)), InvalidCoordinates::Reject) => {
                    return Err(Error::InvalidCoordinate { row, column: column.clone(), reason });
                }
                (Err((column, reason)), InvalidCoordinates::Drop) => {
                    debug!("[points] dropping row {row}: {column}: {reason}");
                }
            }
        }

        let dropped = data.height() - points.len();
        let data = if dropped > 0 {
            warn!("[points] dropped {dropped} rows with invalid coordinates");
            data.take(&IdxCa::from_vec("idx".into(), keep))?
        } else {
            data
        };

        Ok(Self { data, points, crs: options.crs.clone(), dropped })
    }

    /// Attribute columns, one row per point.
    #[inline] pub fn data(&self) -> &DataFrame { &self.data }

    #[inline] pub fn points(&self) -> &[Point<f64>] { &self.points }

    /// Attribute column names. Object keys come out sorted by name.
    pub fn column_names(&self) -> Vec<String> { common::column_names(&self.data) }

    #[inline] pub fn crs(&self) -> &Crs { &self.crs }

    #[inline] pub fn len(&self) -> usize { self.points.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.points.is_empty() }

    /// Rows removed under `InvalidCoordinates::Drop`.
    #[inline] pub fn dropped(&self) -> usize { self.dropped }
}

/// Validate one coordinate value; the range only applies to geographic CRSs.
fn check_coordinate(value: Option<f64>, range: std::ops::RangeInclusive<f64>, crs: &Crs) -> Result<f64, String> {
    let value = value.ok_or_else(|| "missing or non-numeric value".to_string())?;
    if !value.is_finite() {
        return Err(format!("{value} is not finite"));
    }
    if crs.is_geographic() && !range.contains(&value) {
        return Err(format!("{value} is outside [{}, {}]", range.start(), range.end()));
    }
    Ok(value)
}
