use ahash::AHashSet;
use geo::{Contains, Intersects, Point};
use polars::prelude::{Column, DataFrame, IdxCa, IdxSize};
use serde::Deserialize;
use tracing::{debug, info};

use crate::{common, crs::Crs, error::{Error, Result}, table::{PointTable, RegionTable}};

/// Name of the column holding the matched region's row index.
pub const INDEX_RIGHT: &str = "index_right";

/// Suffix for carried region columns whose name is already taken by a point column.
pub const RIGHT_SUFFIX: &str = "_right";

/// Geometric predicate deciding whether a point matches a region.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Predicate {
    /// Point lies strictly inside the region; points on an edge do not match.
    #[default]
    Within,
    /// Point lies inside or on the boundary of the region.
    Intersects,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct JoinOptions {
    #[serde(default)]
    pub predicate: Predicate,
    /// Region columns to carry onto matched points; all of them when `None`.
    #[serde(default)]
    pub columns: Option<Vec<String>>,
}

impl JoinOptions {
    pub fn with_predicate(mut self, predicate: Predicate) -> Self { self.predicate = predicate; self }

    pub fn with_columns<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }
}

/// Points that matched a region, one row per (point, region) match, carrying
/// the point's attributes plus the region's.
#[derive(Debug, Clone)]
pub struct JoinedTable {
    data: DataFrame,
    points: Vec<Point<f64>>,
    point_rows: Vec<usize>,
    region_rows: Vec<usize>,
    crs: Crs,
    unmatched: usize,
}

impl JoinedTable {
    #[inline] pub fn data(&self) -> &DataFrame { &self.data }

    #[inline] pub fn points(&self) -> &[Point<f64>] { &self.points }

    /// Source row in the point table, per joined row.
    #[inline] pub fn point_rows(&self) -> &[usize] { &self.point_rows }

    /// Matched row in the region table, per joined row.
    #[inline] pub fn region_rows(&self) -> &[usize] { &self.region_rows }

    #[inline] pub fn crs(&self) -> &Crs { &self.crs }

    #[inline] pub fn len(&self) -> usize { self.points.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.points.is_empty() }

    /// Points that matched no region and were dropped.
    #[inline] pub fn unmatched(&self) -> usize { self.unmatched }
}

/// Fail unless both tables are labelled with the same CRS.
pub fn check_crs(points: &Crs, regions: Option<&Crs>) -> Result<()> {
    match regions {
        Some(regions) if regions == points => Ok(()),
        Some(regions) => Err(Error::CrsMismatch { points: points.to_string(), regions: regions.to_string() }),
        None => Err(Error::CrsMismatch { points: points.to_string(), regions: "unknown".to_string() }),
    }
}

/// Inner spatial join of points onto the regions that contain them.
///
/// Output rows are ordered by point row, then region row. A point matched by
/// several regions appears once per match; unmatched points are dropped.
/// Neither table may carry a column named [`INDEX_RIGHT`].
pub fn spatial_join(points: &PointTable, regions: &RegionTable, options: &JoinOptions) -> Result<JoinedTable> {
    check_crs(points.crs(), regions.crs())?;

    let region_columns = match &options.columns {
        Some(columns) => {
            for column in columns {
                common::require_column(regions.data(), column)?;
            }
            columns.clone()
        }
        None => common::column_names(regions.data()),
    };

    let taken: AHashSet<String> = common::column_names(points.data()).into_iter().collect();
    let carried_name = |name: &str| {
        if taken.contains(name) { format!("{name}{RIGHT_SUFFIX}") } else { name.to_string() }
    };
    if taken.contains(INDEX_RIGHT) || region_columns.iter().any(|name| carried_name(name) == INDEX_RIGHT) {
        return Err(Error::ReservedColumn(INDEX_RIGHT.to_string()));
    }

    let mut left: Vec<IdxSize> = Vec::new();
    let mut right: Vec<IdxSize> = Vec::new();
    let mut unmatched = 0;

    for (i, point) in points.points().iter().enumerate() {
        let before = left.len();
        for j in regions.geoms().candidates(point) {
            let shape = &regions.shapes()[j];
            let hit = match options.predicate {
                Predicate::Within => shape.contains(point),
                Predicate::Intersects => shape.intersects(point),
            };
            if hit {
                left.push(i as IdxSize);
                right.push(j as IdxSize);
            }
        }
        if left.len() == before { unmatched += 1 }
    }
    debug!("[join] {} matches, {} unmatched points ({:?})", left.len(), unmatched, options.predicate);

    let mut data = points.data().take(&IdxCa::from_vec("left".into(), left.clone()))?;

    if !region_columns.is_empty() {
        let carried = regions.data()
            .select(region_columns.iter().map(String::as_str))?
            .take(&IdxCa::from_vec("right".into(), right.clone()))?;

        for column in carried.get_columns() {
            let mut column = column.clone();
            let name = carried_name(column.name().as_str());
            column.rename(name.into());
            data.with_column(column)?;
        }
    }
    data.with_column(Column::new(INDEX_RIGHT.into(), right.clone()))?;

    let joined = JoinedTable {
        data,
        points: left.iter().map(|&i| points.points()[i as usize]).collect(),
        point_rows: left.into_iter().map(|i| i as usize).collect(),
        region_rows: right.into_iter().map(|j| j as usize).collect(),
        crs: points.crs().clone(),
        unmatched,
    };
    info!("[join] joined {} of {} points onto {} regions", points.len() - unmatched, points.len(), regions.len());
    Ok(joined)
}
