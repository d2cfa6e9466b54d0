use std::path::Path;

use geo::{MultiPolygon, Rect};
use polars::frame::DataFrame;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::{common, crs::Crs, error::{Error, Result}, geom::Geometries, io};

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct RegionOptions {
    /// CRS to use when the file declares none. Never overrides a declared CRS.
    #[serde(default)]
    pub assume_crs: Option<Crs>,
}

/// A geometric table of region boundaries: attribute rows plus one
/// MultiPolygon per row.
#[derive(Debug, Clone)]
pub struct RegionTable {
    data: DataFrame,
    geoms: Geometries,
}

/// Load a boundary file (`.shp` bundle or GeoJSON) into a region table.
pub fn load_regions(path: &Path, options: &RegionOptions) -> Result<RegionTable> {
    debug!("[regions] loading {}", path.display());

    let extension = path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let (shapes, records, crs) = match extension.as_str() {
        "shp" => {
            let contents = io::read_shapefile(path)?;
            (contents.shapes, contents.records, contents.crs)
        }
        "json" | "geojson" => {
            let contents = io::read_geojson(path)?;
            (contents.shapes, contents.records, Some(contents.crs))
        }
        _ => {
            common::require_file_exists(path)?;
            return Err(Error::format(path, format!("unsupported boundary format {extension:?} (expected .shp, .json or .geojson)")));
        }
    };

    let crs = match (crs, &options.assume_crs) {
        (Some(crs), _) => Some(crs),
        (None, Some(assumed)) => {
            warn!("[regions] {} declares no CRS, assuming {assumed}", path.display());
            Some(assumed.clone())
        }
        (None, None) => {
            warn!("[regions] {} declares no CRS", path.display());
            None
        }
    };

    let table = RegionTable::new(common::rows_to_dataframe(&records)?, shapes, crs)?;
    info!("[regions] loaded {} regions from {}", table.len(), path.display());
    Ok(table)
}

impl RegionTable {
    /// Pair attribute rows with their polygons. A frame without columns is
    /// allowed for files that carry no attributes.
    pub fn new(data: DataFrame, shapes: Vec<MultiPolygon<f64>>, crs: Option<Crs>) -> Result<Self> {
        if data.width() > 0 && data.height() != shapes.len() {
            return Err(Error::RowCountMismatch { rows: data.height(), shapes: shapes.len() });
        }
        Ok(Self { data, geoms: Geometries::new(shapes, crs) })
    }

    /// Attribute columns, one row per region.
    #[inline] pub fn data(&self) -> &DataFrame { &self.data }

    #[inline] pub fn shapes(&self) -> &[MultiPolygon<f64>] { self.geoms.shapes() }

    /// Attribute column names. Property keys come out sorted by name.
    pub fn column_names(&self) -> Vec<String> { common::column_names(&self.data) }

    /// The CRS declared by the boundary file (or assumed), if known.
    #[inline] pub fn crs(&self) -> Option<&Crs> { self.geoms.crs() }

    /// Replace the CRS label. This does not transform coordinates.
    pub fn with_crs(mut self, crs: Crs) -> Self {
        self.geoms.set_crs(Some(crs));
        self
    }

    #[inline] pub fn len(&self) -> usize { self.geoms.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.geoms.len() == 0 }

    /// Bounding rectangle of all regions.
    #[inline] pub fn bounds(&self) -> Option<Rect<f64>> { self.geoms.bounds() }

    #[inline] pub(crate) fn geoms(&self) -> &Geometries { &self.geoms }
}
