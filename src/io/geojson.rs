//! GeoJSON FeatureCollection reading for region boundaries.

use std::path::Path;

use geo::{Geometry, MultiPolygon};
use geojson::GeoJson;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::{common, crs::Crs, error::{Error, Result}};

/// Polygons and their flattened properties, in feature order.
pub(crate) struct GeoJsonContents {
    pub(crate) shapes: Vec<MultiPolygon<f64>>,
    pub(crate) records: Vec<Map<String, Value>>,
    pub(crate) crs: Crs,
}

/// Read polygon features from a GeoJSON FeatureCollection file.
///
/// Features without geometry are skipped. The CRS comes from a legacy `crs`
/// member when present; otherwise RFC 7946 WGS 84 is assumed.
pub(crate) fn read_geojson(path: &Path) -> Result<GeoJsonContents> {
    let text = common::read_to_string(path)?;
    let geojson: GeoJson = text.parse()
        .map_err(|e| Error::format(path, format!("failed to parse GeoJSON: {e}")))?;

    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err(Error::format(path, "GeoJSON must be a FeatureCollection"));
    };

    let crs = match collection.foreign_members.as_ref().and_then(legacy_crs_name) {
        Some(name) => name.parse()
            .map_err(|e| Error::format(path, format!("unrecognized crs member: {e}")))?,
        None => Crs::wgs84(),
    };

    let mut shapes = Vec::new();
    let mut records = Vec::new();
    for (i, feature) in collection.features.into_iter().enumerate() {
        let Some(geometry) = feature.geometry else {
            warn!("[io::geojson] skipping feature {i} without geometry in {}", path.display());
            continue;
        };

        let geometry: Geometry<f64> = geometry.value.try_into()
            .map_err(|e| Error::format(path, format!("feature {i}: invalid geometry: {e}")))?;

        let shape = match geometry {
            Geometry::MultiPolygon(mp) => mp,
            Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
            other => return Err(Error::format(path, format!("feature {i} is not a polygon: {}", geometry_name(&other)))),
        };

        shapes.push(shape);
        records.push(feature.properties.as_ref().map(common::flatten_object).unwrap_or_default());
    }

    debug!("[io::geojson] read {} polygons from {} (crs: {crs})", shapes.len(), path.display());
    Ok(GeoJsonContents { shapes, records, crs })
}

/// `{"crs": {"type": "name", "properties": {"name": "EPSG:4326"}}}`
fn legacy_crs_name(members: &Map<String, Value>) -> Option<&str> {
    members.get("crs")?.get("properties")?.get("name")?.as_str()
}

fn geometry_name(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}
