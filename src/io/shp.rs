//! ESRI shapefile bundle reading (`.shp` + `.shx` + `.dbf`, optional `.prj`).

use std::path::Path;

use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde_json::{json, Map, Value};
use shapefile::{self as shp, dbase::FieldValue, PolygonRing, Reader, Shape};
use tracing::{debug, warn};

use crate::{common, crs::Crs, error::{Error, Result}};

/// Polygons and their attribute rows, in file order.
pub(crate) struct ShapefileContents {
    pub(crate) shapes: Vec<MultiPolygon<f64>>,
    pub(crate) records: Vec<Map<String, Value>>,
    pub(crate) crs: Option<Crs>,
}

/// Reads all polygon shapes + attribute records from a given `.shp` file path.
/// Null shapes are skipped; any other non-polygon shape is a format error.
pub(crate) fn read_shapefile(path: &Path) -> Result<ShapefileContents> {
    common::require_file_exists(path)?;

    let mut reader = Reader::from_path(path)
        .map_err(|e| Error::format(path, format!("failed to open shapefile bundle: {e}")))?;

    let mut shapes = Vec::new();
    let mut records = Vec::new();
    for (i, result) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) = result
            .map_err(|e| Error::format(path, format!("error reading shape+record {i}: {e}")))?;

        if let Shape::NullShape = shape {
            warn!("[io::shp] skipping null shape at record {i} in {}", path.display());
            continue;
        }

        let kind = shape.shapetype();
        let shape = shape_to_multipolygon(shape)
            .ok_or_else(|| Error::format(path, format!("record {i} is a {kind:?} shape, expected polygons")))?;

        shapes.push(shape);
        records.push(record_to_json(record));
    }

    let crs = read_prj(path)?;
    debug!("[io::shp] read {} polygons from {} (crs: {:?})", shapes.len(), path.display(), crs);

    Ok(ShapefileContents { shapes, records, crs })
}

/// Parse the `.prj` sidecar next to `path`, if any.
fn read_prj(path: &Path) -> Result<Option<Crs>> {
    let prj = path.with_extension("prj");
    if !prj.is_file() { return Ok(None) }

    let wkt = common::read_to_string(&prj)?;
    let crs = Crs::from_wkt(&wkt);
    if crs.is_none() {
        warn!("[io::shp] unrecognized projection in {}", prj.display());
    }
    Ok(crs)
}

/// Convert any polygon shape (2D, M or Z) to a geo::MultiPolygon<f64>.
fn shape_to_multipolygon(shape: Shape) -> Option<MultiPolygon<f64>> {
    /// Flatten a ring to (coords, is_outer), dropping M/Z.
    fn ring<P>(ring: &PolygonRing<P>, xy: impl Fn(&P) -> Coord<f64>) -> (Vec<Coord<f64>>, bool) {
        let is_outer = matches!(ring, PolygonRing::Outer(_));
        (ring.points().iter().map(xy).collect(), is_outer)
    }

    let rings: Vec<(Vec<Coord<f64>>, bool)> = match shape {
        Shape::Polygon(p) => p.rings().iter().map(|r| ring(r, |pt: &shp::Point| Coord { x: pt.x, y: pt.y })).collect(),
        Shape::PolygonM(p) => p.rings().iter().map(|r| ring(r, |pt: &shp::PointM| Coord { x: pt.x, y: pt.y })).collect(),
        Shape::PolygonZ(p) => p.rings().iter().map(|r| ring(r, |pt: &shp::PointZ| Coord { x: pt.x, y: pt.y })).collect(),
        _ => return None,
    };
    Some(rings_to_multipolygon(rings))
}

/// Group each outer ring with the inner rings that follow it (shapefile ring order).
fn rings_to_multipolygon(rings: Vec<(Vec<Coord<f64>>, bool)>) -> MultiPolygon<f64> {
    /// Ensure first and last are the same for geo::LineString coords
    fn closed(mut coords: Vec<Coord<f64>>) -> LineString<f64> {
        if coords.first() != coords.last() {
            coords.push(coords[0]);
        }
        LineString(coords)
    }

    let mut polys: Vec<Polygon<f64>> = Vec::new();
    let mut current_exterior: Option<LineString<f64>> = None;
    let mut current_holes: Vec<LineString<f64>> = Vec::new();

    for (coords, is_outer) in rings {
        if coords.is_empty() { continue }
        let ls = closed(coords);
        if is_outer {
            // flush previous polygon
            if let Some(ext) = current_exterior.take() {
                polys.push(Polygon::new(ext, std::mem::take(&mut current_holes)));
            }
            current_exterior = Some(ls);
        } else {
            current_holes.push(ls);
        }
    }
    if let Some(ext) = current_exterior {
        polys.push(Polygon::new(ext, current_holes));
    }

    MultiPolygon(polys)
}

/// Convert a dBase record to a JSON object of scalars.
fn record_to_json(record: impl IntoIterator<Item = (String, FieldValue)>) -> Map<String, Value> {
    record.into_iter()
        .map(|(field, value)| {
            let value = match value {
                FieldValue::Character(s) => s.map_or(Value::Null, |s| json!(s.trim())),
                FieldValue::Memo(s) => json!(s),
                FieldValue::Numeric(n) => n.map_or(Value::Null, |n| json!(n)),
                FieldValue::Float(f) => f.map_or(Value::Null, |f| json!(f as f64)),
                FieldValue::Double(d) => json!(d),
                FieldValue::Currency(c) => json!(c),
                FieldValue::Integer(i) => json!(i),
                FieldValue::Logical(b) => b.map_or(Value::Null, |b| json!(b)),
                FieldValue::Date(d) => d.map_or(Value::Null, |d| json!(format!("{:04}-{:02}-{:02}", d.year(), d.month(), d.day()))),
                other => json!(format!("{other:?}")),
            };
            (field, value)
        })
        .collect()
}
