use std::path::Path;

use geo::{Geometry, LineString, MultiPolygon, Polygon};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::{common, error::{Error, Result}, table::RegionTable};

/// Member of each feature that holds the region attributes. Key paths are
/// built from this constant so they always agree with the serializer.
pub const PROPERTIES: &str = "properties";

/// GeoJSON FeatureCollection built from a region table, one feature per
/// region with `id` set to the region's row index.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    value: Value,
}

impl Document {
    /// Key path addressing `field` in each feature's properties.
    pub fn key_path(field: &str) -> String {
        format!("{PROPERTIES}.{field}")
    }

    /// Wrap an existing FeatureCollection value.
    pub fn from_value(value: Value) -> Result<Self> {
        let is_collection = value.get("type").and_then(Value::as_str) == Some("FeatureCollection")
            && value.get("features").is_some_and(Value::is_array);
        if !is_collection {
            return Err(Error::InvalidDocument("expected a FeatureCollection with a features array".into()));
        }
        Ok(Self { value })
    }

    #[inline] pub fn as_value(&self) -> &Value { &self.value }

    pub fn features(&self) -> &[Value] {
        self.value["features"].as_array().map(Vec::as_slice).unwrap_or_default()
    }

    #[inline] pub fn len(&self) -> usize { self.features().len() }

    #[inline] pub fn is_empty(&self) -> bool { self.features().is_empty() }

    /// Feature ids, in feature order.
    pub fn feature_ids(&self) -> Vec<Option<String>> {
        self.features().iter().map(|feature| scalar_key(feature.get("id")?)).collect()
    }

    /// Value found at `key_path` in each feature, rendered as a key string.
    /// Segments may themselves contain dots, as flattened property names do.
    pub fn resolve(&self, key_path: &str) -> Vec<Option<String>> {
        self.features().iter()
            .map(|feature| lookup(feature, key_path).and_then(scalar_key))
            .collect()
    }

    /// Parse the feature geometries back into MultiPolygons.
    pub fn geometries(&self) -> Result<Vec<MultiPolygon<f64>>> {
        self.features().iter().enumerate()
            .map(|(i, feature)| {
                let geometry: geojson::Geometry = serde_json::from_value(feature["geometry"].clone())?;
                let geometry: Geometry<f64> = geometry.value.try_into()
                    .map_err(|e| Error::InvalidDocument(format!("feature {i}: {e}")))?;
                match geometry {
                    Geometry::Polygon(polygon) => Ok(MultiPolygon::new(vec![polygon])),
                    Geometry::MultiPolygon(mp) => Ok(mp),
                    _ => Err(Error::InvalidDocument(format!("feature {i} is not a polygon"))),
                }
            })
            .collect()
    }

    /// Write the document as JSON text.
    pub fn write(&self, path: &Path) -> Result<()> {
        let writer = std::io::BufWriter::new(common::create_file(path)?);
        serde_json::to_writer(writer, &self.value)?;
        debug!("[render::document] wrote {} features to {}", self.len(), path.display());
        Ok(())
    }
}

/// Walk `path` into `value`, preferring the longest key that matches at each level.
fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let object = value.as_object()?;
    if let Some(found) = object.get(path) {
        return Some(found);
    }
    path.match_indices('.').rev()
        .find_map(|(at, _)| lookup(object.get(&path[..at])?, &path[at + 1..]))
}

/// Render a scalar the way `common::column_as_keys` renders cells.
fn scalar_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(_) | Value::Bool(_) => Some(value.to_string()),
        _ => None,
    }
}

fn ring_to_json(ring: &LineString<f64>) -> Value {
    json!(ring.coords().map(|c| [c.x, c.y]).collect::<Vec<_>>())
}

fn polygon_to_json(polygon: &Polygon<f64>) -> Value {
    let mut rings = vec![ring_to_json(polygon.exterior())];
    rings.extend(polygon.interiors().iter().map(ring_to_json));
    Value::Array(rings)
}

/// GeoJSON geometry for a region: a Polygon for single-part shapes,
/// a MultiPolygon otherwise.
fn multipolygon_to_json(mp: &MultiPolygon<f64>) -> Value {
    match mp.0.as_slice() {
        [polygon] => json!({ "type": "Polygon", "coordinates": polygon_to_json(polygon) }),
        polygons => json!({
            "type": "MultiPolygon",
            "coordinates": polygons.iter().map(polygon_to_json).collect::<Vec<_>>(),
        }),
    }
}

impl RegionTable {
    /// Export the regions as a GeoJSON FeatureCollection carrying every
    /// attribute column in each feature's properties.
    pub fn to_document(&self) -> Result<Document> {
        let data = self.data();
        let columns = data.get_columns();

        let features = self.shapes().iter().enumerate()
            .map(|(idx, shape)| {
                let mut properties = Map::new();
                if data.width() > 0 {
                    for column in columns {
                        properties.insert(column.name().to_string(), common::cell_to_json(column, idx)?);
                    }
                }
                Ok(json!({
                    "type": "Feature",
                    "id": idx.to_string(),
                    PROPERTIES: properties,
                    "geometry": multipolygon_to_json(shape),
                }))
            })
            .collect::<Result<Vec<_>>>()?;

        debug!("[render::document] serialized {} regions", features.len());
        Ok(Document {
            value: json!({
                "type": "FeatureCollection",
                "features": features,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use geo::polygon;
    use polars::prelude::{Column, DataFrame};

    use super::*;
    use crate::crs::Crs;

    fn table() -> RegionTable {
        let with_hole = polygon!(
            exterior: [(x: 0.0, y: 0.0), (x: 0.0, y: 4.0), (x: 4.0, y: 4.0), (x: 4.0, y: 0.0), (x: 0.0, y: 0.0)],
            interiors: [[(x: 1.0, y: 1.0), (x: 1.0, y: 2.0), (x: 2.0, y: 2.0), (x: 2.0, y: 1.0), (x: 1.0, y: 1.0)]],
        );
        let islands = MultiPolygon::new(vec![
            polygon![(x: 10.0, y: 0.0), (x: 10.0, y: 1.0), (x: 11.0, y: 1.0), (x: 10.0, y: 0.0)],
            polygon![(x: 12.5, y: 0.25), (x: 12.5, y: 1.0), (x: 13.0, y: 1.0), (x: 12.5, y: 0.25)],
        ]);
        let data = DataFrame::new(vec![
            Column::new("REGION".into(), vec!["A", "B"]),
            Column::new("code".into(), vec![1i64, 2]),
        ]).unwrap();
        RegionTable::new(data, vec![MultiPolygon::new(vec![with_hole]), islands], Some(Crs::wgs84())).unwrap()
    }

    #[test]
    fn features_carry_ids_properties_and_geometry_type() {
        let document = table().to_document().unwrap();
        let features = document.features();

        assert_eq!(document.len(), 2);
        assert_eq!(document.feature_ids(), vec![Some("0".into()), Some("1".into())]);
        assert_eq!(features[0]["properties"], json!({"REGION": "A", "code": 1}));
        assert_eq!(features[0]["geometry"]["type"], "Polygon");
        assert_eq!(features[0]["geometry"]["coordinates"].as_array().unwrap().len(), 2);
        assert_eq!(features[1]["geometry"]["type"], "MultiPolygon");
    }

    #[test]
    fn geometries_survive_serialization() {
        let table = table();
        let document = table.to_document().unwrap();

        // through text as well, the way the renderer hands it on
        let text = serde_json::to_string(document.as_value()).unwrap();
        let reparsed = Document::from_value(serde_json::from_str(&text).unwrap()).unwrap();

        assert_eq!(reparsed.geometries().unwrap(), table.shapes());
    }

    #[test]
    fn key_paths_resolve_per_feature() {
        let document = table().to_document().unwrap();

        assert_eq!(Document::key_path("REGION"), "properties.REGION");
        assert_eq!(document.resolve(&Document::key_path("REGION")), vec![Some("A".into()), Some("B".into())]);
        assert_eq!(document.resolve(&Document::key_path("code")), vec![Some("1".into()), Some("2".into())]);
        assert_eq!(document.resolve("properties.NAME"), vec![None, None]);
        assert_eq!(document.resolve("id"), vec![Some("0".into()), Some("1".into())]);
    }

    #[test]
    fn dotted_property_names_resolve() {
        let document = Document::from_value(json!({
            "type": "FeatureCollection",
            "features": [{"type": "Feature", "properties": {"meta.code": "x", "nested": {"code": "y"}}, "geometry": null}],
        })).unwrap();
        assert_eq!(document.resolve("properties.meta.code"), vec![Some("x".into())]);
        assert_eq!(document.resolve("properties.nested.code"), vec![Some("y".into())]);
    }

    #[test]
    fn non_collections_are_rejected() {
        assert!(matches!(Document::from_value(json!({"type": "Feature"})), Err(Error::InvalidDocument(_))));
    }

    #[test]
    fn writes_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/regions.geojson");
        table().to_document().unwrap().write(&path).unwrap();

        let value: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["features"].as_array().unwrap().len(), 2);
    }
}
