use std::{fs, path::{Path, PathBuf}};

use choromap::{
    aggregate_mean, load_points, load_regions, pipeline, spatial_join, Choropleth, Config, Crs, Document, Error,
    JoinOptions, PointOptions, RegionOptions, StaticToken,
};
use serde_json::{json, Value};
use shapefile::{dbase, PolygonRing};

/// Three observations in the shape of the exported dataset: two in region A,
/// one in B, one in the sea.
fn write_points(dir: &Path) -> PathBuf {
    let path = dir.join("dataset.json");
    let rows = json!([
        {"id": 1, "values": 10.0, "attributes": {"location_longitude": 0.5, "location_latitude": 0.5}},
        {"id": 2, "values": 20.0, "attributes": {"location_longitude": 0.25, "location_latitude": 0.75}},
        {"id": 3, "values": 5.0, "attributes": {"location_longitude": 1.5, "location_latitude": 0.5}},
        {"id": 4, "values": 99.0, "attributes": {"location_longitude": 5.0, "location_latitude": 5.0}},
    ]);
    fs::write(&path, rows.to_string()).unwrap();
    path
}

fn square(x: f64, y: f64) -> Value {
    json!([[[x, y], [x, y + 1.0], [x + 1.0, y + 1.0], [x + 1.0, y], [x, y]]])
}

/// Regions A = [0,1]x[0,1] and B = [1,2]x[0,1], keyed by REGION.
fn write_geojson_regions(dir: &Path) -> PathBuf {
    let path = dir.join("regions.geojson");
    let document = json!({
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {"REGION": "A", "NAME": "Alpha"}, "geometry": {"type": "Polygon", "coordinates": square(0.0, 0.0)}},
            {"type": "Feature", "properties": {"REGION": "B", "NAME": "Beta"}, "geometry": {"type": "Polygon", "coordinates": square(1.0, 0.0)}},
        ],
    });
    fs::write(&path, document.to_string()).unwrap();
    path
}

/// The same two regions as a shapefile bundle with a WGS 84 `.prj`.
fn write_shapefile_regions(dir: &Path) -> PathBuf {
    let path = dir.join("Regions.shp");
    let table = dbase::TableWriterBuilder::new()
        .add_character_field("REGION".try_into().unwrap(), 50);
    let mut writer = shapefile::Writer::from_path(&path, table).unwrap();

    for (name, x) in [("A", 0.0), ("B", 1.0)] {
        let ring = vec![
            shapefile::Point::new(x, 0.0),
            shapefile::Point::new(x, 1.0),
            shapefile::Point::new(x + 1.0, 1.0),
            shapefile::Point::new(x + 1.0, 0.0),
            shapefile::Point::new(x, 0.0),
        ];
        let polygon = shapefile::Polygon::new(PolygonRing::Outer(ring));
        let mut record = dbase::Record::default();
        record.insert("REGION".to_string(), dbase::FieldValue::Character(Some(name.to_string())));
        writer.write_shape_and_record(&polygon, &record).unwrap();
    }
    drop(writer);

    fs::write(
        path.with_extension("prj"),
        r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#,
    ).unwrap();
    path
}

fn point_options() -> PointOptions {
    PointOptions::new("attributes.location_longitude", "attributes.location_latitude")
}

fn write_config(dir: &Path, regions: &str, extra: &str) -> PathBuf {
    let path = dir.join("choromap.toml");
    fs::write(&path, format!(r#"
[points]
path = "dataset.json"
longitude = "attributes.location_longitude"
latitude = "attributes.location_latitude"

[regions]
path = "{regions}"

[aggregate]
key = "REGION"
value = "values"
{extra}
"#)).unwrap();
    path
}

#[test]
fn mean_per_region_from_geojson() {
    let dir = tempfile::tempdir().unwrap();
    let points = load_points(&write_points(dir.path()), &point_options()).unwrap();
    let regions = load_regions(&write_geojson_regions(dir.path()), &RegionOptions::default()).unwrap();

    let joined = spatial_join(&points, &regions, &JoinOptions::default()).unwrap();
    assert_eq!(joined.len(), 3);
    assert_eq!(joined.unmatched(), 1);

    let aggregate = aggregate_mean(&joined, "REGION", "values").unwrap();
    assert_eq!(aggregate.len(), 2);
    assert_eq!(aggregate.get("A"), Some(15.0));
    assert_eq!(aggregate.get("B"), Some(5.0));
}

#[test]
fn mean_per_region_from_shapefile() {
    let dir = tempfile::tempdir().unwrap();
    let points = load_points(&write_points(dir.path()), &point_options()).unwrap();
    let regions = load_regions(&write_shapefile_regions(dir.path()), &RegionOptions::default()).unwrap();
    assert_eq!(regions.crs(), Some(&Crs::wgs84()));
    assert_eq!(regions.len(), 2);

    let joined = spatial_join(&points, &regions, &JoinOptions::default()).unwrap();
    let aggregate = aggregate_mean(&joined, "REGION", "values").unwrap();
    assert_eq!(aggregate.locations().collect::<Vec<_>>(), vec!["A", "B"]);
    assert_eq!(aggregate.means().collect::<Vec<_>>(), vec![15.0, 5.0]);
}

#[test]
fn shapefile_geometry_survives_document_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let regions = load_regions(&write_shapefile_regions(dir.path()), &RegionOptions::default()).unwrap();

    let document = regions.to_document().unwrap();
    assert_eq!(document.resolve(&Document::key_path("REGION")), vec![Some("A".into()), Some("B".into())]);
    assert_eq!(document.geometries().unwrap(), regions.shapes());
}

#[test]
fn wrong_key_path_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let points = load_points(&write_points(dir.path()), &point_options()).unwrap();
    let regions = load_regions(&write_geojson_regions(dir.path()), &RegionOptions::default()).unwrap();
    let joined = spatial_join(&points, &regions, &JoinOptions::default()).unwrap();
    let aggregate = aggregate_mean(&joined, "REGION", "values").unwrap();
    let document = regions.to_document().unwrap();

    // "NAME" resolves in every feature but never to a region code
    let err = Choropleth::new(&document, &aggregate)
        .with_key_path(Document::key_path("NAME"))
        .render(&StaticToken::new("pk.test"))
        .unwrap_err();
    assert!(matches!(err, Error::KeyPathMismatch { .. }));

    // the bare column name, missing the properties prefix
    let err = Choropleth::new(&document, &aggregate)
        .with_key_path("REGION")
        .render(&StaticToken::new("pk.test"))
        .unwrap_err();
    assert!(matches!(err, Error::KeyPathMismatch { .. }));
}

#[test]
fn pipeline_writes_every_configured_output() {
    let dir = tempfile::tempdir().unwrap();
    write_points(dir.path());
    write_geojson_regions(dir.path());
    fs::write(dir.path().join("token"), "pk.from-file\n").unwrap();
    let config_path = write_config(dir.path(), "regions.geojson", r#"
[output]
html = "out/map.html"
figure = "out/figure.json"
svg = "out/map.svg"
aggregate = "out/aggregate.csv"
geojson = "out/regions.geojson"

[credentials]
token_file = "token"
"#);

    let config = Config::load_from_file(&config_path).unwrap();
    let report = pipeline::run(&config).unwrap();

    assert_eq!(report.points, 4);
    assert_eq!(report.joined, 3);
    assert_eq!(report.unmatched, 1);
    assert_eq!(report.written.len(), 5);
    for path in &report.written {
        assert!(path.is_file(), "{} was not written", path.display());
    }

    let figure = report.figure.unwrap();
    assert_eq!(figure.as_value()["layout"]["mapbox"]["accesstoken"], "pk.from-file");
    assert_eq!(figure.as_value()["data"][0]["featureidkey"], "properties.REGION");

    let csv = fs::read_to_string(dir.path().join("out/aggregate.csv")).unwrap();
    assert!(csv.starts_with("REGION,values,count"));
    assert!(fs::read_to_string(dir.path().join("out/map.html")).unwrap().contains("Plotly.newPlot"));
}

#[test]
fn missing_token_fails_with_authentication() {
    let dir = tempfile::tempdir().unwrap();
    write_points(dir.path());
    write_geojson_regions(dir.path());
    let config_path = write_config(dir.path(), "regions.geojson", r#"
[output]
html = "map.html"
svg = "map.svg"
aggregate = "aggregate.csv"
geojson = "regions_out.geojson"

[credentials]
token_file = "no-such-token"
"#);

    let config = Config::load_from_file(&config_path).unwrap();
    assert!(matches!(pipeline::run(&config), Err(Error::Authentication(_))));
    for name in ["map.html", "map.svg", "aggregate.csv", "regions_out.geojson"] {
        assert!(!dir.path().join(name).exists(), "{name} written despite the failed render");
    }
}

#[test]
fn key_path_mismatch_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    write_points(dir.path());
    write_geojson_regions(dir.path());
    let config_path = write_config(dir.path(), "regions.geojson", r#"
[render]
key_path = "properties.NAME"

[output]
figure = "figure.json"
svg = "map.svg"

[credentials]
token = "pk.inline"
"#);

    let config = Config::load_from_file(&config_path).unwrap();
    assert!(matches!(pipeline::run(&config), Err(Error::KeyPathMismatch { .. })));
    assert!(!dir.path().join("map.svg").exists());
    assert!(!dir.path().join("figure.json").exists());
}

#[test]
fn offline_run_needs_no_token() {
    let dir = tempfile::tempdir().unwrap();
    write_points(dir.path());
    write_shapefile_regions(dir.path());
    let config_path = write_config(dir.path(), "Regions.shp", r#"
[output]
svg = "map.svg"

[credentials]
token_file = "no-such-token"
"#);

    let config = Config::load_from_file(&config_path).unwrap();
    let report = pipeline::run(&config).unwrap();
    assert!(report.figure.is_none());
    assert!(dir.path().join("map.svg").is_file());
}

#[test]
fn crs_mismatch_stops_the_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    write_points(dir.path());
    write_geojson_regions(dir.path());
    let config_path = write_config(dir.path(), "regions.geojson", "");
    let mut config = Config::load_from_file(&config_path).unwrap();
    config.points.options = config.points.options.with_crs(Crs::epsg(3857));

    assert!(matches!(
        pipeline::run(&config),
        Err(Error::CrsMismatch { ref points, ref regions }) if points == "EPSG:3857" && regions == "EPSG:4326"
    ));
}

#[test]
fn missing_inputs_are_unreadable() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_config(dir.path(), "regions.geojson", "");
    let config = Config::load_from_file(&config_path).unwrap();
    assert!(matches!(pipeline::run(&config), Err(Error::UnreadableFile { .. })));
}
