//! TOML run configuration.
//!
//! ```toml
//! [points]
//! path = "dataset.json"
//! longitude = "attributes.location_longitude"
//! latitude = "attributes.location_latitude"
//!
//! [regions]
//! path = "Regions/Regions.shp"
//!
//! [aggregate]
//! key = "REGION"
//! value = "values"
//!
//! [output]
//! html = "map.html"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::{
    common,
    error::{Error, Result},
    join::JoinOptions,
    render::{CredentialChain, EnvToken, FileToken, RenderOptions, StaticToken, DEFAULT_TOKEN_ENV, DEFAULT_TOKEN_FILE},
    table::{PointOptions, RegionOptions},
};

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub points: PointsConfig,
    pub regions: RegionsConfig,
    #[serde(default)]
    pub join: JoinOptions,
    pub aggregate: AggregateConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct PointsConfig {
    pub path: PathBuf,
    #[serde(flatten)]
    pub options: PointOptions,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct RegionsConfig {
    pub path: PathBuf,
    #[serde(flatten)]
    pub options: RegionOptions,
}

/// Which joined column to group by, and which to average.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct AggregateConfig {
    pub key: String,
    pub value: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct RenderConfig {
    /// Overrides the `properties.<key>` path derived from the aggregate key.
    #[serde(default)]
    pub key_path: Option<String>,
    #[serde(flatten)]
    pub options: RenderOptions,
}

/// Files the pipeline writes. Nothing is written for unset entries.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Standalone plotly page.
    pub html: Option<PathBuf>,
    /// plotly figure JSON.
    pub figure: Option<PathBuf>,
    /// Offline SVG choropleth.
    pub svg: Option<PathBuf>,
    /// Aggregate table (`.csv`, `.json`, `.ndjson`).
    pub aggregate: Option<PathBuf>,
    /// Region GeoJSON document.
    pub geojson: Option<PathBuf>,
}

impl OutputConfig {
    /// Whether any output needs the base-map figure (and so a token).
    pub fn needs_figure(&self) -> bool {
        self.html.is_some() || self.figure.is_some()
    }
}

/// Where to look for the base-map access token.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Token given inline. Prefer `token_env` or `token_file` for shared configs.
    pub token: Option<String>,
    pub token_env: Option<String>,
    pub token_file: Option<PathBuf>,
}

impl CredentialsConfig {
    /// Sources in lookup order: inline token, environment variable, file.
    /// With nothing configured, `MAPBOX_ACCESS_TOKEN` then `.mapbox_token`.
    pub fn source(&self) -> CredentialChain {
        if self.token.is_none() && self.token_env.is_none() && self.token_file.is_none() {
            return CredentialChain::new()
                .with(EnvToken::new(DEFAULT_TOKEN_ENV))
                .with(FileToken::new(DEFAULT_TOKEN_FILE));
        }

        let mut chain = CredentialChain::new();
        if let Some(token) = &self.token {
            chain = chain.with(StaticToken::new(token.as_str()));
        }
        if let Some(var) = &self.token_env {
            chain = chain.with(EnvToken::new(var.as_str()));
        }
        if let Some(path) = &self.token_file {
            chain = chain.with(FileToken::new(path));
        }
        chain
    }
}

impl Config {
    /// Read a config file. Relative paths inside it are taken relative to
    /// the file's own directory.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let text = common::read_to_string(path)?;
        let base = path.parent().unwrap_or(Path::new(""));
        let config = Self::parse(&text, base)
            .map_err(|e| match e {
                Error::Config(reason) => Error::Config(format!("{}: {reason}", path.display())),
                other => other,
            })?;
        debug!("[config] loaded {}", path.display());
        Ok(config)
    }

    /// Parse config text, resolving relative paths against `base`.
    pub fn parse(text: &str, base: &Path) -> Result<Self> {
        let mut config: Config = toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.resolve_paths(base);
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() { *path = base.join(&*path) }
        };

        resolve(&mut self.points.path);
        resolve(&mut self.regions.path);
        for path in [
            &mut self.output.html,
            &mut self.output.figure,
            &mut self.output.svg,
            &mut self.output.aggregate,
            &mut self.output.geojson,
            &mut self.credentials.token_file,
        ].into_iter().flatten() {
            resolve(path);
        }
        if self.credentials == CredentialsConfig::default() {
            self.credentials.token_env = Some(DEFAULT_TOKEN_ENV.to_string());
            self.credentials.token_file = Some(base.join(DEFAULT_TOKEN_FILE));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::{crs::Crs, join::Predicate, table::InvalidCoordinates};

    const FULL: &str = r#"
        [points]
        path = "data/dataset.json"
        longitude = "attributes.location_longitude"
        latitude = "attributes.location_latitude"
        crs = "epsg:4326"
        invalid = "drop"

        [regions]
        path = "/abs/Regions.shp"
        assume_crs = "EPSG:4326"

        [join]
        predicate = "intersects"
        columns = ["REGION"]

        [aggregate]
        key = "REGION"
        value = "values"

        [render]
        style = "dark"
        zoom = 5.0
        key_path = "properties.REGION"

        [output]
        html = "out/map.html"
        svg = "out/map.svg"

        [credentials]
        token_file = "secrets/token"
    "#;

    #[test]
    fn parses_every_section() {
        let config = Config::parse(FULL, Path::new("/work")).unwrap();

        assert_eq!(config.points.path, PathBuf::from("/work/data/dataset.json"));
        assert_eq!(config.points.options.longitude, "attributes.location_longitude");
        assert_eq!(config.points.options.crs, Crs::wgs84());
        assert_eq!(config.points.options.invalid, InvalidCoordinates::Drop);
        assert_eq!(config.regions.path, PathBuf::from("/abs/Regions.shp"));
        assert_eq!(config.regions.options.assume_crs, Some(Crs::wgs84()));
        assert_eq!(config.join.predicate, Predicate::Intersects);
        assert_eq!(config.join.columns, Some(vec!["REGION".to_string()]));
        assert_eq!(config.aggregate.value, "values");
        assert_eq!(config.render.options.style, "dark");
        assert_eq!(config.render.options.colorscale, "Viridis");
        assert_eq!(config.render.options.zoom, Some(5.0));
        assert_eq!(config.render.key_path.as_deref(), Some("properties.REGION"));
        assert_eq!(config.output.html, Some(PathBuf::from("/work/out/map.html")));
        assert_eq!(config.output.figure, None);
        assert!(config.output.needs_figure());
        assert_eq!(config.credentials.token_file, Some(PathBuf::from("/work/secrets/token")));
        assert_eq!(config.credentials.source().len(), 1);
    }

    #[test]
    fn defaults_apply_to_optional_sections() {
        let config = Config::parse(r#"
            [points]
            path = "points.json"
            longitude = "lon"
            latitude = "lat"
            [regions]
            path = "regions.geojson"
            [aggregate]
            key = "REGION"
            value = "values"
        "#, Path::new("base")).unwrap();

        assert_eq!(config.points.options.invalid, InvalidCoordinates::Reject);
        assert_eq!(config.join, JoinOptions::default());
        assert_eq!(config.render.options, RenderOptions::default());
        assert!(!config.output.needs_figure());
        assert_eq!(config.credentials.token_env.as_deref(), Some(DEFAULT_TOKEN_ENV));
        assert_eq!(config.credentials.token_file, Some(PathBuf::from("base").join(DEFAULT_TOKEN_FILE)));
        assert_eq!(config.credentials.source().len(), 2);
    }

    #[test]
    fn bad_values_are_config_errors() {
        let bad_predicate = FULL.replace(r#"predicate = "intersects""#, r#"predicate = "touches""#);
        assert!(matches!(Config::parse(&bad_predicate, Path::new("")), Err(Error::Config(_))));

        let bad_crs = FULL.replace(r#"crs = "epsg:4326""#, r#"crs = "mercator""#);
        assert!(matches!(Config::parse(&bad_crs, Path::new("")), Err(Error::Config(_))));

        let unknown_section = format!("{FULL}\n[extra]\nx = 1\n");
        assert!(matches!(Config::parse(&unknown_section, Path::new("")), Err(Error::Config(_))));

        assert!(matches!(Config::parse("[points]\npath = 1", Path::new("")), Err(Error::Config(_))));
    }

    #[test]
    fn load_resolves_against_file_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("choromap.toml");
        fs::write(&path, FULL).unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.points.path, dir.path().join("data/dataset.json"));

        let missing = Config::load_from_file(&dir.path().join("nope.toml"));
        assert!(matches!(missing, Err(Error::UnreadableFile { .. })));
    }
}
