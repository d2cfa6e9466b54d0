use std::{io::Write, path::Path};

use ahash::AHashSet;
use geo::{Coord, Rect};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::{
    common,
    error::{Error, Result},
    geom::Geometries,
    join::Aggregate,
    render::{CredentialSource, Document},
};

/// plotly.js build loaded by exported HTML pages.
pub const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

/// Presentation settings for the rendered map.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Base-map style name, e.g. `light`, `dark`, `streets`.
    pub style: String,
    /// plotly colorscale name.
    pub colorscale: String,
    /// Initial zoom; derived from the region extent when unset.
    pub zoom: Option<f64>,
    pub opacity: f64,
    pub title: Option<String>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            style: "light".into(),
            colorscale: "Viridis".into(),
            zoom: None,
            opacity: 0.8,
            title: None,
        }
    }
}

/// A choropleth request: regions, per-region values, and the key path that
/// pairs them.
#[derive(Clone, Debug)]
pub struct Choropleth<'a> {
    document: &'a Document,
    aggregate: &'a Aggregate,
    key_path: String,
    options: RenderOptions,
    bounds: Option<Rect<f64>>,
}

impl<'a> Choropleth<'a> {
    /// Pair `aggregate` with `document` through `properties.<aggregate key>`.
    pub fn new(document: &'a Document, aggregate: &'a Aggregate) -> Self {
        Self {
            document,
            aggregate,
            key_path: Document::key_path(aggregate.key()),
            options: RenderOptions::default(),
            bounds: None,
        }
    }

    pub fn with_key_path(mut self, key_path: impl Into<String>) -> Self {
        self.key_path = key_path.into();
        self
    }

    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    /// Region extent used to center the map, e.g. [`RegionTable::bounds`].
    /// Taken from the document geometries when not given.
    ///
    /// [`RegionTable::bounds`]: crate::table::RegionTable::bounds
    pub fn with_bounds(mut self, bounds: Option<Rect<f64>>) -> Self {
        self.bounds = bounds;
        self
    }

    #[inline] pub fn key_path(&self) -> &str { &self.key_path }

    #[inline] pub fn options(&self) -> &RenderOptions { &self.options }

    /// Check the key path against the document and return the aggregate rows
    /// that match a feature. Fails when the path resolves nowhere or when no
    /// aggregate location matches.
    pub fn validate(&self) -> Result<Vec<usize>> {
        let resolved: AHashSet<String> = self.document.resolve(&self.key_path)
            .into_iter()
            .flatten()
            .collect();

        if resolved.is_empty() {
            return Err(Error::KeyPathMismatch {
                key_path: self.key_path.clone(),
                reason: format!("it resolves for none of the {} features", self.document.len()),
            });
        }

        let mut matched = Vec::with_capacity(self.aggregate.len());
        for (i, row) in self.aggregate.rows().iter().enumerate() {
            if resolved.contains(&row.key) {
                matched.push(i);
            } else {
                warn!("[render::choropleth] location {:?} matches no feature at {}", row.key, self.key_path);
            }
        }

        if matched.is_empty() && !self.aggregate.is_empty() {
            return Err(Error::KeyPathMismatch {
                key_path: self.key_path.clone(),
                reason: format!("none of the {} locations appear in the document", self.aggregate.len()),
            });
        }

        debug!("[render::choropleth] {} of {} locations matched", matched.len(), self.aggregate.len());
        Ok(matched)
    }

    /// Build the plotly figure. The key path is validated first; the access
    /// token is only fetched once the request is known to be well-formed.
    pub fn render(&self, credentials: &dyn CredentialSource) -> Result<Figure> {
        let matched = self.validate()?;
        let token = credentials.token()?;

        let rows = self.aggregate.rows();
        let locations: Vec<&str> = matched.iter().map(|&i| rows[i].key.as_str()).collect();
        let z: Vec<f64> = matched.iter().map(|&i| rows[i].mean).collect();

        let bounds = match self.bounds {
            Some(bounds) => Some(bounds),
            None => Geometries::new(self.document.geometries()?, None).bounds(),
        };
        let center = bounds.map_or(Coord { x: 0.0, y: 0.0 }, |b| b.center());
        let zoom = self.options.zoom.unwrap_or_else(|| bounds.map_or(1.0, zoom_for));

        let mut layout = json!({
            "mapbox": {
                "style": self.options.style,
                "accesstoken": token,
                "center": { "lon": center.x, "lat": center.y },
                "zoom": zoom,
            },
            "margin": { "r": 0, "t": 0, "l": 0, "b": 0 },
        });
        if let Some(title) = &self.options.title {
            layout["title"] = json!({ "text": title });
            layout["margin"]["t"] = json!(40);
        }

        let figure = Figure {
            value: json!({
                "data": [{
                    "type": "choroplethmapbox",
                    "geojson": self.document.as_value(),
                    "featureidkey": self.key_path,
                    "locations": locations,
                    "z": z,
                    "colorscale": self.options.colorscale,
                    "marker": { "opacity": self.options.opacity },
                    "colorbar": { "title": { "text": self.aggregate.value() } },
                }],
                "layout": layout,
            }),
        };
        info!("[render::choropleth] rendered {} regions keyed by {}", locations.len(), self.key_path);
        Ok(figure)
    }
}

/// Web-mercator zoom level that roughly fits `bounds` in a typical viewport.
fn zoom_for(bounds: Rect<f64>) -> f64 {
    let span = bounds.width().max(bounds.height() * 2.0);
    if span <= 0.0 { return 10.0 }
    (360.0 / span).log2().clamp(0.0, 18.0)
}

/// A rendered plotly figure (`{"data": [...], "layout": {...}}`).
#[derive(Clone, Debug, PartialEq)]
pub struct Figure {
    value: Value,
}

impl Figure {
    #[inline] pub fn as_value(&self) -> &Value { &self.value }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.value)?)
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let writer = std::io::BufWriter::new(common::create_file(path)?);
        serde_json::to_writer(writer, &self.value)?;
        debug!("[render::choropleth] wrote figure to {}", path.display());
        Ok(())
    }

    /// Standalone HTML page that loads plotly.js and draws the figure.
    pub fn to_html(&self) -> Result<String> {
        // keep "</script>" inside string values from closing the script element
        let json = self.to_json()?.replace("</", "<\\/");
        let title = self.value["layout"]["title"]["text"].as_str().unwrap_or("choromap");
        Ok(format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<script src="{PLOTLY_CDN}"></script>
<style>html, body {{ margin: 0; height: 100%; }} #map {{ width: 100%; height: 100%; }}</style>
</head>
<body>
<div id="map"></div>
<script>
const figure = {json};
Plotly.newPlot("map", figure.data, figure.layout);
</script>
</body>
</html>
"#,
            title = escape_html(title),
        ))
    }

    pub fn write_html(&self, path: &Path) -> Result<()> {
        let html = self.to_html()?;
        let mut file = common::create_file(path)?;
        file.write_all(html.as_bytes()).map_err(|e| Error::unwritable(path, e))?;
        debug!("[render::choropleth] wrote map page to {}", path.display());
        Ok(())
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}
