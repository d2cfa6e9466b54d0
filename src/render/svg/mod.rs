//! Offline SVG choropleth, drawn without a base map or access token.

mod writer;

use std::{io::Write, path::Path};

use geo::{Coord, CoordsIter, LineString, MultiPolygon};
use tracing::{debug, info};

use crate::{common, error::{Error, Result}, join::Aggregate, table::RegionTable};
use writer::SvgWriter;

/// Projection function: lon/lat -> SVG coords (x,y)
type Projection = dyn Fn(&Coord<f64>) -> (f64, f64);

/// Light end of the fill ramp (lowest mean).
const RAMP_LOW: (u8, u8, u8) = (0xde, 0xeb, 0xf7);
/// Dark end of the fill ramp (highest mean).
const RAMP_HIGH: (u8, u8, u8) = (0x08, 0x51, 0x9c);

/// Write `regions` as an SVG map 1200 units wide, filling each region by the
/// aggregate mean of its `key` column.
pub fn write_svg(regions: &RegionTable, aggregate: &Aggregate, key: &str, path: &Path) -> Result<()> {
    write_svg_with_size(regions, aggregate, key, path, 1200.0, 10.0)
}

/// Like [`write_svg`] with explicit width and margin. Regions whose key has no
/// aggregate are drawn in gray.
pub fn write_svg_with_size(
    regions: &RegionTable,
    aggregate: &Aggregate,
    key: &str,
    path: &Path,
    width: f64,
    margin: f64,
) -> Result<()> {
    let bounds = regions.bounds()
        .ok_or_else(|| Error::InvalidDocument("no region geometry to draw".into()))?;

    let keys = common::column_as_keys(common::require_column(regions.data(), key)?)?;
    let values: Vec<Option<f64>> = keys.iter()
        .map(|k| k.as_deref().and_then(|k| aggregate.get(k)))
        .collect();
    let colors = fill_colors(&values);

    // degenerate extents (a single point or line) still get a finite scale
    let extent = bounds.width().max(bounds.height()).max(f64::EPSILON);
    let scale = (width - 2.0 * margin) / extent;
    let height = bounds.height() * scale + 2.0 * margin;

    // --- Map lon/lat -> SVG coords (preserve aspect, Y down) ---
    let project = move |coord: &Coord<f64>| -> (f64, f64) {
        let x = margin + (coord.x - bounds.min().x) * scale;
        let y = margin + (bounds.max().y - coord.y) * scale;
        (x, y)
    };

    let mut writer = SvgWriter::new(path)?;
    let drawn = (|| -> std::io::Result<()> {
        writer.write_header(width, height)?;
        writer.write_styles()?;
        for (i, shape) in regions.shapes().iter().enumerate() {
            let label = keys[i].as_deref().unwrap_or("");
            let d = multipolygon_to_path(shape, &project);
            match (&colors[i], values[i]) {
                (Some(color), Some(value)) => writeln!(writer,
                    r#"<path class="region" d="{d}" style="fill:{color}"><title>{}: {value}</title></path>"#,
                    escape_xml(label),
                )?,
                _ => writeln!(writer,
                    r#"<path class="region nodata" d="{d}"><title>{}: no data</title></path>"#,
                    escape_xml(label),
                )?,
            }
        }
        writer.write_footer()?;
        writer.flush()
    })();
    drawn.map_err(|e| writer.fail(e))?;

    debug!("[render::svg] bounds {:?}, scale {scale:.3}", bounds);
    info!("[render::svg] wrote {} regions to {}", regions.len(), path.display());
    Ok(())
}

/// Map each value onto the blue ramp; `None` stays uncolored.
fn fill_colors(values: &[Option<f64>]) -> Vec<Option<String>> {
    let present = values.iter().flatten().copied();
    let min = present.clone().fold(f64::INFINITY, f64::min);
    let max = present.fold(f64::NEG_INFINITY, f64::max);
    let range = if max > min { max - min } else { 1.0 };

    let lerp = |a: u8, b: u8, t: f64| -> u8 {
        (a as f64 + (b as f64 - a as f64) * t)
            .round()
            .clamp(0.0, 255.0) as u8
    };

    values.iter()
        .map(|value| value.map(|v| {
            let t = ((v - min) / range).clamp(0.0, 1.0);
            let (r1, g1, b1) = RAMP_LOW;
            let (r2, g2, b2) = RAMP_HIGH;
            format!("#{:02x}{:02x}{:02x}", lerp(r1, r2, t), lerp(g1, g2, t), lerp(b1, b2, t))
        }))
        .collect()
}

/// Build a compact SVG path string for a MultiPolygon (exteriors + holes).
fn multipolygon_to_path(shape: &MultiPolygon<f64>, project: &Projection) -> String {
    let mut out = String::new();

    for polygon in &shape.0 {
        out.push_str(&ring_to_path(polygon.exterior(), project));
        for interior in polygon.interiors() {
            out.push_str(&ring_to_path(interior, project));
        }
    }

    out
}

/// Build a compact SVG path string for a LineString (ring).
fn ring_to_path(ring: &LineString<f64>, project: &Projection) -> String {
    let mut out = String::new();

    let mut coords = ring.coords_iter()
        .map(|coord| project(&coord));
    if let Some((x, y)) = coords.next() {
        out.push_str(&format!(" M{x:.3},{y:.3}"));
        for (x, y) in coords {
            out.push_str(&format!(" L{x:.3},{y:.3}"));
        }
        out.push('Z');
    }

    out
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
