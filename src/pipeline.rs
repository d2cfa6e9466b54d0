use std::path::PathBuf;

use tracing::info;

use crate::{
    config::Config,
    error::Result,
    io,
    join::{aggregate_mean, spatial_join, Aggregate, RIGHT_SUFFIX},
    render::{self, Choropleth, CredentialSource, Document, Figure},
    table::{load_points, load_regions, RegionTable},
};

/// What a pipeline run produced.
#[derive(Debug)]
pub struct Report {
    /// Points loaded (after dropping invalid coordinates).
    pub points: usize,
    /// Rows dropped for invalid coordinates.
    pub dropped: usize,
    pub regions: usize,
    /// Joined (point, region) rows.
    pub joined: usize,
    /// Points that fell in no region.
    pub unmatched: usize,
    pub aggregate: Aggregate,
    /// Present when an HTML or figure output was requested.
    pub figure: Option<Figure>,
    /// Files written, in order.
    pub written: Vec<PathBuf>,
}

/// Load, join, aggregate and render as configured, writing every configured
/// output. Credentials come from `config.credentials`.
pub fn run(config: &Config) -> Result<Report> {
    run_with_credentials(config, &config.credentials.source())
}

/// [`run`] with an explicit credential source.
///
/// Stages run in order and the first failure aborts the rest. The token is
/// only requested when a figure is needed, and outputs are written only
/// once every stage has succeeded.
pub fn run_with_credentials(config: &Config, credentials: &dyn CredentialSource) -> Result<Report> {
    let points = load_points(&config.points.path, &config.points.options)?;
    let regions = load_regions(&config.regions.path, &config.regions.options)?;

    let joined = spatial_join(&points, &regions, &config.join)?;
    let aggregate = aggregate_mean(&joined, &config.aggregate.key, &config.aggregate.value)?;

    // the figure (and its token) is settled before any file is written
    let document = regions.to_document()?;
    let region_key = region_column(&regions, &config.aggregate.key);
    let figure = if config.output.needs_figure() {
        let key_path = config.render.key_path.clone().unwrap_or_else(|| Document::key_path(region_key));
        let figure = Choropleth::new(&document, &aggregate)
            .with_key_path(key_path)
            .with_options(config.render.options.clone())
            .with_bounds(regions.bounds())
            .render(credentials)?;
        Some(figure)
    } else {
        None
    };

    let mut written = Vec::new();
    if let Some(path) = &config.output.aggregate {
        io::write_frame(path, &aggregate.to_dataframe()?)?;
        written.push(path.clone());
    }
    if let Some(path) = &config.output.geojson {
        document.write(path)?;
        written.push(path.clone());
    }
    if let Some(path) = &config.output.svg {
        render::write_svg(&regions, &aggregate, region_key, path)?;
        written.push(path.clone());
    }
    if let Some(figure) = &figure {
        if let Some(path) = &config.output.figure {
            figure.write_json(path)?;
            written.push(path.clone());
        }
        if let Some(path) = &config.output.html {
            figure.write_html(path)?;
            written.push(path.clone());
        }
    }

    info!("[pipeline] {} points, {} regions, {} joined rows, {} groups", points.len(), regions.len(), joined.len(), aggregate.len());
    Ok(Report {
        points: points.len(),
        dropped: points.dropped(),
        regions: regions.len(),
        joined: joined.len(),
        unmatched: joined.unmatched(),
        aggregate,
        figure,
        written,
    })
}

/// Region column behind a joined key column: `REGION_right` maps back to
/// `REGION` when the join had to rename it.
fn region_column<'a>(regions: &RegionTable, key: &'a str) -> &'a str {
    if regions.data().column(key).is_ok() { return key }
    key.strip_suffix(RIGHT_SUFFIX)
        .filter(|stripped| regions.data().column(stripped).is_ok())
        .unwrap_or(key)
}
