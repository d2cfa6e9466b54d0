use std::path::PathBuf;

/// Choropleth mapping CLI (argument schema only)
#[derive(clap::Parser, Debug)]
#[command(name = "choromap", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv, -vvv); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Join, aggregate and render a choropleth as configured
    Run(RunArgs),

    /// Load both inputs and report rows, columns and CRS
    Inspect(InspectArgs),

    /// Write the region boundaries as a GeoJSON document
    ExportGeojson(ExportArgs),
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Run configuration (TOML)
    #[arg(short, long, value_hint = clap::ValueHint::FilePath, default_value = "choromap.toml")]
    pub config: PathBuf,

    /// Output HTML map, overrides [output].html; defaults to "./map.html"
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// Also write the plotly figure JSON
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub figure: Option<PathBuf>,

    /// Also write an offline SVG choropleth
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub svg: Option<PathBuf>,

    /// Also write the aggregate table (.csv, .json or .ndjson)
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub aggregate_out: Option<PathBuf>,

    /// Skip the base-map figure (no access token needed)
    #[arg(long)]
    pub offline: bool,
}

#[derive(clap::Args, Debug)]
pub struct InspectArgs {
    /// Run configuration (TOML)
    #[arg(short, long, value_hint = clap::ValueHint::FilePath, default_value = "choromap.toml")]
    pub config: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct ExportArgs {
    /// Boundary file (.shp, .json or .geojson)
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub regions: PathBuf,

    /// Output GeoJSON file, defaults to "./regions.geojson"
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// CRS to assume when the boundary file declares none, e.g. EPSG:4326
    #[arg(long)]
    pub assume_crs: Option<String>,
}
