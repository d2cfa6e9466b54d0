use anyhow::{Context, Result};
use choromap::{load_points, load_regions, Config};

pub fn run(_cli: &crate::cli::Cli, args: &crate::cli::InspectArgs) -> Result<()> {
    let config = Config::load_from_file(&args.config)
        .with_context(|| format!("[inspect] failed to load config {}", args.config.display()))?;

    let points = load_points(&config.points.path, &config.points.options)
        .with_context(|| format!("[inspect] failed to load points from {}", config.points.path.display()))?;
    println!("points   {}", config.points.path.display());
    println!("  rows     {} ({} dropped)", points.len(), points.dropped());
    println!("  crs      {}", points.crs());
    println!("  columns  {}", points.column_names().join(", "));

    let regions = load_regions(&config.regions.path, &config.regions.options)
        .with_context(|| format!("[inspect] failed to load regions from {}", config.regions.path.display()))?;
    println!("regions  {}", config.regions.path.display());
    println!("  rows     {}", regions.len());
    println!("  crs      {}", regions.crs().map_or("unknown".to_string(), ToString::to_string));
    println!("  columns  {}", regions.column_names().join(", "));
    if let Some(bounds) = regions.bounds() {
        println!("  bounds   [{}, {}] x [{}, {}]", bounds.min().x, bounds.max().x, bounds.min().y, bounds.max().y);
    }

    match choromap::join::check_crs(points.crs(), regions.crs()) {
        Ok(()) => println!("crs      match"),
        Err(e) => println!("crs      {e}"),
    }

    Ok(())
}
