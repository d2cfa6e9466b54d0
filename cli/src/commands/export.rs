use anyhow::{Context, Result};
use choromap::{load_regions, Crs, RegionOptions};

pub fn run(cli: &crate::cli::Cli, args: &crate::cli::ExportArgs) -> Result<()> {
    let out_path = args.output.clone().unwrap_or("./regions.geojson".into());

    let assume_crs = args.assume_crs.as_deref()
        .map(str::parse::<Crs>)
        .transpose()
        .context("[export-geojson] invalid --assume-crs")?;

    let regions = load_regions(&args.regions, &RegionOptions { assume_crs })
        .with_context(|| format!("[export-geojson] failed to load {}", args.regions.display()))?;

    let document = regions.to_document()?;
    document.write(&out_path)
        .with_context(|| format!("[export-geojson] failed to write {}", out_path.display()))?;

    if cli.verbose > 0 {
        eprintln!("[export-geojson] wrote {} features to {}", document.len(), out_path.display());
    }

    Ok(())
}
