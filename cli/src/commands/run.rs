use anyhow::{Context, Result};
use choromap::{pipeline, Config};
use tracing::info;

pub fn run(cli: &crate::cli::Cli, args: &crate::cli::RunArgs) -> Result<()> {
    let mut config = Config::load_from_file(&args.config)
        .with_context(|| format!("[run] failed to load config {}", args.config.display()))?;

    apply_overrides(&mut config, args);

    info!("[run] points {} -> regions {}", config.points.path.display(), config.regions.path.display());
    let report = pipeline::run(&config).context("[run] pipeline failed")?;

    let aggregate = &report.aggregate;
    let width = aggregate.locations().map(str::len).chain([aggregate.key().len()]).max().unwrap_or(0);
    println!("{:<width$}  {:>12}  {:>6}", aggregate.key(), aggregate.value(), "count");
    for row in aggregate.rows() {
        println!("{:<width$}  {:>12.4}  {:>6}", row.key, row.mean, row.count);
    }

    if cli.verbose > 0 {
        eprintln!(
            "[run] {} points ({} dropped), {} regions, {} joined rows, {} unmatched points, {} values excluded",
            report.points, report.dropped, report.regions, report.joined, report.unmatched, aggregate.excluded(),
        );
    }
    for path in &report.written {
        eprintln!("[run] wrote {}", path.display());
    }

    Ok(())
}

/// Layer the command-line outputs over the config. `--offline` drops the
/// figure outputs; otherwise an HTML map is always written.
fn apply_overrides(config: &mut Config, args: &crate::cli::RunArgs) {
    if let Some(path) = &args.output { config.output.html = Some(path.clone()) }
    if let Some(path) = &args.figure { config.output.figure = Some(path.clone()) }
    if let Some(path) = &args.svg { config.output.svg = Some(path.clone()) }
    if let Some(path) = &args.aggregate_out { config.output.aggregate = Some(path.clone()) }

    if args.offline {
        config.output.html = None;
        config.output.figure = None;
    } else if !config.output.needs_figure() {
        config.output.html = Some("./map.html".into());
    }
}
