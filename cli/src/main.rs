mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::{export, inspect, run};
use tracing_subscriber::EnvFilter;

/// Map the `-v` count onto a log filter; an explicit RUST_LOG wins.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("choromap={level},choromap_cli={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

pub fn main_inner() -> anyhow::Result<()> {
    use clap::Parser;

    let cli = Cli::parse();
    init_logging(cli.verbose);
    match &cli.command {
        Commands::Run(args) => run::run(&cli, args),
        Commands::Inspect(args) => inspect::run(&cli, args),
        Commands::ExportGeojson(args) => export::run(&cli, args),
    }
}

fn main() -> anyhow::Result<()> { main_inner() }
