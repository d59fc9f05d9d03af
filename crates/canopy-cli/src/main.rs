mod commands;
mod progress;
mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "canopy", about = "Vegetation index time series from multispectral archives")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the scenes of an archive catalog
    Info(commands::info::InfoArgs),
    /// Build per-region time series of a band or index
    Series(commands::series::SeriesArgs),
    /// Composite matching scenes into one grid per band
    Composite(commands::composite::CompositeArgs),
    /// Run the full pipeline
    Run(commands::pipeline::RunArgs),
    /// Print or save the default pipeline config
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::Info(args) => commands::info::run(args),
        Commands::Series(args) => commands::series::run(args),
        Commands::Composite(args) => commands::composite::run(args),
        Commands::Run(args) => commands::pipeline::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
