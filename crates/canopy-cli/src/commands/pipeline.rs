use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use canopy_core::pipeline::config::PipelineConfig;
use canopy_core::pipeline::{run_pipeline_reported, write_outputs, PipelineStage, ProgressReporter};
use canopy_core::source::{CatalogSource, QueryControl};
use clap::Args;

use crate::progress::BarReporter;
use crate::summary::{print_pipeline_summary, print_run_summary};

use super::{read_regions, QueryArgs, ValidationArg};

#[derive(Args)]
pub struct RunArgs {
    /// Pipeline config file (TOML); the flags below are ignored when given
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Archive directory containing catalog.json
    #[arg(long, default_value = "archive")]
    pub catalog: PathBuf,

    /// GeoJSON FeatureCollection of region polygons
    #[arg(long, default_value = "regions.geojson")]
    pub regions: PathBuf,

    #[command(flatten)]
    pub query: QueryArgs,

    /// Region ring validation
    #[arg(long, value_enum, default_value = "basic")]
    pub validation: ValidationArg,

    /// Abandon the archive query after this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Output directory
    #[arg(short, long, default_value = "output")]
    pub output: PathBuf,
}

pub fn run(args: &RunArgs) -> Result<()> {
    let config = if let Some(ref config_path) = args.config {
        PipelineConfig::load(config_path)
            .with_context(|| format!("Invalid pipeline config {}", config_path.display()))?
    } else {
        build_config_from_args(args)?
    };

    print_pipeline_summary(&config);

    let source = CatalogSource::open(&config.catalog)
        .with_context(|| format!("Failed to open catalog in {}", config.catalog.display()))?;
    let regions = read_regions(&config.regions, config.validation)?;
    let control = QueryControl {
        timeout: config.timeout_secs.map(Duration::from_secs),
        ..Default::default()
    };

    let reporter = Arc::new(BarReporter::new());
    let output = run_pipeline_reported(&config, &source, &regions, &control, reporter.clone())?;

    reporter.begin_stage(PipelineStage::Writing, None);
    let written = write_outputs(&output, &config)?;
    reporter.finish_stage();
    reporter.finish();

    print_run_summary(&output, &written);
    Ok(())
}

fn build_config_from_args(args: &RunArgs) -> Result<PipelineConfig> {
    let config = PipelineConfig {
        catalog: args.catalog.clone(),
        regions: args.regions.clone(),
        output: args.output.clone(),
        query: args.query.to_config(),
        validation: args.validation.into(),
        timeout_secs: args.timeout,
        ..PipelineConfig::default()
    };
    config.validate()?;
    Ok(config)
}
