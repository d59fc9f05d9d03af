use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use canopy_core::compose::compose;
use canopy_core::pipeline::config::{CompositeConfig, CompositeMethod};
use canopy_core::pipeline::{write_composite, CompositeOutput};
use canopy_core::source::{CatalogSource, QueryControl, RasterSource};
use clap::{Args, ValueEnum};

use super::{ensure_band, read_regions, QueryArgs, ValidationArg};

#[derive(Clone, Copy, ValueEnum)]
pub enum PolicyArg {
    /// Per-pixel maximum of the band
    Max,
    /// Every band of the frame maximizing the band
    Quality,
}

#[derive(Args)]
pub struct CompositeArgs {
    /// Archive directory containing catalog.json
    pub catalog: PathBuf,

    /// Composition policy
    #[arg(long, value_enum, default_value = "max")]
    pub policy: PolicyArg,

    /// Band maximized, or used as quality for the mosaic
    #[arg(long, default_value = "NDVI")]
    pub band: String,

    /// GeoJSON regions restricting the query area
    #[arg(long)]
    pub regions: Option<PathBuf>,

    /// Blank pixels outside every region (requires --regions)
    #[arg(long)]
    pub clip: bool,

    #[command(flatten)]
    pub query: QueryArgs,

    /// Region ring validation
    #[arg(long, value_enum, default_value = "basic")]
    pub validation: ValidationArg,

    /// Output directory
    #[arg(short, long, default_value = "composite")]
    pub output: PathBuf,
}

pub fn run(args: &CompositeArgs) -> Result<()> {
    if args.clip && args.regions.is_none() {
        bail!("--clip requires --regions");
    }

    let source = CatalogSource::open(&args.catalog)
        .with_context(|| format!("Failed to open catalog in {}", args.catalog.display()))?;
    let regions = args
        .regions
        .as_deref()
        .map(|path| read_regions(path, args.validation.into()))
        .transpose()?;

    let bounds = regions.as_ref().and_then(|r| r.bounding_box());
    let query = args.query.to_config().to_query(bounds)?;
    let collection = source
        .query(&query, &QueryControl::default())
        .context("Archive query failed")?;
    let collection = ensure_band(collection, &args.band)?;

    let config = CompositeConfig {
        method: match args.policy {
            PolicyArg::Max => CompositeMethod::Max,
            PolicyArg::Quality => CompositeMethod::QualityMosaic,
        },
        band: args.band.clone(),
        clip: args.clip,
        displays: Vec::new(),
    };
    let mut composite = compose(&collection, &config.policy())?;
    if let Some(ref regions) = regions.filter(|_| args.clip) {
        composite = composite.clip(regions);
    }

    let output = CompositeOutput {
        name: config.name(),
        composite,
        displays: Vec::new(),
    };
    let written = write_composite(&args.output, &output)?;

    println!(
        "{} composite of {} frames, {} band(s)",
        output.composite.policy,
        collection.len(),
        output.composite.band_names().count()
    );
    for path in written {
        println!("  {}", path.display());
    }
    Ok(())
}
