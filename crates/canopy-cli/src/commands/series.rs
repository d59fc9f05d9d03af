use std::path::PathBuf;

use anyhow::{Context, Result};
use canopy_core::aggregate::Statistic;
use canopy_core::io::series_csv::{save_series_csv, save_series_json, write_series_csv};
use canopy_core::series::build_series;
use canopy_core::source::{CatalogSource, QueryControl, RasterSource};
use clap::{Args, ValueEnum};

use super::{ensure_band, read_regions, QueryArgs, ValidationArg};

#[derive(Clone, Copy, ValueEnum)]
pub enum StatisticArg {
    Mean,
    Max,
    Min,
}

impl From<StatisticArg> for Statistic {
    fn from(arg: StatisticArg) -> Self {
        match arg {
            StatisticArg::Mean => Statistic::Mean,
            StatisticArg::Max => Statistic::Max,
            StatisticArg::Min => Statistic::Min,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum FormatArg {
    Csv,
    Json,
}

#[derive(Args)]
pub struct SeriesArgs {
    /// Archive directory containing catalog.json
    pub catalog: PathBuf,

    /// GeoJSON FeatureCollection of region polygons
    #[arg(long)]
    pub regions: PathBuf,

    /// Band or index to aggregate (NDVI, GNDVI and NDRE are derived on demand)
    #[arg(long, default_value = "NDVI")]
    pub band: String,

    /// Per-region statistic
    #[arg(long, value_enum, default_value = "mean")]
    pub statistic: StatisticArg,

    #[command(flatten)]
    pub query: QueryArgs,

    /// Region ring validation
    #[arg(long, value_enum, default_value = "basic")]
    pub validation: ValidationArg,

    /// Output format
    #[arg(long, value_enum, default_value = "csv")]
    pub format: FormatArg,

    /// Output file; CSV goes to stdout when omitted
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn run(args: &SeriesArgs) -> Result<()> {
    let source = CatalogSource::open(&args.catalog)
        .with_context(|| format!("Failed to open catalog in {}", args.catalog.display()))?;
    let regions = read_regions(&args.regions, args.validation.into())?;

    let query = args.query.to_config().to_query(regions.bounding_box())?;
    let collection = source
        .query(&query, &QueryControl::default())
        .context("Archive query failed")?;
    let collection = ensure_band(collection, &args.band)?;

    let series = build_series(&collection, &regions, &args.band, args.statistic.into())?;
    let gaps: usize = series.regions.iter().map(|r| r.gap_count()).sum();

    match (&args.output, args.format) {
        (Some(path), FormatArg::Csv) => save_series_csv(&series, path)?,
        (Some(path), FormatArg::Json) => save_series_json(&series, path)?,
        (None, FormatArg::Csv) => write_series_csv(&series, std::io::stdout().lock())?,
        (None, FormatArg::Json) => println!("{}", serde_json::to_string_pretty(&series)?),
    }

    if let Some(ref path) = args.output {
        println!(
            "{} points over {} frames and {} regions ({} gaps) saved to {}",
            series.point_count(),
            collection.len(),
            regions.len(),
            gaps,
            path.display()
        );
    }
    Ok(())
}
