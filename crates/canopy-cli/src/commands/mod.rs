pub mod composite;
pub mod config;
pub mod info;
pub mod pipeline;
pub mod series;

use std::path::Path;

use anyhow::{bail, Context, Result};
use canopy_core::frame::FrameCollection;
use canopy_core::index::{compute_index, IndexDefinition};
use canopy_core::io::regions::load_regions;
use canopy_core::pipeline::config::QueryConfig;
use canopy_core::region::{RegionSet, RegionValidation};
use chrono::NaiveDate;
use clap::{Args, ValueEnum};
use tracing::{debug, warn};

/// Archive query flags shared by `series`, `composite` and `run`.
#[derive(Args)]
pub struct QueryArgs {
    /// First acquisition date, inclusive (YYYY-MM-DD)
    #[arg(long, default_value = "2016-01-01")]
    pub start: NaiveDate,

    /// Last acquisition date, inclusive (YYYY-MM-DD)
    #[arg(long, default_value = "2020-12-31")]
    pub end: NaiveDate,

    /// Keep scenes with cloud cover below this percentage
    #[arg(long, default_value = "20")]
    pub cloud: u8,

    /// Calendar months to keep, e.g. 7-8
    #[arg(long, value_parser = parse_month_range, default_value = "7-8")]
    pub months: [u32; 2],

    /// Keep every calendar month
    #[arg(long)]
    pub all_months: bool,

    /// Calendar years to keep, e.g. 2016-2020
    #[arg(long, value_parser = parse_year_range)]
    pub years: Option<[i32; 2]>,
}

impl QueryArgs {
    pub fn to_config(&self) -> QueryConfig {
        QueryConfig {
            start: self.start,
            end: self.end,
            cloud_cover_max: self.cloud,
            months: (!self.all_months).then_some(self.months),
            years: self.years,
        }
    }
}

fn parse_range<T: std::str::FromStr>(s: &str) -> std::result::Result<[T; 2], String> {
    let (a, b) = s
        .split_once('-')
        .ok_or_else(|| format!("expected FIRST-LAST, got '{s}'"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<T>()
            .map_err(|_| format!("'{v}' is not a number"))
    };
    Ok([parse(a)?, parse(b)?])
}

fn parse_month_range(s: &str) -> std::result::Result<[u32; 2], String> {
    parse_range(s)
}

fn parse_year_range(s: &str) -> std::result::Result<[i32; 2], String> {
    parse_range(s)
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ValidationArg {
    Basic,
    Strict,
}

impl From<ValidationArg> for RegionValidation {
    fn from(arg: ValidationArg) -> Self {
        match arg {
            ValidationArg::Basic => RegionValidation::Basic,
            ValidationArg::Strict => RegionValidation::Strict,
        }
    }
}

pub fn read_regions(path: &Path, validation: RegionValidation) -> Result<RegionSet> {
    let regions = load_regions(path, validation)
        .with_context(|| format!("Failed to load regions from {}", path.display()))?;
    if regions.is_empty() {
        bail!("{} contains no regions", path.display());
    }
    Ok(regions)
}

/// Derive `band` on frames that lack it when it names a built-in index.
/// Frames missing its source bands are left as they are.
pub fn ensure_band(collection: FrameCollection, band: &str) -> Result<FrameCollection> {
    let Some(index) = IndexDefinition::builtin(band) else {
        return Ok(collection);
    };
    if collection.iter().all(|f| f.has_band(band)) {
        return Ok(collection);
    }
    debug!(index = %index, frames = collection.len(), "Deriving index for requested band");
    let derived = collection.try_map(|frame| {
        if frame.has_band(band) {
            Ok(frame.clone())
        } else if !index.applies_to(frame) {
            warn!(frame = %frame.id, index = %index.name, "Source band missing, index skipped");
            Ok(frame.clone())
        } else {
            compute_index(frame, &index)
        }
    })?;
    Ok(derived)
}
