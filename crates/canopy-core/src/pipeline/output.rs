use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::compose::{CompositePolicy, SourceFrame};
use crate::error::Result;
use crate::frame::GridSpec;
use crate::io::grid::write_grid;
use crate::io::series_csv::{save_series_csv, save_series_json};

use super::config::{DisplayConfig, PipelineConfig, SeriesFormat};
use super::types::{CompositeOutput, PipelineOutput};

/// JSON sidecar written next to a composite's band grids.
#[derive(Serialize)]
struct CompositeSidecar<'a> {
    policy: &'a CompositePolicy,
    grid: &'a GridSpec,
    bands: BTreeMap<&'a str, String>,
    /// Grid of per-pixel indices into `sources`.
    source_grid: String,
    sources: &'a [SourceFrame],
    displays: &'a [DisplayConfig],
}

#[derive(Serialize)]
struct ChartSidecar<'a> {
    series: Vec<String>,
    region_colors: &'a BTreeMap<String, String>,
}

/// Persist composites and series under `config.output`. Returns every file written.
pub fn write_outputs(output: &PipelineOutput, config: &PipelineConfig) -> Result<Vec<PathBuf>> {
    let dir = &config.output;
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    for composite in &output.composites {
        written.extend(write_composite(dir, composite)?);
    }

    let mut series_files = Vec::new();
    for series in &output.series {
        let stem = format!("series_{}_{}", series.band, series.statistic);
        let path = match config.series_format {
            SeriesFormat::Csv => {
                let path = dir.join(format!("{stem}.csv"));
                save_series_csv(series, &path)?;
                path
            }
            SeriesFormat::Json => {
                let path = dir.join(format!("{stem}.json"));
                save_series_json(series, &path)?;
                path
            }
        };
        series_files.push(file_name(&path));
        written.push(path);
    }

    let chart = ChartSidecar {
        series: series_files,
        region_colors: &config.region_colors,
    };
    let chart_path = dir.join("chart.json");
    std::fs::write(&chart_path, serde_json::to_string_pretty(&chart)?)?;
    written.push(chart_path);

    info!(files = written.len(), dir = %dir.display(), "Outputs written");
    Ok(written)
}

/// Write one band grid per composite band, the provenance grid and a JSON
/// sidecar into `dir`.
pub fn write_composite(dir: &Path, output: &CompositeOutput) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let composite = &output.composite;
    let mut written = Vec::new();
    let mut bands = BTreeMap::new();

    for (band, data) in composite.bands() {
        let path = dir.join(format!("{}_{}.cgrd", output.name, band));
        write_grid(&path, composite.grid(), data)?;
        bands.insert(band, file_name(&path));
        written.push(path);
    }

    let source_path = dir.join(format!("{}.source.cgrd", output.name));
    write_grid(&source_path, composite.grid(), &composite.source_indices())?;
    let source_grid = file_name(&source_path);
    written.push(source_path);

    let sidecar = CompositeSidecar {
        policy: &composite.policy,
        grid: composite.grid(),
        bands,
        source_grid,
        sources: composite.sources(),
        displays: &output.displays,
    };
    let path = dir.join(format!("{}.json", output.name));
    std::fs::write(&path, serde_json::to_string_pretty(&sidecar)?)?;
    written.push(path);
    Ok(written)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
