use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::compose::compose;
use crate::error::Result;
use crate::index::compute_available_indices;
use crate::io::regions::load_regions;
use crate::region::RegionSet;
use crate::series::build_series;
use crate::source::{CatalogSource, QueryControl, RasterSource};

use super::config::PipelineConfig;
use super::types::{CompositeOutput, NoOpReporter, PipelineOutput, PipelineStage, ProgressReporter};

/// Run query, index, composite and series stages with a progress reporter.
///
/// Nothing is read from global state: the source, the regions and the query
/// limits are all explicit.
pub fn run_pipeline_reported(
    config: &PipelineConfig,
    source: &dyn RasterSource,
    regions: &RegionSet,
    control: &QueryControl,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<PipelineOutput> {
    // Query
    reporter.begin_stage(PipelineStage::Querying, None);
    let query = config.query.to_query(regions.bounding_box())?;
    let collection = source.query(&query, control)?;
    info!(
        frames = collection.len(),
        source = source.name(),
        regions = regions.len(),
        "Archive query complete"
    );
    reporter.finish_stage();

    // Indices
    reporter.begin_stage(PipelineStage::ComputingIndices, Some(collection.len()));
    let done = AtomicUsize::new(0);
    let collection = collection.try_map(|frame| {
        let out = compute_available_indices(frame, &config.indices);
        reporter.advance(done.fetch_add(1, Ordering::Relaxed) + 1);
        out
    })?;
    info!(indices = config.indices.len(), "Indices computed");
    reporter.finish_stage();

    // Composites
    reporter.begin_stage(PipelineStage::Compositing, Some(config.composites.len()));
    let mut composites = Vec::with_capacity(config.composites.len());
    for (i, composite_config) in config.composites.iter().enumerate() {
        let mut composite = compose(&collection, &composite_config.policy())?;
        if composite_config.clip {
            composite = composite.clip(regions);
        }
        composites.push(CompositeOutput {
            name: composite_config.name(),
            composite,
            displays: composite_config.displays.clone(),
        });
        reporter.advance(i + 1);
    }
    reporter.finish_stage();

    // Series
    reporter.begin_stage(PipelineStage::BuildingSeries, Some(config.series.len()));
    let mut series = Vec::with_capacity(config.series.len());
    for (i, series_config) in config.series.iter().enumerate() {
        series.push(build_series(
            &collection,
            regions,
            &series_config.band,
            series_config.statistic,
        )?);
        reporter.advance(i + 1);
    }
    reporter.finish_stage();

    Ok(PipelineOutput {
        timestamps: collection.timestamps(),
        composites,
        series,
    })
}

/// Run the pipeline against the catalog and regions named in `config`.
pub fn run_pipeline(config: &PipelineConfig) -> Result<PipelineOutput> {
    let source = CatalogSource::open(&config.catalog)?;
    let regions = load_regions(&config.regions, config.validation)?;
    let control = QueryControl {
        timeout: config.timeout_secs.map(Duration::from_secs),
        ..Default::default()
    };
    let reporter = Arc::new(NoOpReporter);
    run_pipeline_reported(config, &source, &regions, &control, reporter)
}
