//! Per-region time series of a band statistic.

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::aggregate::{aggregate_array, Statistic};
use crate::consts::PARALLEL_FRAME_THRESHOLD;
use crate::error::Result;
use crate::frame::{Frame, FrameCollection};
use crate::region::{RegionMask, RegionSet};

/// One aggregated value; `value` is `None` when no valid pixel was found.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub label: String,
    pub timestamp: DateTime<Utc>,
    pub value: Option<f64>,
}

/// The ordered points of a single region.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegionSeries {
    pub label: String,
    pub points: Vec<SeriesPoint>,
}

impl RegionSeries {
    /// Number of timestamps without a value.
    pub fn gap_count(&self) -> usize {
        self.points.iter().filter(|p| p.value.is_none()).count()
    }
}

/// Series for every region, in region input order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub band: String,
    pub statistic: Statistic,
    pub regions: Vec<RegionSeries>,
}

impl TimeSeries {
    pub fn get(&self, label: &str) -> Option<&[SeriesPoint]> {
        self.regions
            .iter()
            .find(|r| r.label == label)
            .map(|r| r.points.as_slice())
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.regions.iter().map(|r| r.label.as_str())
    }

    /// Total number of points across all regions.
    pub fn point_count(&self) -> usize {
        self.regions.iter().map(|r| r.points.len()).sum()
    }
}

/// Aggregate `band` over every region for every frame.
///
/// Frames missing `band` contribute gaps rather than failing the series.
/// Output is sorted by timestamp with a stable sort.
pub fn build_series(
    collection: &FrameCollection,
    regions: &RegionSet,
    band: &str,
    statistic: Statistic,
) -> Result<TimeSeries> {
    let masks: Vec<RegionMask> = match collection.grid() {
        Some(grid) => regions.iter().map(|r| r.mask(grid)).collect(),
        None => Vec::new(),
    };

    let evaluate = |frame: &Frame| -> Result<Vec<Option<f64>>> {
        let data = match frame.band(band) {
            Ok(data) => data,
            Err(_) => {
                warn!(frame = %frame.id, band, "Band missing, recording gap");
                return Ok(vec![None; masks.len()]);
            }
        };
        masks
            .iter()
            .map(|mask| aggregate_array(data, mask, statistic))
            .collect()
    };

    let frames = collection.frames();
    let values: Vec<Vec<Option<f64>>> = if frames.len() >= PARALLEL_FRAME_THRESHOLD {
        frames.par_iter().map(evaluate).collect::<Result<_>>()?
    } else {
        frames.iter().map(evaluate).collect::<Result<_>>()?
    };

    let series: Vec<RegionSeries> = regions
        .iter()
        .enumerate()
        .map(|(i, region)| {
            let mut points: Vec<SeriesPoint> = frames
                .iter()
                .zip(&values)
                .map(|(frame, row)| SeriesPoint {
                    label: region.label().to_string(),
                    timestamp: frame.acquired,
                    value: row[i],
                })
                .collect();
            points.sort_by_key(|p| p.timestamp);
            RegionSeries {
                label: region.label().to_string(),
                points,
            }
        })
        .collect();

    info!(
        band,
        statistic = %statistic,
        frames = frames.len(),
        regions = regions.len(),
        "Built time series"
    );

    Ok(TimeSeries {
        band: band.to_string(),
        statistic,
        regions: series,
    })
}
