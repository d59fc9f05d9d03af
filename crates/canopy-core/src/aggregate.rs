//! Per-region statistics over a frame band.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{CanopyError, Result};
use crate::frame::Frame;
use crate::region::{Region, RegionMask};

/// Reduction applied to the pixels of a region.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Statistic {
    #[default]
    Mean,
    Max,
    Min,
}

impl std::fmt::Display for Statistic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mean => write!(f, "mean"),
            Self::Max => write!(f, "max"),
            Self::Min => write!(f, "min"),
        }
    }
}

impl Statistic {
    /// Reduce `values`, skipping NaN. `None` when nothing is left.
    pub fn reduce<I>(&self, values: I) -> Option<f64>
    where
        I: IntoIterator<Item = f32>,
    {
        let mut count = 0usize;
        let mut sum = 0.0f64;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;

        for v in values.into_iter().filter(|v| !v.is_nan()) {
            let v = f64::from(v);
            count += 1;
            sum += v;
            min = min.min(v);
            max = max.max(v);
        }

        if count == 0 {
            return None;
        }
        Some(match self {
            Self::Mean => sum / count as f64,
            Self::Max => max,
            Self::Min => min,
        })
    }
}

/// Statistic of `band` over the pixels of `frame` whose centroids lie in `region`.
///
/// Pixels outside the frame are ignored, so a region that misses the frame
/// entirely yields `None`.
pub fn aggregate(
    frame: &Frame,
    region: &Region,
    band: &str,
    statistic: Statistic,
) -> Result<Option<f64>> {
    let mask = region.mask(frame.grid());
    aggregate_masked(frame, &mask, band, statistic)
}

/// Same as [`aggregate`] with a mask rasterized up front, for reuse across
/// frames on one grid.
pub fn aggregate_masked(
    frame: &Frame,
    mask: &RegionMask,
    band: &str,
    statistic: Statistic,
) -> Result<Option<f64>> {
    let data = frame.band(band)?;
    aggregate_array(data, mask, statistic)
}

pub(crate) fn aggregate_array(
    data: &Array2<f32>,
    mask: &RegionMask,
    statistic: Statistic,
) -> Result<Option<f64>> {
    if data.dim() != mask.shape() {
        return Err(CanopyError::ShapeMismatch {
            expected: mask.shape(),
            actual: data.dim(),
        });
    }
    Ok(statistic.reduce(mask.pixels().iter().map(|&(r, c)| data[[r, c]])))
}
