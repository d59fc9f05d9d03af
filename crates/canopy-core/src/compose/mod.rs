//! Temporal compositing: reduce a frame collection to one frame per pixel.

pub mod max;
pub mod mosaic;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{CanopyError, Result};
use crate::frame::{Frame, FrameCollection, GridSpec};
use crate::region::RegionSet;

pub use max::MaxCompositor;
pub use mosaic::QualityMosaicker;

/// Per-pixel composition rule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "kebab-case")]
pub enum CompositePolicy {
    /// Per-pixel maximum of `band` across frames.
    Max { band: String },
    /// Per pixel, all bands of the frame maximizing `quality_band`.
    QualityMosaic { quality_band: String },
}

impl CompositePolicy {
    /// The band that drives pixel selection.
    pub fn band(&self) -> &str {
        match self {
            Self::Max { band } => band,
            Self::QualityMosaic { quality_band } => quality_band,
        }
    }
}

impl std::fmt::Display for CompositePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Max { band } => write!(f, "Max ({band})"),
            Self::QualityMosaic { quality_band } => write!(f, "Quality Mosaic ({quality_band})"),
        }
    }
}

/// Identity of a frame that contributed pixels to a composite.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceFrame {
    pub id: String,
    pub acquired: DateTime<Utc>,
}

impl SourceFrame {
    fn of(frame: &Frame) -> Self {
        Self {
            id: frame.id.clone(),
            acquired: frame.acquired,
        }
    }
}

/// Result of compositing: frame-shaped bands plus per-pixel provenance.
#[derive(Clone, Debug)]
pub struct CompositeFrame {
    pub policy: CompositePolicy,
    grid: GridSpec,
    bands: BTreeMap<String, Array2<f32>>,
    /// Index into `sources` of the frame that supplied each pixel.
    source: Array2<Option<u32>>,
    sources: Vec<SourceFrame>,
}

impl CompositeFrame {
    pub fn band(&self, name: &str) -> Result<&Array2<f32>> {
        self.bands
            .get(name)
            .ok_or_else(|| CanopyError::BandMissing { band: name.into() })
    }

    pub fn band_names(&self) -> impl Iterator<Item = &str> {
        self.bands.keys().map(String::as_str)
    }

    pub fn bands(&self) -> impl Iterator<Item = (&str, &Array2<f32>)> {
        self.bands.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn grid(&self) -> &GridSpec {
        &self.grid
    }

    /// Every frame pushed into the composer, in push order.
    pub fn sources(&self) -> &[SourceFrame] {
        &self.sources
    }

    /// Frame that supplied pixel (row, col), if any did.
    pub fn source_at(&self, row: usize, col: usize) -> Option<&SourceFrame> {
        self.source
            .get((row, col))
            .copied()
            .flatten()
            .map(|i| &self.sources[i as usize])
    }

    /// Provenance as a grid of indices into `sources`; NaN where no frame
    /// supplied the pixel.
    pub fn source_indices(&self) -> Array2<f32> {
        self.source.mapv(|s| s.map_or(f32::NAN, |i| i as f32))
    }

    /// Blank out every pixel whose centroid lies outside all `regions`.
    pub fn clip(&self, regions: &RegionSet) -> CompositeFrame {
        let (rows, cols) = self.grid.shape();
        let mut inside = Array2::from_elem((rows, cols), false);
        for region in regions {
            for &(r, c) in region.mask(&self.grid).pixels() {
                inside[[r, c]] = true;
            }
        }

        let mut out = self.clone();
        for data in out.bands.values_mut() {
            ndarray::Zip::from(data).and(&inside).for_each(|v, &keep| {
                if !keep {
                    *v = f32::NAN;
                }
            });
        }
        ndarray::Zip::from(&mut out.source)
            .and(&inside)
            .for_each(|s, &keep| {
                if !keep {
                    *s = None;
                }
            });
        out
    }
}

/// Streaming composer over either policy.
pub enum Compositor {
    Max(MaxCompositor),
    QualityMosaic(QualityMosaicker),
}

impl Compositor {
    pub fn new(policy: &CompositePolicy) -> Self {
        match policy {
            CompositePolicy::Max { band } => Self::Max(MaxCompositor::new(band.clone())),
            CompositePolicy::QualityMosaic { quality_band } => {
                Self::QualityMosaic(QualityMosaicker::new(quality_band.clone()))
            }
        }
    }

    pub fn push(&mut self, frame: &Frame) -> Result<()> {
        match self {
            Self::Max(c) => c.push(frame),
            Self::QualityMosaic(c) => c.push(frame),
        }
    }

    pub fn frames_pushed(&self) -> usize {
        match self {
            Self::Max(c) => c.frames_pushed(),
            Self::QualityMosaic(c) => c.frames_pushed(),
        }
    }

    pub fn finish(self) -> Result<CompositeFrame> {
        match self {
            Self::Max(c) => c.finish(),
            Self::QualityMosaic(c) => c.finish(),
        }
    }
}

/// Composite every frame of `collection` under `policy`.
///
/// Frames lacking the selection band are skipped with a warning. `NoData`
/// if no frame carries it.
pub fn compose(collection: &FrameCollection, policy: &CompositePolicy) -> Result<CompositeFrame> {
    let mut compositor = Compositor::new(policy);
    for frame in collection {
        if !frame.has_band(policy.band()) {
            warn!(frame = %frame.id, band = policy.band(), "Selection band missing, frame skipped");
            continue;
        }
        compositor.push(frame)?;
    }
    let pushed = compositor.frames_pushed();
    let composite = compositor.finish()?;
    info!(
        policy = %policy,
        frames = pushed,
        skipped = collection.len() - pushed,
        "Composite complete"
    );
    Ok(composite)
}

pub fn max_composite(collection: &FrameCollection, band: &str) -> Result<CompositeFrame> {
    compose(collection, &CompositePolicy::Max { band: band.into() })
}

pub fn quality_mosaic(collection: &FrameCollection, quality_band: &str) -> Result<CompositeFrame> {
    compose(
        collection,
        &CompositePolicy::QualityMosaic {
            quality_band: quality_band.into(),
        },
    )
}

/// True if a candidate acquired at `candidate` should replace the incumbent
/// on an equal selection value: earliest timestamp wins.
fn earlier(candidate: &DateTime<Utc>, incumbent: Option<u32>, sources: &[SourceFrame]) -> bool {
    match incumbent {
        Some(i) => *candidate < sources[i as usize].acquired,
        None => true,
    }
}
