//! Normalized-difference spectral indices.

use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::consts::{BAND_GREEN, BAND_NIR, BAND_RED, BAND_RED_EDGE, PARALLEL_PIXEL_THRESHOLD};
use crate::error::{CanopyError, Result};
use crate::frame::{Frame, FrameCollection};

/// A named normalized difference `(band_a - band_b) / (band_a + band_b)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDefinition {
    pub name: String,
    pub band_a: String,
    pub band_b: String,
}

impl IndexDefinition {
    pub fn new(
        name: impl Into<String>,
        band_a: impl Into<String>,
        band_b: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            band_a: band_a.into(),
            band_b: band_b.into(),
        }
    }

    /// Normalized Difference Vegetation Index: (NIR - Red) / (NIR + Red).
    pub fn ndvi() -> Self {
        Self::new("NDVI", BAND_NIR, BAND_RED)
    }

    /// Green NDVI: (NIR - Green) / (NIR + Green).
    pub fn gndvi() -> Self {
        Self::new("GNDVI", BAND_NIR, BAND_GREEN)
    }

    /// Normalized Difference Red Edge: (NIR - RedEdge) / (NIR + RedEdge).
    pub fn ndre() -> Self {
        Self::new("NDRE", BAND_NIR, BAND_RED_EDGE)
    }

    /// Look up one of the built-in indices by name (case-insensitive).
    pub fn builtin(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "NDVI" => Some(Self::ndvi()),
            "GNDVI" => Some(Self::gndvi()),
            "NDRE" => Some(Self::ndre()),
            _ => None,
        }
    }

    /// True if `frame` carries both source bands.
    pub fn applies_to(&self, frame: &Frame) -> bool {
        frame.has_band(&self.band_a) && frame.has_band(&self.band_b)
    }
}

impl std::fmt::Display for IndexDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} = ({a} - {b}) / ({a} + {b})", self.name, a = self.band_a, b = self.band_b)
    }
}

/// Pixel-wise normalized difference of two equally shaped grids.
///
/// NaN where `a + b == 0`; NaN inputs give NaN.
pub fn normalized_difference(a: &Array2<f32>, b: &Array2<f32>) -> Result<Array2<f32>> {
    if a.dim() != b.dim() {
        return Err(CanopyError::ShapeMismatch {
            expected: a.dim(),
            actual: b.dim(),
        });
    }

    let mut out = Array2::<f32>::zeros(a.dim());
    let kernel = |o: &mut f32, &a: &f32, &b: &f32| {
        let sum = a + b;
        *o = if sum == 0.0 { f32::NAN } else { (a - b) / sum };
    };

    let zip = Zip::from(&mut out).and(a).and(b);
    if a.len() >= PARALLEL_PIXEL_THRESHOLD {
        zip.par_for_each(kernel);
    } else {
        zip.for_each(kernel);
    }
    Ok(out)
}

/// Return `frame` with one extra band holding the index.
pub fn compute_index(frame: &Frame, index: &IndexDefinition) -> Result<Frame> {
    if frame.has_band(&index.name) {
        return Err(CanopyError::DuplicateBand {
            band: index.name.clone(),
        });
    }
    let a = frame.band(&index.band_a)?;
    let b = frame.band(&index.band_b)?;
    let data = normalized_difference(a, b)?;
    debug!(frame = %frame.id, index = %index.name, "Computed index band");
    frame.with_band(index.name.clone(), data)
}

/// Apply several indices in order.
pub fn compute_indices(frame: &Frame, indices: &[IndexDefinition]) -> Result<Frame> {
    let mut out = frame.clone();
    for index in indices {
        out = compute_index(&out, index)?;
    }
    Ok(out)
}

/// Apply the indices whose source bands `frame` carries; the rest are
/// skipped with a warning.
pub fn compute_available_indices(frame: &Frame, indices: &[IndexDefinition]) -> Result<Frame> {
    let mut out = frame.clone();
    for index in indices {
        if !index.applies_to(&out) {
            warn!(
                frame = %frame.id,
                index = %index.name,
                "Source band missing, index skipped"
            );
            continue;
        }
        out = compute_index(&out, index)?;
    }
    Ok(out)
}

/// Add every index to every frame of the collection.
pub fn compute_indices_collection(
    collection: &FrameCollection,
    indices: &[IndexDefinition],
) -> Result<FrameCollection> {
    collection.try_map(|frame| compute_indices(frame, indices))
}
