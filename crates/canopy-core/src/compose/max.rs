use std::collections::BTreeMap;

use ndarray::{Array2, Zip};

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::error::{CanopyError, Result};
use crate::frame::{check_same_grid, Frame, GridSpec};

use super::{earlier, CompositeFrame, CompositePolicy, SourceFrame};

/// Streaming per-pixel maximum of one band.
///
/// Holds one value grid and one provenance grid regardless of how many
/// frames are pushed. NaN inputs never contribute; equal maxima keep the
/// earliest acquisition.
pub struct MaxCompositor {
    band: String,
    state: Option<MaxState>,
}

struct MaxState {
    grid: GridSpec,
    values: Array2<f32>,
    winner: Array2<Option<u32>>,
    sources: Vec<SourceFrame>,
}

impl MaxCompositor {
    pub fn new(band: impl Into<String>) -> Self {
        Self {
            band: band.into(),
            state: None,
        }
    }

    pub fn frames_pushed(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.sources.len())
    }

    pub fn push(&mut self, frame: &Frame) -> Result<()> {
        let data = frame.band(&self.band)?;
        let state = self.state.get_or_insert_with(|| MaxState {
            grid: *frame.grid(),
            values: Array2::from_elem(data.dim(), f32::NAN),
            winner: Array2::from_elem(data.dim(), None),
            sources: Vec::new(),
        });
        check_same_grid(&state.grid, frame.grid())?;

        let index = state.sources.len() as u32;
        state.sources.push(SourceFrame::of(frame));
        let acquired = frame.acquired;
        let sources = &state.sources;

        let update = |cur: &mut f32, win: &mut Option<u32>, &v: &f32| {
            if v.is_nan() {
                return;
            }
            if cur.is_nan() || v > *cur || (v == *cur && earlier(&acquired, *win, sources)) {
                *cur = v;
                *win = Some(index);
            }
        };

        let zip = Zip::from(&mut state.values).and(&mut state.winner).and(data);
        if data.len() >= PARALLEL_PIXEL_THRESHOLD {
            zip.par_for_each(update);
        } else {
            zip.for_each(update);
        }
        Ok(())
    }

    pub fn finish(self) -> Result<CompositeFrame> {
        let state = self.state.ok_or(CanopyError::NoData)?;
        let mut bands = BTreeMap::new();
        bands.insert(self.band.clone(), state.values);
        Ok(CompositeFrame {
            policy: CompositePolicy::Max { band: self.band },
            grid: state.grid,
            bands,
            source: state.winner,
            sources: state.sources,
        })
    }
}
