use std::collections::BTreeMap;

use ndarray::{Array2, Zip};

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::error::{CanopyError, Result};
use crate::frame::{check_same_grid, Frame, GridSpec};

use super::{earlier, CompositeFrame, CompositePolicy, SourceFrame};

/// Streaming quality mosaic.
///
/// Per pixel, keeps every band value of the frame with the highest quality
/// value seen so far. NaN quality never wins; ties keep the earliest
/// acquisition. Bands a winning frame lacks are NaN at that pixel.
pub struct QualityMosaicker {
    quality_band: String,
    state: Option<MosaicState>,
}

struct MosaicState {
    grid: GridSpec,
    quality: Array2<f32>,
    winner: Array2<Option<u32>>,
    bands: BTreeMap<String, Array2<f32>>,
    sources: Vec<SourceFrame>,
}

impl QualityMosaicker {
    pub fn new(quality_band: impl Into<String>) -> Self {
        Self {
            quality_band: quality_band.into(),
            state: None,
        }
    }

    pub fn frames_pushed(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.sources.len())
    }

    pub fn push(&mut self, frame: &Frame) -> Result<()> {
        let quality = frame.band(&self.quality_band)?;
        let shape = quality.dim();
        let state = self.state.get_or_insert_with(|| MosaicState {
            grid: *frame.grid(),
            quality: Array2::from_elem(shape, f32::NAN),
            winner: Array2::from_elem(shape, None),
            bands: BTreeMap::new(),
            sources: Vec::new(),
        });
        check_same_grid(&state.grid, frame.grid())?;

        let index = state.sources.len() as u32;
        state.sources.push(SourceFrame::of(frame));
        let acquired = frame.acquired;
        let sources = &state.sources;

        let mut won = Array2::from_elem(shape, false);
        let select = |best: &mut f32, win: &mut Option<u32>, won: &mut bool, &q: &f32| {
            if q.is_nan() {
                return;
            }
            if best.is_nan() || q > *best || (q == *best && earlier(&acquired, *win, sources)) {
                *best = q;
                *win = Some(index);
                *won = true;
            }
        };

        let zip = Zip::from(&mut state.quality)
            .and(&mut state.winner)
            .and(&mut won)
            .and(quality);
        if quality.len() >= PARALLEL_PIXEL_THRESHOLD {
            zip.par_for_each(select);
        } else {
            zip.for_each(select);
        }

        for (name, src) in frame.bands() {
            let out = state
                .bands
                .entry(name.to_string())
                .or_insert_with(|| Array2::from_elem(shape, f32::NAN));
            Zip::from(out).and(&won).and(src).for_each(|o, &w, &s| {
                if w {
                    *o = s;
                }
            });
        }
        for (name, out) in state.bands.iter_mut() {
            if frame.has_band(name) {
                continue;
            }
            Zip::from(out).and(&won).for_each(|o, &w| {
                if w {
                    *o = f32::NAN;
                }
            });
        }
        Ok(())
    }

    pub fn finish(self) -> Result<CompositeFrame> {
        let state = self.state.ok_or(CanopyError::NoData)?;
        Ok(CompositeFrame {
            policy: CompositePolicy::QualityMosaic {
                quality_band: self.quality_band,
            },
            grid: state.grid,
            bands: state.bands,
            source: state.winner,
            sources: state.sources,
        })
    }
}
