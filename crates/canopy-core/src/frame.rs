use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::consts::PARALLEL_FRAME_THRESHOLD;
use crate::error::{CanopyError, Result};
use crate::period::{DateRange, MonthRange, YearRange};
use crate::region::BoundingBox;

/// North-up affine transform from pixel to geographic coordinates.
///
/// ```text
/// lon = origin_x + col * pixel_width
/// lat = origin_y + row * pixel_height
/// ```
///
/// `origin` is the upper-left corner of the upper-left pixel; `pixel_height`
/// is negative for north-up grids.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
        }
    }

    /// Geographic coordinates of the centroid of pixel (row, col).
    pub fn pixel_center(&self, row: usize, col: usize) -> (f64, f64) {
        (
            self.origin_x + (col as f64 + 0.5) * self.pixel_width,
            self.origin_y + (row as f64 + 0.5) * self.pixel_height,
        )
    }

    /// Fractional (col, row) position of a geographic coordinate.
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.origin_x) / self.pixel_width,
            (y - self.origin_y) / self.pixel_height,
        )
    }
}

/// Shape and georeference shared by every band of a frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub rows: usize,
    pub cols: usize,
    pub transform: GeoTransform,
}

impl GridSpec {
    pub fn new(rows: usize, cols: usize, transform: GeoTransform) -> Self {
        Self {
            rows,
            cols,
            transform,
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn pixel_count(&self) -> usize {
        self.rows * self.cols
    }

    /// Geographic extent covered by the grid.
    pub fn bounds(&self) -> BoundingBox {
        let t = &self.transform;
        let x0 = t.origin_x;
        let x1 = t.origin_x + self.cols as f64 * t.pixel_width;
        let y0 = t.origin_y;
        let y1 = t.origin_y + self.rows as f64 * t.pixel_height;
        BoundingBox::new(x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
    }
}

/// A single acquisition: metadata plus named reflectance bands on one grid.
///
/// Band grids are reference counted, so deriving a frame with an extra band
/// shares the source bands instead of copying them.
#[derive(Clone, Debug)]
pub struct Frame {
    pub id: String,
    pub acquired: DateTime<Utc>,
    /// Estimated cloud cover, percent (0-100).
    pub cloud_cover: f32,
    grid: GridSpec,
    bands: BTreeMap<String, Arc<Array2<f32>>>,
}

impl Frame {
    pub fn new(
        id: impl Into<String>,
        acquired: DateTime<Utc>,
        cloud_cover: f32,
        grid: GridSpec,
    ) -> Self {
        Self {
            id: id.into(),
            acquired,
            cloud_cover,
            grid,
            bands: BTreeMap::new(),
        }
    }

    /// Return a copy of this frame with one more band.
    ///
    /// Fails with `DuplicateBand` rather than replacing an existing band.
    pub fn with_band(&self, name: impl Into<String>, data: Array2<f32>) -> Result<Frame> {
        self.with_shared_band(name, Arc::new(data))
    }

    pub fn with_shared_band(
        &self,
        name: impl Into<String>,
        data: Arc<Array2<f32>>,
    ) -> Result<Frame> {
        let name = name.into();
        if self.bands.contains_key(&name) {
            return Err(CanopyError::DuplicateBand { band: name });
        }
        if data.dim() != self.grid.shape() {
            return Err(CanopyError::ShapeMismatch {
                expected: self.grid.shape(),
                actual: data.dim(),
            });
        }
        let mut frame = self.clone();
        frame.bands.insert(name, data);
        Ok(frame)
    }

    /// Return a copy of this frame without the named band.
    pub fn without_band(&self, name: &str) -> Result<Frame> {
        if !self.bands.contains_key(name) {
            return Err(CanopyError::BandMissing { band: name.into() });
        }
        let mut frame = self.clone();
        frame.bands.remove(name);
        Ok(frame)
    }

    pub fn band(&self, name: &str) -> Result<&Array2<f32>> {
        self.bands
            .get(name)
            .map(|b| b.as_ref())
            .ok_or_else(|| CanopyError::BandMissing { band: name.into() })
    }

    pub fn has_band(&self, name: &str) -> bool {
        self.bands.contains_key(name)
    }

    pub fn band_names(&self) -> impl Iterator<Item = &str> {
        self.bands.keys().map(String::as_str)
    }

    pub fn bands(&self) -> impl Iterator<Item = (&str, &Array2<f32>)> {
        self.bands.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    pub fn grid(&self) -> &GridSpec {
        &self.grid
    }

    pub fn width(&self) -> usize {
        self.grid.cols
    }

    pub fn height(&self) -> usize {
        self.grid.rows
    }

    pub fn date(&self) -> NaiveDate {
        self.acquired.date_naive()
    }
}

/// Time-ordered frames sharing one spatial reference.
#[derive(Clone, Debug, Default)]
pub struct FrameCollection {
    frames: Vec<Frame>,
}

impl FrameCollection {
    /// Build a collection, sorting frames by acquisition time.
    ///
    /// The sort is stable: frames with equal timestamps keep their input order.
    pub fn new(mut frames: Vec<Frame>) -> Result<Self> {
        if let Some(first) = frames.first() {
            let grid = *first.grid();
            for frame in &frames[1..] {
                check_same_grid(&grid, frame.grid())?;
            }
        }
        frames.sort_by_key(|f| f.acquired);
        Ok(Self { frames })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Shared grid, or `None` for an empty collection.
    pub fn grid(&self) -> Option<&GridSpec> {
        self.frames.first().map(Frame::grid)
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Frame> {
        self.frames.iter()
    }

    pub fn into_frames(self) -> Vec<Frame> {
        self.frames
    }

    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.frames.iter().map(|f| f.acquired).collect()
    }

    /// Keep the frames matching `predicate`.
    pub fn filter<P>(&self, predicate: P) -> FrameCollection
    where
        P: Fn(&Frame) -> bool,
    {
        Self {
            frames: self.frames.iter().filter(|f| predicate(f)).cloned().collect(),
        }
    }

    pub fn filter_date_range(&self, range: &DateRange) -> FrameCollection {
        self.filter(|f| range.contains(&f.acquired))
    }

    /// Keep frames with cloud cover strictly below `max_percent`.
    pub fn filter_cloud_cover(&self, max_percent: u8) -> FrameCollection {
        self.filter(|f| f.cloud_cover < f32::from(max_percent))
    }

    pub fn filter_months(&self, months: &MonthRange) -> FrameCollection {
        self.filter(|f| months.contains(&f.acquired))
    }

    pub fn filter_years(&self, years: &YearRange) -> FrameCollection {
        self.filter(|f| years.contains(&f.acquired))
    }

    /// Keep frames whose footprint intersects `bounds`.
    pub fn filter_bounds(&self, bounds: &BoundingBox) -> FrameCollection {
        self.filter(|f| f.grid().bounds().intersects(bounds))
    }

    /// Apply `f` to every frame, producing a new collection.
    pub fn map<F>(&self, f: F) -> Result<FrameCollection>
    where
        F: Fn(&Frame) -> Frame + Sync + Send,
    {
        self.try_map(|frame| Ok(f(frame)))
    }

    /// Apply a fallible `f` to every frame. Frames are processed in parallel
    /// once the collection is large enough; output order matches input order.
    pub fn try_map<F>(&self, f: F) -> Result<FrameCollection>
    where
        F: Fn(&Frame) -> Result<Frame> + Sync + Send,
    {
        let frames: Vec<Frame> = if self.frames.len() >= PARALLEL_FRAME_THRESHOLD {
            self.frames.par_iter().map(&f).collect::<Result<_>>()?
        } else {
            self.frames.iter().map(&f).collect::<Result<_>>()?
        };
        Self::new(frames)
    }
}

impl<'a> IntoIterator for &'a FrameCollection {
    type Item = &'a Frame;
    type IntoIter = std::slice::Iter<'a, Frame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}

pub(crate) fn check_same_grid(expected: &GridSpec, actual: &GridSpec) -> Result<()> {
    if expected.shape() != actual.shape() {
        return Err(CanopyError::ShapeMismatch {
            expected: expected.shape(),
            actual: actual.shape(),
        });
    }
    if expected.transform != actual.transform {
        return Err(CanopyError::GridMismatch);
    }
    Ok(())
}
