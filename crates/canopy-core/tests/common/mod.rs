use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use ndarray::Array2;

use canopy_core::frame::{Frame, GeoTransform, GridSpec};
use canopy_core::io::catalog::{save_catalog, Catalog, SceneEntry};
use canopy_core::io::grid::write_grid;
use canopy_core::region::Region;

/// Grid of unit pixels with its upper-left corner at (0, rows), north-up.
///
/// Pixel (row, col) has its centroid at (col + 0.5, rows - row - 0.5).
pub fn unit_grid(rows: usize, cols: usize) -> GridSpec {
    GridSpec::new(rows, cols, GeoTransform::new(0.0, rows as f64, 1.0, -1.0))
}

/// Noon UTC on the given day.
pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
}

/// Frame with the given band grids.
pub fn frame_with(
    id: &str,
    acquired: DateTime<Utc>,
    cloud_cover: f32,
    grid: GridSpec,
    bands: &[(&str, Array2<f32>)],
) -> Frame {
    let mut frame = Frame::new(id, acquired, cloud_cover, grid);
    for (name, data) in bands {
        frame = frame.with_band(*name, data.clone()).unwrap();
    }
    frame
}

/// Frame whose bands are each filled with one constant.
pub fn constant_frame(
    id: &str,
    acquired: DateTime<Utc>,
    grid: GridSpec,
    bands: &[(&str, f32)],
) -> Frame {
    let arrays: Vec<(&str, Array2<f32>)> = bands
        .iter()
        .map(|&(name, v)| (name, Array2::from_elem(grid.shape(), v)))
        .collect();
    frame_with(id, acquired, 0.0, grid, &arrays)
}

/// Region strictly containing every pixel centroid of `grid`.
pub fn covering_region(label: &str, grid: &GridSpec) -> Region {
    let b = grid.bounds();
    Region::new(
        label,
        &[
            (b.min_x - 1.0, b.min_y - 1.0),
            (b.max_x + 1.0, b.min_y - 1.0),
            (b.max_x + 1.0, b.max_y + 1.0),
            (b.min_x - 1.0, b.max_y + 1.0),
        ],
    )
    .unwrap()
}

/// Axis-aligned rectangular region.
pub fn rect_region(label: &str, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Region {
    Region::new(
        label,
        &[(min_x, min_y), (max_x, min_y), (max_x, max_y), (min_x, max_y)],
    )
    .unwrap()
}

/// Write `frames` as a catalog directory: one grid file per band plus
/// `catalog.json`.
pub fn write_catalog(dir: &Path, frames: &[Frame]) {
    let mut scenes = Vec::new();
    for frame in frames {
        let mut bands = BTreeMap::new();
        for (name, data) in frame.bands() {
            let rel = PathBuf::from(format!("{}_{}.cgrd", frame.id, name));
            write_grid(&dir.join(&rel), frame.grid(), data).unwrap();
            bands.insert(name.to_string(), rel);
        }
        scenes.push(SceneEntry {
            id: frame.id.clone(),
            acquired: frame.acquired,
            cloud_cover: frame.cloud_cover,
            bands,
        });
    }
    save_catalog(&Catalog { scenes }, &dir.join("catalog.json")).unwrap();
}
