//! Binary band-grid files (`.cgrd`).
//!
//! Layout, all little-endian:
//!
//! ```text
//! magic        10 bytes  "CANOPYGRID"
//! version      u32
//! rows         u32
//! cols         u32
//! origin_x     f64
//! origin_y     f64
//! pixel_width  f64
//! pixel_height f64
//! data         rows * cols f32, row-major
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use memmap2::Mmap;
use ndarray::Array2;

use crate::consts::{GRID_HEADER_SIZE, GRID_MAGIC, GRID_VERSION};
use crate::error::{CanopyError, Result};
use crate::frame::{GeoTransform, GridSpec};

/// Memory-mapped band grid reader.
pub struct GridReader {
    mmap: Mmap,
    pub grid: GridSpec,
}

impl GridReader {
    /// Open a grid file and parse its header. Pixel data is not touched.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };

        if mmap.len() < GRID_HEADER_SIZE {
            return Err(CanopyError::InvalidGrid(format!(
                "{}: file too small for header",
                path.display()
            )));
        }
        if &mmap[..GRID_MAGIC.len()] != GRID_MAGIC {
            return Err(CanopyError::InvalidGrid(format!(
                "{}: missing {} magic",
                path.display(),
                String::from_utf8_lossy(GRID_MAGIC)
            )));
        }

        let grid = parse_header(&mmap[GRID_MAGIC.len()..GRID_HEADER_SIZE])?;

        let expected = GRID_HEADER_SIZE + grid.pixel_count() * std::mem::size_of::<f32>();
        if mmap.len() < expected {
            return Err(CanopyError::InvalidGrid(format!(
                "{}: truncated, expected {} bytes, got {}",
                path.display(),
                expected,
                mmap.len()
            )));
        }

        Ok(Self { mmap, grid })
    }

    /// Decode the pixel data.
    pub fn read(&self) -> Result<Array2<f32>> {
        let (rows, cols) = self.grid.shape();
        let mut cursor = std::io::Cursor::new(&self.mmap[GRID_HEADER_SIZE..]);
        let mut values = vec![0.0f32; rows * cols];
        cursor.read_f32_into::<LittleEndian>(&mut values)?;
        Array2::from_shape_vec((rows, cols), values)
            .map_err(|e| CanopyError::InvalidGrid(e.to_string()))
    }
}

fn parse_header(buf: &[u8]) -> Result<GridSpec> {
    let mut cursor = std::io::Cursor::new(buf);
    let version = cursor.read_u32::<LittleEndian>()?;
    if version != GRID_VERSION {
        return Err(CanopyError::InvalidGrid(format!(
            "unsupported version {version}"
        )));
    }
    let rows = cursor.read_u32::<LittleEndian>()? as usize;
    let cols = cursor.read_u32::<LittleEndian>()? as usize;
    let origin_x = cursor.read_f64::<LittleEndian>()?;
    let origin_y = cursor.read_f64::<LittleEndian>()?;
    let pixel_width = cursor.read_f64::<LittleEndian>()?;
    let pixel_height = cursor.read_f64::<LittleEndian>()?;

    if rows == 0 || cols == 0 {
        return Err(CanopyError::InvalidGrid(format!(
            "invalid dimensions {rows}x{cols}"
        )));
    }
    if pixel_width == 0.0 || pixel_height == 0.0 {
        return Err(CanopyError::InvalidGrid("zero pixel size".into()));
    }

    Ok(GridSpec::new(
        rows,
        cols,
        GeoTransform::new(origin_x, origin_y, pixel_width, pixel_height),
    ))
}

/// Read a grid file in one call.
pub fn read_grid(path: &Path) -> Result<(GridSpec, Array2<f32>)> {
    let reader = GridReader::open(path)?;
    let data = reader.read()?;
    Ok((reader.grid, data))
}

/// Write `data` with the georeference of `grid`.
pub fn write_grid(path: &Path, grid: &GridSpec, data: &Array2<f32>) -> Result<()> {
    if data.dim() != grid.shape() {
        return Err(CanopyError::ShapeMismatch {
            expected: grid.shape(),
            actual: data.dim(),
        });
    }
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_header(&mut writer, grid)?;
    for &v in data.iter() {
        writer.write_f32::<LittleEndian>(v)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_header(w: &mut impl Write, grid: &GridSpec) -> Result<()> {
    w.write_all(GRID_MAGIC)?;
    w.write_u32::<LittleEndian>(GRID_VERSION)?;
    w.write_u32::<LittleEndian>(grid.rows as u32)?;
    w.write_u32::<LittleEndian>(grid.cols as u32)?;
    w.write_f64::<LittleEndian>(grid.transform.origin_x)?;
    w.write_f64::<LittleEndian>(grid.transform.origin_y)?;
    w.write_f64::<LittleEndian>(grid.transform.pixel_width)?;
    w.write_f64::<LittleEndian>(grid.transform.pixel_height)?;
    Ok(())
}
