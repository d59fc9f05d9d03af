/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Minimum frame count to use frame-level Rayon parallelism.
pub const PARALLEL_FRAME_THRESHOLD: usize = 4;

/// Magic bytes at the start of every band grid file.
pub const GRID_MAGIC: &[u8; 10] = b"CANOPYGRID";

/// Current band grid file format version.
pub const GRID_VERSION: u32 = 1;

/// Header size of a band grid file: magic + version + rows + cols + 4 x f64 transform.
pub const GRID_HEADER_SIZE: usize = 10 + 4 + 4 + 4 + 4 * 8;

/// File name of the archive manifest inside a catalog directory.
pub const CATALOG_FILE_NAME: &str = "catalog.json";

/// Default cloud-cover threshold (exclusive, percent).
pub const DEFAULT_CLOUD_COVER_MAX: u8 = 20;

/// Sentinel-2 near-infrared band.
pub const BAND_NIR: &str = "B8";

/// Sentinel-2 red band.
pub const BAND_RED: &str = "B4";

/// Sentinel-2 green band.
pub const BAND_GREEN: &str = "B3";

/// Sentinel-2 first red-edge band.
pub const BAND_RED_EDGE: &str = "B5";

/// Sentinel-2 blue band.
pub const BAND_BLUE: &str = "B2";
