use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::aggregate::Statistic;
use crate::compose::CompositePolicy;
use crate::consts::{BAND_BLUE, BAND_GREEN, BAND_RED, DEFAULT_CLOUD_COVER_MAX};
use crate::error::{CanopyError, Result};
use crate::index::IndexDefinition;
use crate::period::{DateRange, MonthRange, YearRange};
use crate::region::{BoundingBox, RegionValidation};
use crate::source::RasterQuery;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Archive directory containing `catalog.json`.
    pub catalog: PathBuf,
    /// GeoJSON FeatureCollection of region polygons.
    pub regions: PathBuf,
    /// Output directory.
    pub output: PathBuf,
    pub query: QueryConfig,
    #[serde(default = "default_indices")]
    pub indices: Vec<IndexDefinition>,
    #[serde(default)]
    pub series: Vec<SeriesConfig>,
    #[serde(default)]
    pub composites: Vec<CompositeConfig>,
    #[serde(default)]
    pub series_format: SeriesFormat,
    /// Chart color per region label, hex `RRGGBB`.
    #[serde(default)]
    pub region_colors: BTreeMap<String, String>,
    #[serde(default)]
    pub validation: RegionValidation,
    /// Abandon the archive query after this many seconds.
    pub timeout_secs: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let region_colors = [("Field1", "FF0000"), ("Field2", "00FF00"), ("Field3", "0000FF")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            catalog: PathBuf::from("archive"),
            regions: PathBuf::from("regions.geojson"),
            output: PathBuf::from("output"),
            query: QueryConfig::default(),
            indices: default_indices(),
            series: default_indices()
                .into_iter()
                .map(|i| SeriesConfig {
                    band: i.name,
                    statistic: Statistic::Mean,
                })
                .collect(),
            composites: vec![
                CompositeConfig {
                    method: CompositeMethod::Max,
                    band: "NDVI".into(),
                    clip: true,
                    displays: vec![DisplayConfig::palette(
                        0.8,
                        0.9,
                        &["ECB176", "E6E600", "EFC2B3", "00A600", "63C600", "F2F2F2", "E9BD3A"],
                    )],
                },
                CompositeConfig {
                    method: CompositeMethod::QualityMosaic,
                    band: "NDVI".into(),
                    clip: true,
                    displays: vec![
                        DisplayConfig::rgb(0.0, 3000.0, [BAND_RED, BAND_GREEN, BAND_BLUE]),
                        DisplayConfig::palette(0.0, 1.0, &["FF0000", "FFFFFF", "00FF00"]),
                    ],
                },
            ],
            series_format: SeriesFormat::default(),
            region_colors,
            validation: RegionValidation::default(),
            timeout_secs: None,
        }
    }
}

impl PipelineConfig {
    /// Read and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: PipelineConfig =
            toml::from_str(contents).map_err(|e| CanopyError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| CanopyError::InvalidConfig(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        self.query.date_range()?;
        self.query.months()?;
        self.query.years()?;
        if self.query.cloud_cover_max > 100 {
            return Err(CanopyError::InvalidConfig(format!(
                "cloud_cover_max {} exceeds 100",
                self.query.cloud_cover_max
            )));
        }

        for (i, index) in self.indices.iter().enumerate() {
            if self.indices[..i].iter().any(|other| other.name == index.name) {
                return Err(CanopyError::InvalidConfig(format!(
                    "index '{}' defined twice",
                    index.name
                )));
            }
        }

        for composite in &self.composites {
            for display in &composite.displays {
                display.validate()?;
            }
        }

        for (label, color) in &self.region_colors {
            if !is_hex_color(color) {
                return Err(CanopyError::InvalidConfig(format!(
                    "region '{label}' color '{color}' is not RRGGBB hex"
                )));
            }
        }

        if self.timeout_secs == Some(0) {
            return Err(CanopyError::InvalidConfig("timeout_secs must be positive".into()));
        }
        Ok(())
    }
}

fn default_indices() -> Vec<IndexDefinition> {
    vec![
        IndexDefinition::ndvi(),
        IndexDefinition::gndvi(),
        IndexDefinition::ndre(),
    ]
}

fn default_cloud_cover_max() -> u8 {
    DEFAULT_CLOUD_COVER_MAX
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueryConfig {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Exclusive upper bound, percent.
    #[serde(default = "default_cloud_cover_max")]
    pub cloud_cover_max: u8,
    /// Inclusive `[first, last]` calendar months.
    pub months: Option<[u32; 2]>,
    /// Inclusive `[first, last]` calendar years.
    pub years: Option<[i32; 2]>,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2016, 1, 1).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2020, 12, 31).unwrap_or_default(),
            cloud_cover_max: DEFAULT_CLOUD_COVER_MAX,
            months: Some([7, 8]),
            years: None,
        }
    }
}

impl QueryConfig {
    pub fn date_range(&self) -> Result<DateRange> {
        DateRange::new(self.start, self.end)
    }

    pub fn months(&self) -> Result<Option<MonthRange>> {
        self.months.map(|[a, b]| MonthRange::new(a, b)).transpose()
    }

    pub fn years(&self) -> Result<Option<YearRange>> {
        self.years.map(|[a, b]| YearRange::new(a, b)).transpose()
    }

    /// Build the archive query, restricted to `bounds` when given.
    pub fn to_query(&self, bounds: Option<BoundingBox>) -> Result<RasterQuery> {
        let mut query =
            RasterQuery::new(self.date_range()?).with_cloud_cover_max(self.cloud_cover_max);
        if let Some(bounds) = bounds {
            query = query.with_bounds(bounds);
        }
        if let Some(months) = self.months()? {
            query = query.with_months(months);
        }
        if let Some(years) = self.years()? {
            query = query.with_years(years);
        }
        Ok(query)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeriesConfig {
    pub band: String,
    #[serde(default)]
    pub statistic: Statistic,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompositeMethod {
    Max,
    QualityMosaic,
}

impl std::fmt::Display for CompositeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Max => write!(f, "Max"),
            Self::QualityMosaic => write!(f, "Quality Mosaic"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompositeConfig {
    pub method: CompositeMethod,
    /// Band maximized (max) or used as quality (quality mosaic).
    pub band: String,
    /// Blank pixels outside every region.
    #[serde(default)]
    pub clip: bool,
    /// Map layers to draw from this composite, in order.
    #[serde(default)]
    pub displays: Vec<DisplayConfig>,
}

impl CompositeConfig {
    pub fn policy(&self) -> CompositePolicy {
        match self.method {
            CompositeMethod::Max => CompositePolicy::Max {
                band: self.band.clone(),
            },
            CompositeMethod::QualityMosaic => CompositePolicy::QualityMosaic {
                quality_band: self.band.clone(),
            },
        }
    }

    /// File stem used for outputs, e.g. `max_NDVI`.
    pub fn name(&self) -> String {
        match self.method {
            CompositeMethod::Max => format!("max_{}", self.band),
            CompositeMethod::QualityMosaic => format!("quality-mosaic_{}", self.band),
        }
    }
}

/// Rendering hints handed to the map collaborator. Never used by the core.
///
/// Zero bands (the selection band) or one band render through `palette`;
/// three bands render as red, green and blue.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default)]
    pub bands: Vec<String>,
    pub min: f32,
    pub max: f32,
    /// Ordered `RRGGBB` colors, low to high.
    #[serde(default)]
    pub palette: Vec<String>,
}

impl DisplayConfig {
    pub fn palette(min: f32, max: f32, colors: &[&str]) -> Self {
        Self {
            bands: Vec::new(),
            min,
            max,
            palette: colors.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn rgb(min: f32, max: f32, bands: [&str; 3]) -> Self {
        Self {
            bands: bands.iter().map(|b| b.to_string()).collect(),
            min,
            max,
            palette: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.min.is_nan() || self.max.is_nan() || self.min >= self.max {
            return Err(CanopyError::InvalidConfig(format!(
                "display min {} must be below max {}",
                self.min, self.max
            )));
        }
        match self.bands.len() {
            0 | 1 if self.palette.is_empty() => {
                return Err(CanopyError::InvalidConfig("display palette is empty".into()));
            }
            0 | 1 | 3 => {}
            n => {
                return Err(CanopyError::InvalidConfig(format!(
                    "display takes 1 or 3 bands, got {n}"
                )));
            }
        }
        if let Some(bad) = self.palette.iter().find(|c| !is_hex_color(c)) {
            return Err(CanopyError::InvalidConfig(format!(
                "palette color '{bad}' is not RRGGBB hex"
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesFormat {
    #[default]
    Csv,
    Json,
}

impl std::fmt::Display for SeriesFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Csv => write!(f, "CSV"),
            Self::Json => write!(f, "JSON"),
        }
    }
}

/// `RRGGBB` with an optional leading `#`.
pub fn is_hex_color(s: &str) -> bool {
    let hex = s.strip_prefix('#').unwrap_or(s);
    hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit())
}
