//! Raster sources: where frames come from and how queries are filtered.

mod catalog;
mod memory;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_CLOUD_COVER_MAX;
use crate::error::{CanopyError, Result};
use crate::frame::FrameCollection;
use crate::period::{DateRange, MonthRange, YearRange};
use crate::region::BoundingBox;

pub use catalog::CatalogSource;
pub use memory::MemorySource;

/// Conjunctive filter applied to an archive.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RasterQuery {
    pub date_range: DateRange,
    /// Exclusive upper bound on cloud cover, percent.
    pub cloud_cover_max: u8,
    pub bounds: Option<BoundingBox>,
    pub months: Option<MonthRange>,
    pub years: Option<YearRange>,
}

impl RasterQuery {
    pub fn new(date_range: DateRange) -> Self {
        Self {
            date_range,
            cloud_cover_max: DEFAULT_CLOUD_COVER_MAX,
            bounds: None,
            months: None,
            years: None,
        }
    }

    pub fn with_cloud_cover_max(mut self, percent: u8) -> Self {
        self.cloud_cover_max = percent;
        self
    }

    pub fn with_bounds(mut self, bounds: BoundingBox) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn with_months(mut self, months: MonthRange) -> Self {
        self.months = Some(months);
        self
    }

    pub fn with_years(mut self, years: YearRange) -> Self {
        self.years = Some(years);
        self
    }

    /// Metadata-only test; band data is never needed to decide a match.
    pub fn matches(
        &self,
        acquired: &DateTime<Utc>,
        cloud_cover: f32,
        footprint: &BoundingBox,
    ) -> bool {
        self.matches_acquisition(acquired, cloud_cover) && self.matches_footprint(footprint)
    }

    /// Date, cloud, month and year filters.
    pub fn matches_acquisition(&self, acquired: &DateTime<Utc>, cloud_cover: f32) -> bool {
        self.date_range.contains(acquired)
            && cloud_cover < f32::from(self.cloud_cover_max)
            && self.months.is_none_or(|m| m.contains(acquired))
            && self.years.is_none_or(|y| y.contains(acquired))
    }

    pub fn matches_footprint(&self, footprint: &BoundingBox) -> bool {
        self.bounds.is_none_or(|b| b.intersects(footprint))
    }
}

/// Shared flag used to abandon an in-flight query.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Caller-side limits for a query.
#[derive(Clone, Debug, Default)]
pub struct QueryControl {
    pub timeout: Option<Duration>,
    pub cancel: CancelToken,
}

impl QueryControl {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            cancel: CancelToken::default(),
        }
    }

    /// Start the clock for one query.
    pub fn start(&self) -> QueryGuard {
        QueryGuard {
            deadline: self.timeout.map(|t| Instant::now() + t),
            cancel: self.cancel.clone(),
        }
    }
}

/// Checked between units of work during a query.
pub struct QueryGuard {
    deadline: Option<Instant>,
    cancel: CancelToken,
}

impl QueryGuard {
    pub fn check(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(CanopyError::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(CanopyError::Timeout);
        }
        Ok(())
    }
}

/// Supplier of time-stamped multi-band frames.
///
/// Implementations return every matching frame or an error, never a partial
/// collection. `NoData` signals that nothing matched.
pub trait RasterSource: Send + Sync {
    fn name(&self) -> &str;

    fn query(&self, query: &RasterQuery, control: &QueryControl) -> Result<FrameCollection>;
}
