use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CanopyError, Result};

/// Inclusive calendar-date range, compared on the UTC date of acquisition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(CanopyError::InvalidConfig(format!(
                "date range start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse a range from two ISO-8601 dates (`YYYY-MM-DD`).
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        let parse = |s: &str| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map_err(|e| CanopyError::InvalidConfig(format!("invalid date '{s}': {e}")))
        };
        Self::new(parse(start)?, parse(end)?)
    }

    pub fn contains(&self, timestamp: &DateTime<Utc>) -> bool {
        let date = timestamp.date_naive();
        date >= self.start && date <= self.end
    }
}

/// Inclusive range of calendar months (1-12). Wraps around the year end when
/// `first > last`, so November through February is `{ first: 11, last: 2 }`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthRange {
    pub first: u32,
    pub last: u32,
}

impl MonthRange {
    pub fn new(first: u32, last: u32) -> Result<Self> {
        for month in [first, last] {
            if !(1..=12).contains(&month) {
                return Err(CanopyError::InvalidConfig(format!(
                    "month {month} outside 1..=12"
                )));
            }
        }
        Ok(Self { first, last })
    }

    pub fn contains(&self, timestamp: &DateTime<Utc>) -> bool {
        let month = timestamp.month();
        if self.first <= self.last {
            month >= self.first && month <= self.last
        } else {
            month >= self.first || month <= self.last
        }
    }
}

/// Inclusive range of calendar years.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub first: i32,
    pub last: i32,
}

impl YearRange {
    pub fn new(first: i32, last: i32) -> Result<Self> {
        if first > last {
            return Err(CanopyError::InvalidConfig(format!(
                "year range {first}..{last} is empty"
            )));
        }
        Ok(Self { first, last })
    }

    pub fn contains(&self, timestamp: &DateTime<Utc>) -> bool {
        let year = timestamp.year();
        year >= self.first && year <= self.last
    }
}
