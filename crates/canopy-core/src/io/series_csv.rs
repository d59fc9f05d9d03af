//! Time-series export for external charting.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::SecondsFormat;

use crate::error::Result;
use crate::series::TimeSeries;

/// Write long-format rows `label,timestamp,band,statistic,value`.
///
/// Gaps are written with an empty `value` so missing-data timestamps stay
/// visible to the consumer.
pub fn write_series_csv<W: Write>(series: &TimeSeries, writer: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(["label", "timestamp", "band", "statistic", "value"])?;

    let statistic = series.statistic.to_string();
    for region in &series.regions {
        for point in &region.points {
            let timestamp = point.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true);
            let value = point.value.map(|v| v.to_string()).unwrap_or_default();
            writer.write_record([
                point.label.as_str(),
                timestamp.as_str(),
                series.band.as_str(),
                statistic.as_str(),
                value.as_str(),
            ])?;
        }
    }
    writer.flush()?;
    Ok(())
}

pub fn save_series_csv(series: &TimeSeries, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    write_series_csv(series, file)
}

pub fn save_series_json(series: &TimeSeries, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(series)?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::aggregate::Statistic;
    use crate::series::{RegionSeries, SeriesPoint};

    #[test]
    fn gaps_are_empty_cells() {
        let timestamp = Utc.with_ymd_and_hms(2020, 7, 9, 10, 30, 0).unwrap();
        let series = TimeSeries {
            band: "NDRE".into(),
            statistic: Statistic::Mean,
            regions: vec![RegionSeries {
                label: "Field3".into(),
                points: vec![
                    SeriesPoint {
                        label: "Field3".into(),
                        timestamp,
                        value: Some(0.25),
                    },
                    SeriesPoint {
                        label: "Field3".into(),
                        timestamp,
                        value: None,
                    },
                ],
            }],
        };
        let mut buf = Vec::new();
        write_series_csv(&series, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], "Field3,2020-07-09T10:30:00Z,NDRE,mean,0.25");
        assert_eq!(lines[2], "Field3,2020-07-09T10:30:00Z,NDRE,mean,");
    }
}
