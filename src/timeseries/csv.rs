//! CSV series reader
//!
//! Handles the formats found in metering and market exports: `;` or `,`
//! delimiters, decimal commas, optional headers, local wall-clock timestamps
//! and files that carry no timestamps at all (values taken in order).

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{SeriesError, TimeSeries};
use crate::domain::Horizon;
use crate::error::{DispatchError, Result};

/// Column selector, by position or by header name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Column {
    Index(usize),
    Name(String),
}

impl Default for Column {
    fn default() -> Self {
        Column::Index(1)
    }
}

/// Layout of one CSV input file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvFormat {
    pub delimiter: char,
    pub has_header: bool,
    /// Timestamp column; `None` means rows are consecutive snapshots
    pub time_column: Option<usize>,
    pub value_column: Column,
    /// `chrono` format string; RFC 3339 and common ISO layouts when unset
    pub time_format: Option<String>,
    /// Zone of naive timestamps, UTC when unset
    pub timezone: Option<Tz>,
    pub decimal_comma: bool,
}

impl Default for CsvFormat {
    fn default() -> Self {
        Self {
            delimiter: ',',
            has_header: true,
            time_column: Some(0),
            value_column: Column::default(),
            time_format: None,
            timezone: None,
            decimal_comma: false,
        }
    }
}

const FALLBACK_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

impl CsvFormat {
    fn parse_value(&self, raw: &str) -> std::result::Result<f64, String> {
        let raw = raw.trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case("nan") {
            return Ok(f64::NAN);
        }
        let normalised = if self.decimal_comma {
            raw.replace('.', "").replace(',', ".")
        } else {
            raw.to_string()
        };
        normalised
            .parse::<f64>()
            .map_err(|e| format!("invalid number '{raw}': {e}"))
    }

    fn parse_naive(&self, raw: &str) -> std::result::Result<NaiveDateTime, String> {
        match &self.time_format {
            Some(fmt) => NaiveDateTime::parse_from_str(raw, fmt)
                .map_err(|e| format!("timestamp '{raw}' does not match '{fmt}': {e}")),
            None => FALLBACK_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .ok_or_else(|| format!("unrecognised timestamp '{raw}'")),
        }
    }

    /// Convert a timestamp to UTC. Wall-clock times repeated by a DST
    /// fall-back resolve to the occurrence after `previous`; times skipped by
    /// spring-forward do not exist and yield `None`.
    fn parse_time(
        &self,
        raw: &str,
        previous: Option<DateTime<Utc>>,
    ) -> std::result::Result<Option<DateTime<Utc>>, String> {
        let raw = raw.trim();
        if self.time_format.is_none() {
            if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
                return Ok(Some(ts.with_timezone(&Utc)));
            }
        }
        let naive = self.parse_naive(raw)?;
        let Some(tz) = self.timezone else {
            return Ok(Some(naive.and_utc()));
        };
        Ok(match tz.from_local_datetime(&naive) {
            LocalResult::Single(ts) => Some(ts.with_timezone(&Utc)),
            LocalResult::Ambiguous(early, late) => {
                let early = early.with_timezone(&Utc);
                match previous {
                    Some(prev) if early <= prev => Some(late.with_timezone(&Utc)),
                    _ => Some(early),
                }
            }
            LocalResult::None => None,
        })
    }
}

/// Read one value column from CSV text.
///
/// Without a time column the rows are laid on the horizon's index starting at
/// its first snapshot. Empty and `NaN` cells are kept as gaps for the
/// aligner.
pub fn read_series<R: Read>(
    name: &str,
    reader: R,
    format: &CsvFormat,
    horizon: &Horizon,
) -> Result<TimeSeries> {
    let delimiter = u8::try_from(format.delimiter)
        .map_err(|_| DispatchError::config(format!("delimiter '{}' is not ASCII", format.delimiter)))?;
    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(format.has_header)
        .flexible(true)
        .from_reader(reader);

    let value_index = match &format.value_column {
        Column::Index(i) => *i,
        Column::Name(col) => {
            if !format.has_header {
                return Err(DispatchError::config(format!(
                    "series '{name}' selects column '{col}' by name but the file has no header"
                )));
            }
            rdr.headers()?
                .iter()
                .position(|h| h.trim() == col)
                .ok_or_else(|| {
                    DispatchError::config(format!("series '{name}' has no column named '{col}'"))
                })?
        }
    };

    let parse_error = |line: u64, reason: String| SeriesError::Parse {
        name: name.to_string(),
        line,
        reason,
    };

    let mut points = Vec::new();
    let mut previous = None;
    let mut skipped = 0usize;
    let mut row_index = 0i32;

    for record in rdr.records() {
        let record = record?;
        let line = record.position().map_or(0, |p| p.line());
        let raw_value = record
            .get(value_index)
            .ok_or_else(|| parse_error(line, format!("missing column {value_index}")))?;
        let value = format.parse_value(raw_value).map_err(|e| parse_error(line, e))?;

        let timestamp = match format.time_column {
            Some(col) => {
                let raw_time = record
                    .get(col)
                    .ok_or_else(|| parse_error(line, format!("missing column {col}")))?;
                format
                    .parse_time(raw_time, previous)
                    .map_err(|e| parse_error(line, e))?
            }
            None => Some(horizon.start + horizon.step * row_index),
        };
        row_index += 1;

        let Some(timestamp) = timestamp else {
            skipped += 1;
            continue;
        };
        previous = Some(timestamp);
        if value.is_nan() {
            skipped += 1;
            continue;
        }
        points.push((timestamp, value));
    }

    if skipped > 0 {
        warn!(series = name, skipped, "dropped empty or non-existent rows");
    }
    debug!(series = name, points = points.len(), "series read");
    Ok(TimeSeries::new(name, points)?)
}

pub fn read_series_file(
    name: &str,
    path: impl AsRef<Path>,
    format: &CsvFormat,
    horizon: &Horizon,
) -> Result<TimeSeries> {
    let file = File::open(path.as_ref())?;
    read_series(name, file, format, horizon)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::io::Cursor;

    fn horizon() -> Horizon {
        Horizon::hourly(Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap(), 3)
    }

    #[test]
    fn test_read_semicolon_decimal_comma() {
        let data = "\
HourUTC;Area;SpotPriceEUR
2022-12-31 23:00;NO2;14,95
2023-01-01 00:00;NO2;2,01";
        let format = CsvFormat {
            delimiter: ';',
            value_column: Column::Name("SpotPriceEUR".into()),
            decimal_comma: true,
            ..Default::default()
        };
        let series = read_series("price", Cursor::new(data), &format, &horizon()).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.first(), Utc.with_ymd_and_hms(2022, 12, 31, 23, 0, 0).unwrap());
        assert_eq!(series.values().collect::<Vec<_>>(), vec![14.95, 2.01]);
    }

    #[test]
    fn test_read_headerless_positional() {
        let data = "10\n20\n30\n";
        let format = CsvFormat {
            has_header: false,
            time_column: None,
            value_column: Column::Index(0),
            ..Default::default()
        };
        let series = read_series("load", Cursor::new(data), &format, &horizon()).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.last(), horizon().start + Duration::hours(2));
    }

    #[test]
    fn test_local_time_converted_to_utc() {
        let data = "time,value\n2023-07-01 12:00,5\n";
        let format = CsvFormat {
            timezone: Some(chrono_tz::Europe::Oslo),
            ..Default::default()
        };
        let series = read_series("pv", Cursor::new(data), &format, &horizon()).unwrap();
        assert_eq!(series.first(), Utc.with_ymd_and_hms(2023, 7, 1, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_dst_fall_back_repeated_hour() {
        let data = "time,value\n2023-10-29 02:00,1\n2023-10-29 02:00,2\n2023-10-29 03:00,3\n";
        let format = CsvFormat {
            timezone: Some(chrono_tz::Europe::Oslo),
            ..Default::default()
        };
        let series = read_series("load", Cursor::new(data), &format, &horizon()).unwrap();
        let stamps: Vec<_> = series.points().iter().map(|(t, _)| *t).collect();
        assert_eq!(
            stamps,
            vec![
                Utc.with_ymd_and_hms(2023, 10, 29, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2023, 10, 29, 1, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2023, 10, 29, 2, 0, 0).unwrap(),
            ]
        );
    }

    #[test]
    fn test_empty_cells_are_gaps() {
        let data = "time,value\n2023-01-01 00:00,1\n2023-01-01 01:00,\n2023-01-01 02:00,3\n";
        let series = read_series("wind", Cursor::new(data), &CsvFormat::default(), &horizon()).unwrap();
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn test_bad_number_reports_line() {
        let data = "time,value\n2023-01-01 00:00,abc\n";
        let err = read_series("load", Cursor::new(data), &CsvFormat::default(), &horizon()).unwrap_err();
        assert!(matches!(err, DispatchError::Series(SeriesError::Parse { line: 2, .. })));
    }

    #[test]
    fn test_missing_named_column() {
        let format = CsvFormat {
            value_column: Column::Name("price".into()),
            ..Default::default()
        };
        let err = read_series("x", Cursor::new("time,value\n"), &format, &horizon()).unwrap_err();
        assert!(matches!(err, DispatchError::Configuration(_)));
    }
}
