use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;

use crate::errors::{NormalizeError, SchemaAttempt};
use crate::formats::schema::{
    is_float_column, ACQ_DATE, ACQ_DATETIME, ACQ_TIME, BRIGHTNESS_A, BRIGHTNESS_B, CONFIDENCE,
    DAYS_AGO, HIGH_CONFIDENCE,
};
use crate::model::{ConfidenceScale, NormalizedFeed};
use crate::registry::ConfidenceSchema;

const ACQ_DATETIME_FORMAT: &str = "%Y-%m-%d %H%M";

/// A CSV feed held column-wise as text, before any typing.
#[derive(Debug, Clone)]
pub(crate) struct RawTable {
    headers: Vec<String>,
    columns: Vec<Vec<String>>,
    height: usize,
}

impl RawTable {
    pub fn read(content: &str) -> Result<Self, NormalizeError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|source| NormalizeError::Csv { source })?
            .iter()
            .map(|name| name.to_string())
            .collect();

        let mut columns: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
        let mut height = 0usize;

        for record in reader.records() {
            let record = record.map_err(|source| NormalizeError::Csv { source })?;
            for (idx, column) in columns.iter_mut().enumerate() {
                column.push(record.get(idx).unwrap_or_default().to_string());
            }
            height += 1;
        }

        Ok(Self {
            headers,
            columns,
            height,
        })
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn column(&self, name: &str) -> Option<&[String]> {
        self.headers
            .iter()
            .position(|header| header == name)
            .map(|idx| self.columns[idx].as_slice())
    }

    pub fn required(&self, name: &str) -> Result<&[String], NormalizeError> {
        self.column(name).ok_or_else(|| NormalizeError::MissingColumns {
            missing: vec![name.to_string()],
        })
    }

    pub fn missing_columns(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|name| self.column(name).is_none())
            .map(|name| name.to_string())
            .collect()
    }

    fn iter_columns(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.headers
            .iter()
            .map(String::as_str)
            .zip(self.columns.iter().map(Vec::as_slice))
    }
}

pub(crate) fn parse_optional_f64(
    value: &str,
    line_index: usize,
    column: &str,
) -> Result<Option<f64>, NormalizeError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    trimmed
        .parse::<f64>()
        .map(Some)
        .map_err(|err| NormalizeError::DataRow {
            line_index,
            column: column.to_string(),
            message: format!("failed to parse '{trimmed}' as float: {err}"),
        })
}

/// Left-pads an HHMM acquisition time (`930` -> `0930`). Longer values are kept
/// as-is so they fail datetime parsing instead of being truncated.
pub(crate) fn pad_acq_time(value: &str) -> String {
    format!("{:0>4}", value.trim())
}

pub(crate) fn parse_acquisition_datetime(
    acq_date: &str,
    acq_time: &str,
    line_index: usize,
) -> Result<NaiveDateTime, NormalizeError> {
    let combined = format!("{} {}", acq_date.trim(), pad_acq_time(acq_time));
    NaiveDateTime::parse_from_str(&combined, ACQ_DATETIME_FORMAT).map_err(|_| {
        NormalizeError::Timestamp {
            line_index,
            value: combined,
        }
    })
}

/// Dense rank of distinct dates, most recent first. Ranks start at 1, or at 0
/// when the most recent date is `today`.
pub(crate) fn recency_ranks(dates: &[NaiveDate], today: NaiveDate) -> Vec<u32> {
    let mut distinct = dates.to_vec();
    distinct.sort_unstable_by(|a, b| b.cmp(a));
    distinct.dedup();

    let offset = if distinct.first() == Some(&today) { 0 } else { 1 };
    let ranks: HashMap<NaiveDate, u32> = distinct
        .iter()
        .enumerate()
        .map(|(idx, date)| (*date, idx as u32 + offset))
        .collect();

    dates.iter().map(|date| ranks[date]).collect()
}

pub(crate) fn is_numeric_value(value: &str) -> bool {
    value.trim().parse::<f64>().is_ok()
}

/// Builds the canonical frame for one feed. `schema` is `None` on the
/// unrecognized-confidence path: nothing is renamed and no row is high confidence.
pub(crate) fn build_normalized_feed(
    table: &RawTable,
    schema: Option<&dyn ConfidenceSchema>,
    today: NaiveDate,
    schema_attempts: Vec<SchemaAttempt>,
) -> Result<NormalizedFeed, NormalizeError> {
    let height = table.height();
    let acq_dates = table.required(ACQ_DATE)?;
    let acq_times = table.required(ACQ_TIME)?;
    let confidence = table.required(CONFIDENCE)?;

    let mut acquisitions = Vec::with_capacity(height);
    for (idx, (date, time)) in acq_dates.iter().zip(acq_times).enumerate() {
        acquisitions.push(parse_acquisition_datetime(date, time, idx + 2)?);
    }

    let dates: Vec<NaiveDate> = acquisitions.iter().map(|dt| dt.date()).collect();
    let days_ago = recency_ranks(&dates, today);

    let high_confidence: Vec<bool> = match schema {
        Some(schema) => confidence
            .iter()
            .map(|value| !value.is_empty() && schema.is_high_confidence(value))
            .collect(),
        None => vec![false; height],
    };

    let renames: Vec<(&str, &str)> = match schema {
        Some(schema) => {
            let sources = schema.brightness_sources();
            vec![(sources.a, BRIGHTNESS_A), (sources.b, BRIGHTNESS_B)]
        }
        None => Vec::new(),
    };

    let mut columns: Vec<Column> = Vec::with_capacity(table.iter_columns().count() + 3);
    for (source_name, values) in table.iter_columns() {
        let name = renames
            .iter()
            .find(|(from, _)| *from == source_name)
            .map(|(_, to)| *to)
            .unwrap_or(source_name);

        let series = if is_float_column(name) {
            let mut parsed = Vec::with_capacity(height);
            for (idx, value) in values.iter().enumerate() {
                parsed.push(parse_optional_f64(value, idx + 2, source_name)?);
            }
            Series::new(name.into(), parsed)
        } else if name == ACQ_TIME {
            let padded: Vec<String> = values.iter().map(|v| pad_acq_time(v)).collect();
            let padded: Vec<&str> = padded.iter().map(String::as_str).collect();
            Series::new(name.into(), padded)
        } else {
            let text: Vec<Option<&str>> = values
                .iter()
                .map(|v| Some(v.as_str()).filter(|v| !v.is_empty()))
                .collect();
            Series::new(name.into(), text)
        };
        columns.push(series.into());
    }

    let micros: Vec<i64> = acquisitions
        .iter()
        .map(|dt| dt.and_utc().timestamp_micros())
        .collect();
    let acq_datetime = Series::new(ACQ_DATETIME.into(), micros)
        .cast(&DataType::Datetime(TimeUnit::Microseconds, None))
        .map_err(|err| NormalizeError::Validation {
            message: format!("failed to cast acquisition datetime column: {err}"),
        })?;
    columns.push(acq_datetime.into());
    columns.push(Series::new(HIGH_CONFIDENCE.into(), high_confidence).into());
    columns.push(Series::new(DAYS_AGO.into(), days_ago).into());

    let frame = DataFrame::new(columns).map_err(|err| NormalizeError::Validation {
        message: format!("failed to build normalized dataframe: {err}"),
    })?;

    Ok(NormalizedFeed {
        scale: schema.map_or(ConfidenceScale::Unrecognized, |s| s.scale()),
        frame,
        schema_attempts,
    })
}
