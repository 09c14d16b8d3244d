use std::fmt;

use chrono::{DateTime, NaiveDateTime};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::{NormalizeError, SchemaAttempt};
use crate::formats::schema::{
    ACQ_DATETIME, BRIGHTNESS_A, BRIGHTNESS_B, CONFIDENCE, DAYS_AGO, HIGH_CONFIDENCE, LATITUDE,
    LONGITUDE, SATELLITE, VERSION,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorProduct {
    #[serde(rename = "MODIS_NRT")]
    ModisNrt,
    #[serde(rename = "VIIRS_NOAA20_NRT")]
    ViirsNoaa20Nrt,
    #[serde(rename = "VIIRS_SNPP_NRT")]
    ViirsSnppNrt,
}

impl SensorProduct {
    /// Fixed feed order; a feed URL set always lists products in this order.
    pub const ALL: [SensorProduct; 3] = [
        SensorProduct::ModisNrt,
        SensorProduct::ViirsNoaa20Nrt,
        SensorProduct::ViirsSnppNrt,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SensorProduct::ModisNrt => "MODIS_NRT",
            SensorProduct::ViirsNoaa20Nrt => "VIIRS_NOAA20_NRT",
            SensorProduct::ViirsSnppNrt => "VIIRS_SNPP_NRT",
        }
    }
}

impl fmt::Display for SensorProduct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for SensorProduct {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "MODIS_NRT" => Ok(SensorProduct::ModisNrt),
            "VIIRS_NOAA20_NRT" => Ok(SensorProduct::ViirsNoaa20Nrt),
            "VIIRS_SNPP_NRT" => Ok(SensorProduct::ViirsSnppNrt),
            other => Err(format!("unknown sensor product '{other}'")),
        }
    }
}

/// How a feed expresses detection confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConfidenceScale {
    /// 0-100 integer percentages (MODIS).
    Percent,
    /// `low` / `nominal` / `high` labels (VIIRS).
    Categorical,
    Unrecognized,
}

impl ConfidenceScale {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceScale::Percent => "percent",
            ConfidenceScale::Categorical => "categorical",
            ConfidenceScale::Unrecognized => "unrecognized",
        }
    }
}

impl fmt::Display for ConfidenceScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One normalized fire/thermal-anomaly observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub latitude: f64,
    pub longitude: f64,
    pub confidence: String,
    pub high_confidence: bool,
    pub brightness_a: Option<f64>,
    pub brightness_b: Option<f64>,
    pub acquisition_datetime: NaiveDateTime,
    pub days_ago: u32,
    pub satellite: String,
    pub version: Option<String>,
}

/// Output of the normalizer: one feed in canonical column shape.
#[derive(Debug, Clone)]
pub struct NormalizedFeed {
    pub scale: ConfidenceScale,
    pub frame: DataFrame,
    /// Confidence schemas that rejected this feed before one was chosen.
    pub schema_attempts: Vec<SchemaAttempt>,
}

impl NormalizedFeed {
    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn high_confidence_count(&self) -> Result<usize, NormalizeError> {
        let flags = self.frame.column(HIGH_CONFIDENCE)?.bool()?;
        Ok(flags.into_iter().filter(|flag| flag.unwrap_or(false)).count())
    }

    /// Reads the frame back as typed records. Requires coordinate columns, which
    /// the normalizer itself does not insist on.
    pub fn records(&self) -> Result<Vec<DetectionRecord>, NormalizeError> {
        let df = &self.frame;
        let missing: Vec<String> = [LATITUDE, LONGITUDE]
            .iter()
            .filter(|name| df.column(name).is_err())
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(NormalizeError::MissingColumns { missing });
        }

        let latitude = df.column(LATITUDE)?.f64()?;
        let longitude = df.column(LONGITUDE)?.f64()?;
        let confidence = df.column(CONFIDENCE)?.str()?;
        let high_confidence = df.column(HIGH_CONFIDENCE)?.bool()?;
        let satellite = df.column(SATELLITE)?.str()?;
        let days_ago = df.column(DAYS_AGO)?.u32()?;
        let datetime_micros = df.column(ACQ_DATETIME)?.cast(&DataType::Int64)?;
        let datetime_micros = datetime_micros.i64()?;
        let brightness_a = optional_f64_column(df, BRIGHTNESS_A)?;
        let brightness_b = optional_f64_column(df, BRIGHTNESS_B)?;
        let version = match df.column(VERSION) {
            Ok(column) => Some(column.str()?.clone()),
            Err(_) => None,
        };

        let mut records = Vec::with_capacity(df.height());
        for idx in 0..df.height() {
            let line_index = idx + 2;
            let (Some(lat), Some(lon)) = (latitude.get(idx), longitude.get(idx)) else {
                return Err(NormalizeError::DataRow {
                    line_index,
                    column: LATITUDE.to_string(),
                    message: "missing coordinates".to_string(),
                });
            };
            let micros = datetime_micros
                .get(idx)
                .ok_or_else(|| NormalizeError::Validation {
                    message: format!("row {idx} has no acquisition datetime"),
                })?;
            let acquisition_datetime = DateTime::from_timestamp_micros(micros)
                .map(|dt| dt.naive_utc())
                .ok_or_else(|| NormalizeError::Validation {
                    message: format!("acquisition datetime {micros} out of range"),
                })?;

            records.push(DetectionRecord {
                latitude: lat,
                longitude: lon,
                confidence: confidence.get(idx).unwrap_or_default().to_string(),
                high_confidence: high_confidence.get(idx).unwrap_or(false),
                brightness_a: brightness_a.as_ref().and_then(|ca| ca.get(idx)),
                brightness_b: brightness_b.as_ref().and_then(|ca| ca.get(idx)),
                acquisition_datetime,
                days_ago: days_ago.get(idx).unwrap_or_default(),
                satellite: satellite.get(idx).unwrap_or_default().to_string(),
                version: version
                    .as_ref()
                    .and_then(|ca| ca.get(idx))
                    .map(|v| v.to_string()),
            });
        }

        Ok(records)
    }
}

fn optional_f64_column(
    df: &DataFrame,
    name: &str,
) -> Result<Option<Float64Chunked>, NormalizeError> {
    match df.column(name) {
        Ok(column) => Ok(Some(column.f64()?.clone())),
        Err(_) => Ok(None),
    }
}
