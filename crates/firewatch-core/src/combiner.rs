use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use firewatch_parser::schema::{ACQ_DATETIME, CONFIDENCE, HIGH_CONFIDENCE, LATITUDE, LONGITUDE, VERSION};
use firewatch_parser::{normalize_feed, SensorProduct};
use futures::future::try_join_all;
use geo::Point;
use polars::prelude::*;
use tracing::{info, instrument};

use crate::cache::DatasetCache;
use crate::error::{PipelineError, Result};
use crate::feeds::{redact_credentials, FeedUrlSet};
use crate::fetch::ContentFetcher;
use crate::geometry::{Crs, DetectionDataset};

pub const REQUIRED_COMBINED_COLUMNS: [&str; 6] =
    [HIGH_CONFIDENCE, LATITUDE, LONGITUDE, ACQ_DATETIME, CONFIDENCE, VERSION];

/// Columns that only matter during normalization.
pub const TRANSIENT_COLUMNS: [&str; 7] = [
    "scan",
    "track",
    "acq_date",
    "acq_time",
    "brightness_a",
    "brightness_b",
    "daynight",
];

pub const ACQ_DATETIME_DISPLAY_FORMAT: &str = "%Y-%m-%d_%H:%M:%S";

pub struct FeedCombiner {
    fetcher: Arc<dyn ContentFetcher>,
    cache: DatasetCache,
}

impl FeedCombiner {
    pub fn new(fetcher: Arc<dyn ContentFetcher>, cache: DatasetCache) -> Self {
        Self { fetcher, cache }
    }

    pub fn cache(&self) -> &DatasetCache {
        &self.cache
    }

    pub fn fetcher(&self) -> Arc<dyn ContentFetcher> {
        Arc::clone(&self.fetcher)
    }

    /// Combined high-confidence detections for `urls`, memoized per URL set.
    pub async fn combine(&self, urls: &FeedUrlSet) -> Result<Arc<DetectionDataset>> {
        self.combine_as_of(urls, Utc::now().date_naive()).await
    }

    pub async fn combine_as_of(
        &self,
        urls: &FeedUrlSet,
        today: NaiveDate,
    ) -> Result<Arc<DetectionDataset>> {
        self.cache
            .get_or_try_init(urls, || self.build_dataset(urls, today))
            .await
    }

    #[instrument(skip_all, fields(cache_key = %urls.fingerprint()))]
    async fn build_dataset(&self, urls: &FeedUrlSet, today: NaiveDate) -> Result<DetectionDataset> {
        let frames = try_join_all(
            urls.iter()
                .map(|(product, url)| self.fetch_normalized(product, url, today)),
        )
        .await?;
        let dataset = combine_frames(frames)?;
        info!(rows = dataset.len(), "combined detection dataset");
        Ok(dataset)
    }

    async fn fetch_normalized(
        &self,
        product: SensorProduct,
        url: &str,
        today: NaiveDate,
    ) -> Result<DataFrame> {
        let content = self.fetcher.fetch(url).await?;
        let feed = normalize_feed(&content, today)
            .map_err(|err| PipelineError::from_normalize(product, err))?;
        info!(
            product = %product,
            url = %redact_credentials(url),
            rows = feed.height(),
            confidence_scale = %feed.scale,
            "normalized feed"
        );
        Ok(feed.frame)
    }
}

/// Union, filter, dedup, sort and shape normalized feed frames (given in feed
/// order) into the combined dataset.
pub fn combine_frames(frames: Vec<DataFrame>) -> Result<DetectionDataset> {
    let union = diagonal_union(frames)?;

    let missing: Vec<&str> = REQUIRED_COMBINED_COLUMNS
        .iter()
        .copied()
        .filter(|name| union.column(name).is_err())
        .collect();
    if !missing.is_empty() {
        return Err(PipelineError::Validation(format!(
            "combined feeds are missing required columns: {missing:?}"
        )));
    }

    let mask = union.column(HIGH_CONFIDENCE)?.bool()?.clone();
    let confident = union.filter(&mask)?;

    let order = dedup_and_sort(&confident)?;
    let mut df = confident.take(&IdxCa::from_vec("idx".into(), order))?;

    for name in TRANSIENT_COLUMNS {
        if df.column(name).is_ok() {
            df.drop_in_place(name)?;
        }
    }

    let points = build_points(&df)?;
    let formatted = format_acq_datetime(&df)?;
    df.with_column(formatted)?;

    DetectionDataset::new(df, points, Crs::Wgs84)
}

/// Stacks frames whose column sets differ, filling absent columns with nulls.
/// Columns keep the order of their first appearance.
fn diagonal_union(frames: Vec<DataFrame>) -> Result<DataFrame> {
    let mut schema: Vec<(PlSmallStr, DataType)> = Vec::new();
    for frame in &frames {
        for column in frame.get_columns() {
            if !schema.iter().any(|(name, _)| name == column.name()) {
                schema.push((column.name().clone(), column.dtype().clone()));
            }
        }
    }

    let mut combined: Option<DataFrame> = None;
    for frame in frames {
        let height = frame.height();
        let mut columns = Vec::with_capacity(schema.len());
        for (name, dtype) in &schema {
            let column = match frame.column(name.as_str()) {
                Ok(column) => column.cast(dtype)?,
                Err(_) => Column::full_null(name.clone(), height, dtype),
            };
            columns.push(column);
        }
        let aligned = DataFrame::new(columns)?;
        match combined.as_mut() {
            Some(acc) => {
                acc.vstack_mut(&aligned)?;
            }
            None => combined = Some(aligned),
        }
    }

    Ok(combined.unwrap_or_else(DataFrame::empty))
}

#[derive(Debug, PartialEq, Eq, Hash)]
struct DedupKey {
    latitude: Option<u64>,
    longitude: Option<u64>,
    acquired_micros: Option<i64>,
    confidence: Option<String>,
    version: Option<String>,
}

/// Row indices surviving last-wins deduplication, stably sorted by acquisition time.
fn dedup_and_sort(df: &DataFrame) -> Result<Vec<IdxSize>> {
    let latitude = df.column(LATITUDE)?.f64()?;
    let longitude = df.column(LONGITUDE)?.f64()?;
    let confidence = df.column(CONFIDENCE)?.str()?;
    let version = df.column(VERSION)?.str()?;
    let micros = df.column(ACQ_DATETIME)?.cast(&DataType::Int64)?;
    let micros = micros.i64()?;

    let keys: Vec<DedupKey> = (0..df.height())
        .map(|idx| DedupKey {
            latitude: latitude.get(idx).map(normalized_bits),
            longitude: longitude.get(idx).map(normalized_bits),
            acquired_micros: micros.get(idx),
            confidence: confidence.get(idx).map(str::to_string),
            version: version.get(idx).map(str::to_string),
        })
        .collect();

    let mut last_seen: HashMap<&DedupKey, usize> = HashMap::with_capacity(keys.len());
    for (idx, key) in keys.iter().enumerate() {
        last_seen.insert(key, idx);
    }

    let mut kept: Vec<usize> = (0..keys.len())
        .filter(|idx| last_seen.get(&keys[*idx]) == Some(idx))
        .collect();
    kept.sort_by_key(|idx| micros.get(*idx));

    Ok(kept.into_iter().map(|idx| idx as IdxSize).collect())
}

/// `-0.0` and `0.0` are the same coordinate.
fn normalized_bits(value: f64) -> u64 {
    if value == 0.0 {
        0.0f64.to_bits()
    } else {
        value.to_bits()
    }
}

fn build_points(df: &DataFrame) -> Result<Vec<Point<f64>>> {
    let latitude = df.column(LATITUDE)?.f64()?;
    let longitude = df.column(LONGITUDE)?.f64()?;

    latitude
        .into_iter()
        .zip(longitude)
        .enumerate()
        .map(|(idx, pair)| match pair {
            (Some(lat), Some(lon)) => Ok(Point::new(lon, lat)),
            _ => Err(PipelineError::Validation(format!(
                "detection {idx} has a null coordinate"
            ))),
        })
        .collect()
}

fn format_acq_datetime(df: &DataFrame) -> Result<Series> {
    let micros = df.column(ACQ_DATETIME)?.cast(&DataType::Int64)?;
    let micros = micros.i64()?;

    let formatted: Vec<Option<String>> = micros
        .into_iter()
        .map(|value| {
            value
                .and_then(DateTime::from_timestamp_micros)
                .map(|dt| dt.format(ACQ_DATETIME_DISPLAY_FORMAT).to_string())
        })
        .collect();
    let formatted: Vec<Option<&str>> = formatted.iter().map(Option::as_deref).collect();
    Ok(Series::new(ACQ_DATETIME.into(), formatted))
}
