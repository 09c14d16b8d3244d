#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use firewatch_core::boundary::BoundaryPolygonSet;
use firewatch_core::error::FetchError;
use firewatch_core::feeds::FeedUrlSet;
use firewatch_core::fetch::ContentFetcher;
use firewatch_core::geometry::Crs;
use geo::{LineString, MultiPolygon, Polygon};

pub const MAP_KEY: &str = "0123456789abcdef0123456789ABCDEF";

pub fn fixture(name: &str) -> String {
    let base = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let full_path = base.join("../firewatch-parser/tests/data").join(name);
    fs::read_to_string(&full_path)
        .unwrap_or_else(|err| panic!("failed to read fixture {}: {}", full_path.display(), err))
}

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 3).unwrap()
}

#[derive(Debug, Clone)]
pub enum FakeResponse {
    Body(String),
    Status(u16),
}

/// In-memory fetcher that counts requests per URL.
#[derive(Debug, Default)]
pub struct FakeFetcher {
    responses: Mutex<HashMap<String, FakeResponse>>,
    calls: Mutex<HashMap<String, usize>>,
    delay: Option<Duration>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn respond(&self, url: &str, response: FakeResponse) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), response);
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl ContentFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        *self.calls.lock().unwrap().entry(url.to_string()).or_default() += 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let response = self.responses.lock().unwrap().get(url).cloned();
        match response {
            Some(FakeResponse::Body(body)) => Ok(body),
            Some(FakeResponse::Status(status)) if status == 403 || status == 429 => {
                Err(FetchError::RateLimited {
                    target: url.to_string(),
                    status,
                })
            }
            Some(FakeResponse::Status(status)) => Err(FetchError::Status {
                target: url.to_string(),
                status,
            }),
            None => Err(FetchError::Status {
                target: url.to_string(),
                status: 404,
            }),
        }
    }
}

/// Serves the three FIRMS fixtures for `urls`.
pub fn firms_fetcher(urls: &FeedUrlSet) -> FakeFetcher {
    let fetcher = FakeFetcher::new();
    let fixtures = ["modis_nrt.csv", "viirs_noaa20_nrt.csv", "viirs_snpp_nrt.csv"];
    for ((_, url), name) in urls.iter().zip(fixtures) {
        fetcher.respond(url, FakeResponse::Body(fixture(name)));
    }
    fetcher
}

/// Axis-aligned rectangle in EPSG:4326.
pub fn rectangle(name: &str, min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> BoundaryPolygonSet {
    let exterior = LineString::from(vec![
        (min_lon, min_lat),
        (max_lon, min_lat),
        (max_lon, max_lat),
        (min_lon, max_lat),
        (min_lon, min_lat),
    ]);
    BoundaryPolygonSet {
        display_name: name.to_string(),
        polygons: MultiPolygon(vec![Polygon::new(exterior, vec![])]),
        crs: Crs::Wgs84,
    }
}

/// Rectangle covering the West African detections in the fixtures.
pub fn test_boundary() -> BoundaryPolygonSet {
    rectangle("Testland", 0.7, 6.0, 3.9, 12.5)
}
