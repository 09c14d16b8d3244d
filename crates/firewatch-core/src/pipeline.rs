use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use geojson::FeatureCollection;
use tracing::instrument;

use crate::boundary::{BoundaryPolygonSet, BoundaryResolver, CountryCode, LatLon, NominatimResolver};
use crate::cache::DatasetCache;
use crate::combiner::FeedCombiner;
use crate::config::FirewatchConfig;
use crate::error::{FetchError, Result};
use crate::feeds::{feed_urls_for, MapKey};
use crate::fetch::{ContentFetcher, HttpFetcher};
use crate::geofilter::filter_within_boundary;
use crate::geometry::DetectionDataset;

/// High-confidence detections within one country.
#[derive(Debug, Clone)]
pub struct CountryDetections {
    pub country: CountryCode,
    pub boundary: BoundaryPolygonSet,
    pub centroid: LatLon,
    pub detections: DetectionDataset,
}

impl CountryDetections {
    pub fn to_feature_collection(&self) -> Result<FeatureCollection> {
        self.detections.to_feature_collection()
    }
}

pub struct FirePipeline {
    combiner: FeedCombiner,
    resolver: Arc<dyn BoundaryResolver>,
}

impl FirePipeline {
    pub fn new(combiner: FeedCombiner, resolver: Arc<dyn BoundaryResolver>) -> Self {
        Self { combiner, resolver }
    }

    /// HTTP fetcher, Nominatim resolver and a cache configured from `config`.
    pub fn from_config(config: &FirewatchConfig) -> std::result::Result<Self, FetchError> {
        let fetcher: Arc<dyn ContentFetcher> = Arc::new(HttpFetcher::new(config)?);
        let resolver = Arc::new(NominatimResolver::new(Arc::clone(&fetcher)));
        let combiner = FeedCombiner::new(fetcher, DatasetCache::new(config.cache_max_age()));
        Ok(Self::new(combiner, resolver))
    }

    pub fn combiner(&self) -> &FeedCombiner {
        &self.combiner
    }

    pub async fn detections_for_country(
        &self,
        key: &MapKey,
        country: &CountryCode,
    ) -> Result<CountryDetections> {
        self.detections_for_country_as_of(key, country, Utc::now().date_naive())
            .await
    }

    #[instrument(skip(self, key, country), fields(country = %country))]
    pub async fn detections_for_country_as_of(
        &self,
        key: &MapKey,
        country: &CountryCode,
        today: NaiveDate,
    ) -> Result<CountryDetections> {
        let urls = feed_urls_for(key);
        let dataset = self.combiner.combine_as_of(&urls, today).await?;
        let resolved = self.resolver.resolve(country).await?;
        let detections = filter_within_boundary(&dataset, &resolved.boundary)?;

        Ok(CountryDetections {
            country: country.clone(),
            boundary: resolved.boundary,
            centroid: resolved.centroid,
            detections,
        })
    }
}
