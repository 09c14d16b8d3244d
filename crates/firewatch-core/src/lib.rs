pub mod boundary;
pub mod cache;
pub mod combiner;
pub mod config;
pub mod error;
pub mod feeds;
pub mod fetch;
pub mod geofilter;
pub mod geometry;
pub mod pipeline;
pub mod status;

pub use boundary::{BoundaryPolygonSet, BoundaryResolver, CountryCode, LatLon, NominatimResolver, ResolvedBoundary};
pub use cache::DatasetCache;
pub use combiner::FeedCombiner;
pub use config::FirewatchConfig;
pub use error::{FetchError, PipelineError, ResolutionError};
pub use feeds::{build_feed_urls, FeedUrlSet, MapKey};
pub use fetch::{ContentFetcher, HttpFetcher};
pub use geofilter::filter_within_boundary;
pub use geometry::{Crs, DetectionDataset};
pub use pipeline::{CountryDetections, FirePipeline};
pub use status::{fetch_map_key_status, MapKeyStatus};
