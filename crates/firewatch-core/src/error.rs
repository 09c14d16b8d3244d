// crates/firewatch-core/src/error.rs

use firewatch_parser::{NormalizeError, SensorProduct};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid FIRMS map key: {0}")]
    InvalidCredential(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("{product} feed does not match the FIRMS schema: {source}")]
    Schema {
        product: SensorProduct,
        #[source]
        source: NormalizeError,
    },

    #[error("{product} feed could not be parsed: {source}")]
    Parse {
        product: SensorProduct,
        #[source]
        source: NormalizeError,
    },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),
}

impl PipelineError {
    pub fn from_normalize(product: SensorProduct, source: NormalizeError) -> Self {
        if source.is_schema_error() {
            PipelineError::Schema { product, source }
        } else {
            PipelineError::Parse { product, source }
        }
    }

    /// FIRMS answers an exhausted transaction budget with 403/429.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            PipelineError::Fetch(err) => err.is_rate_limited(),
            PipelineError::Resolution(ResolutionError::Fetch(err)) => err.is_rate_limited(),
            _ => false,
        }
    }
}

impl From<GeometryError> for PipelineError {
    fn from(err: GeometryError) -> Self {
        PipelineError::Validation(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("{target} refused the request with status {status} (rate limited)")]
    RateLimited { target: String, status: u16 },

    #[error("{target} returned status {status}")]
    Status { target: String, status: u16 },

    #[error("request to {target} failed: {source}")]
    Transport {
        target: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("response from {target} could not be decoded: {message}")]
    Decode { target: String, message: String },
}

impl FetchError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, FetchError::RateLimited { .. })
    }
}

#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error("'{0}' is not a two-letter ISO 3166-1 alpha-2 country code")]
    InvalidCountryCode(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("boundary response is not valid GeoJSON: {0}")]
    MalformedGeoJson(String),

    #[error("no boundary polygons found for '{0}'")]
    NotFound(String),
}

#[derive(Error, Debug)]
pub enum GeometryError {
    #[error("coordinate transform from EPSG:{from} to EPSG:{to} is not supported")]
    UnsupportedTransform { from: u32, to: u32 },

    #[error("dataset has {points} points for {rows} rows")]
    LengthMismatch { points: usize, rows: usize },
}

pub type Result<T> = std::result::Result<T, PipelineError>;
