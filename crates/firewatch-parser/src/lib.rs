pub mod errors;
pub mod formats;
pub mod model;
mod registry;

pub use errors::{NormalizeError, SchemaAttempt};
pub use formats::schema;
pub use model::{ConfidenceScale, DetectionRecord, NormalizedFeed, SensorProduct};
pub use registry::{normalize_feed, normalize_with_schemas, BrightnessSources, ConfidenceSchema};

#[cfg(test)]
mod tests;
