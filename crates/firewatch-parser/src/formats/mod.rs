mod categorical;
mod common;
mod percent;
pub mod schema;

pub use categorical::CategoricalConfidenceSchema;
pub use percent::PercentConfidenceSchema;

pub(crate) use common::{build_normalized_feed, is_numeric_value, RawTable};

#[cfg(test)]
pub(crate) use common::{pad_acq_time, recency_ranks};
