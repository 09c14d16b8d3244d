use chrono::NaiveDate;

use crate::errors::{NormalizeError, SchemaAttempt};
use crate::formats::schema::{CONFIDENCE, REQUIRED_COLUMNS};
use crate::formats::{
    build_normalized_feed, CategoricalConfidenceSchema, PercentConfidenceSchema, RawTable,
};
use crate::model::{ConfidenceScale, NormalizedFeed};

/// Source columns that become `brightness_a` / `brightness_b` under a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrightnessSources {
    pub a: &'static str,
    pub b: &'static str,
}

pub trait ConfidenceSchema {
    fn name(&self) -> &'static str;
    fn scale(&self) -> ConfidenceScale;
    /// Rejects a confidence column this schema cannot interpret with
    /// `NormalizeError::SchemaMismatch`.
    fn check(&self, confidence: &[String]) -> Result<(), NormalizeError>;
    fn is_high_confidence(&self, value: &str) -> bool;
    fn brightness_sources(&self) -> BrightnessSources;
}

/// Normalizes one raw FIRMS CSV feed. `today` anchors the `days_ago` rank.
pub fn normalize_feed(content: &str, today: NaiveDate) -> Result<NormalizedFeed, NormalizeError> {
    let percent = PercentConfidenceSchema;
    let categorical = CategoricalConfidenceSchema;
    let schemas: [&dyn ConfidenceSchema; 2] = [&percent, &categorical];
    normalize_with_schemas(content, today, &schemas)
}

pub fn normalize_with_schemas(
    content: &str,
    today: NaiveDate,
    schemas: &[&dyn ConfidenceSchema],
) -> Result<NormalizedFeed, NormalizeError> {
    let table = RawTable::read(content)?;

    let missing = table.missing_columns(&REQUIRED_COLUMNS);
    if !missing.is_empty() {
        return Err(NormalizeError::MissingColumns { missing });
    }

    let confidence = table.required(CONFIDENCE)?;
    let mut attempts = Vec::new();
    let mut selected: Option<&dyn ConfidenceSchema> = None;

    for schema in schemas {
        match schema.check(confidence) {
            Ok(()) => {
                selected = Some(*schema);
                break;
            }
            Err(NormalizeError::SchemaMismatch { reason, .. }) => {
                attempts.push(SchemaAttempt::new(schema.name(), reason));
            }
            Err(err) => return Err(err),
        }
    }

    build_normalized_feed(&table, selected, today, attempts)
}
