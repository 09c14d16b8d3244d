use crate::errors::NormalizeError;
use crate::model::ConfidenceScale;
use crate::registry::{BrightnessSources, ConfidenceSchema};

use super::is_numeric_value;

/// VIIRS-style feeds: confidence is a `low` / `nominal` / `high` label. Any column
/// holding at least one non-numeric value is read as labels.
#[derive(Debug, Default, Clone, Copy)]
pub struct CategoricalConfidenceSchema;

impl CategoricalConfidenceSchema {
    const NAME: &'static str = "CATEGORICAL_CONFIDENCE";
    const HIGH_LABELS: [&'static str; 2] = ["nominal", "high"];
}

impl ConfidenceSchema for CategoricalConfidenceSchema {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn scale(&self) -> ConfidenceScale {
        ConfidenceScale::Categorical
    }

    fn check(&self, confidence: &[String]) -> Result<(), NormalizeError> {
        let has_label = confidence
            .iter()
            .any(|v| !v.trim().is_empty() && !is_numeric_value(v));
        if has_label {
            Ok(())
        } else {
            Err(NormalizeError::SchemaMismatch {
                schema: Self::NAME,
                reason: "confidence column holds no text labels".to_string(),
            })
        }
    }

    fn is_high_confidence(&self, value: &str) -> bool {
        let trimmed = value.trim();
        Self::HIGH_LABELS.iter().any(|label| *label == trimmed)
    }

    fn brightness_sources(&self) -> BrightnessSources {
        BrightnessSources {
            a: "bright_ti4",
            b: "bright_ti5",
        }
    }
}
