use crate::errors::NormalizeError;
use crate::model::ConfidenceScale;
use crate::registry::{BrightnessSources, ConfidenceSchema};

use super::is_numeric_value;

/// MODIS-style feeds: confidence is a 0-100 percentage. An entirely blank
/// confidence column is read as numeric.
#[derive(Debug, Default, Clone, Copy)]
pub struct PercentConfidenceSchema;

impl PercentConfidenceSchema {
    const NAME: &'static str = "PERCENT_CONFIDENCE";
    pub const HIGH_CONFIDENCE_THRESHOLD: f64 = 70.0;
}

impl ConfidenceSchema for PercentConfidenceSchema {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn scale(&self) -> ConfidenceScale {
        ConfidenceScale::Percent
    }

    fn check(&self, confidence: &[String]) -> Result<(), NormalizeError> {
        let mut populated = confidence.iter().filter(|v| !v.trim().is_empty());
        if let Some(value) = populated.find(|v| !is_numeric_value(v)) {
            return Err(NormalizeError::SchemaMismatch {
                schema: Self::NAME,
                reason: format!("non-numeric confidence value '{value}'"),
            });
        }
        Ok(())
    }

    fn is_high_confidence(&self, value: &str) -> bool {
        value
            .trim()
            .parse::<f64>()
            .map(|pct| pct >= Self::HIGH_CONFIDENCE_THRESHOLD)
            .unwrap_or(false)
    }

    fn brightness_sources(&self) -> BrightnessSources {
        BrightnessSources {
            a: "brightness",
            b: "bright_t31",
        }
    }
}
